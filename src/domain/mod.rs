// Domain layer: core models and ports (interfaces) shared by the checkers and the store adapters.

pub mod model;
pub mod ports;
