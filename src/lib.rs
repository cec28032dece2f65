pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ComplianceConfig;

pub use adapters::{ConfiguredStore, CsvReferenceStore, HttpReferenceStore, InMemoryStore};
pub use core::{
    cache::{CacheConfig, ReferenceDataCache},
    declaration::EscalationPolicy,
    engine::ComplianceEngine,
    orchestrator::ComplianceOrchestrator,
};
pub use utils::error::{ComplianceError, Result};
