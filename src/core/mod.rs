pub mod cache;
pub mod checkers;
pub mod declaration;
pub mod engine;
pub mod matcher;
pub mod normalizer;
pub mod orchestrator;

pub use crate::domain::model::{
    AggregateComplianceResult, ComplianceReport, DatasetSnapshot, MatchResult, ReferenceEntry,
};
pub use crate::domain::ports::{ComplianceChecker, DatasetNames, ReferenceStore};
pub use crate::utils::error::Result;
