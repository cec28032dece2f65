pub mod allergen;
pub mod gras;
pub mod ndi;

pub use allergen::AllergenChecker;
pub use gras::GrasChecker;
pub use ndi::NdiChecker;

use crate::core::cache::ReferenceDataCache;
use crate::core::ReferenceStore;
use crate::domain::model::{CheckerKind, DatasetSnapshot};
use crate::utils::error::{ComplianceError, Result};
use std::sync::Arc;

/// 取得檢查器所需的快照；取不到時整個檢查失敗，絕不回傳部分結果
pub(crate) async fn required_snapshot<S: ReferenceStore + 'static>(
    cache: &ReferenceDataCache<S>,
    checker: CheckerKind,
    dataset: &str,
    warnings: &mut Vec<String>,
) -> Result<Arc<DatasetSnapshot>> {
    let lookup = cache
        .get(dataset)
        .await
        .map_err(|e| ComplianceError::checker_failure(checker.to_string(), &e))?;

    if let Some(warning) = lookup.warning {
        warnings.push(warning);
    }
    Ok(lookup.snapshot)
}
