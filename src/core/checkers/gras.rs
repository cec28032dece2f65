use crate::core::cache::ReferenceDataCache;
use crate::core::checkers::required_snapshot;
use crate::core::matcher::match_ingredient;
use crate::core::{ComplianceChecker, ReferenceStore};
use crate::domain::model::{CheckerKind, ComplianceReport, FindingStatus, IngredientFinding};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// GRAS 安全認定檢查：每個成分都必須在資料集中找到對應條目
pub struct GrasChecker<S: ReferenceStore> {
    cache: Arc<ReferenceDataCache<S>>,
    dataset: String,
}

impl<S: ReferenceStore> GrasChecker<S> {
    pub fn new(cache: Arc<ReferenceDataCache<S>>, dataset: impl Into<String>) -> Self {
        Self {
            cache,
            dataset: dataset.into(),
        }
    }
}

#[async_trait]
impl<S: ReferenceStore + 'static> ComplianceChecker for GrasChecker<S> {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Gras
    }

    async fn check(&self, ingredients: &[String]) -> Result<ComplianceReport> {
        let mut warnings = Vec::new();
        let snapshot = required_snapshot(&self.cache, self.kind(), &self.dataset, &mut warnings).await?;

        let findings: Vec<IngredientFinding> = ingredients
            .iter()
            .map(|raw| {
                let match_result = match_ingredient(raw, &snapshot);
                let status = if match_result.is_match() {
                    FindingStatus::Recognized
                } else {
                    FindingStatus::NotRecognized
                };
                IngredientFinding { status, match_result }
            })
            .collect();

        let report = ComplianceReport::new(self.kind(), &self.dataset, findings).with_warnings(warnings);
        tracing::info!(
            "🧪 GRAS: {}/{} ingredients recognized",
            report.compliant_count(),
            report.total_ingredients()
        );
        Ok(report)
    }
}
