use crate::core::cache::ReferenceDataCache;
use crate::core::checkers::required_snapshot;
use crate::core::matcher::match_ingredient;
use crate::core::{ComplianceChecker, ReferenceStore};
use crate::domain::model::{CheckerKind, ComplianceReport, FindingStatus, IngredientFinding};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 新膳食成分通報檢查。
///
/// An ingredient is checked against the grandfathered (pre-cutoff) list first, then the
/// notified list; one found in neither requires a notification.
pub struct NdiChecker<S: ReferenceStore> {
    cache: Arc<ReferenceDataCache<S>>,
    grandfathered_dataset: String,
    notified_dataset: String,
}

impl<S: ReferenceStore> NdiChecker<S> {
    pub fn new(
        cache: Arc<ReferenceDataCache<S>>,
        grandfathered_dataset: impl Into<String>,
        notified_dataset: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            grandfathered_dataset: grandfathered_dataset.into(),
            notified_dataset: notified_dataset.into(),
        }
    }

    fn report_dataset(&self) -> String {
        format!("{}+{}", self.grandfathered_dataset, self.notified_dataset)
    }
}

#[async_trait]
impl<S: ReferenceStore + 'static> ComplianceChecker for NdiChecker<S> {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Ndi
    }

    async fn check(&self, ingredients: &[String]) -> Result<ComplianceReport> {
        let mut odi_warnings = Vec::new();
        let mut ndi_warnings = Vec::new();

        // 兩個資料集互不相依，同時載入；兩者都完成後才判斷錯誤
        let (grandfathered, notified) = tokio::join!(
            required_snapshot(&self.cache, self.kind(), &self.grandfathered_dataset, &mut odi_warnings),
            required_snapshot(&self.cache, self.kind(), &self.notified_dataset, &mut ndi_warnings),
        );
        let grandfathered = grandfathered?;
        let notified = notified?;

        let findings: Vec<IngredientFinding> = ingredients
            .iter()
            .map(|raw| {
                let odi_match = match_ingredient(raw, &grandfathered);
                if odi_match.is_match() {
                    return IngredientFinding {
                        status: FindingStatus::Grandfathered,
                        match_result: odi_match,
                    };
                }

                let ndi_match = match_ingredient(raw, &notified);
                let status = if ndi_match.is_match() {
                    FindingStatus::Notified
                } else {
                    tracing::debug!("📋 '{}' requires a new dietary ingredient notification", raw);
                    FindingStatus::NotificationRequired
                };
                IngredientFinding {
                    status,
                    match_result: ndi_match,
                }
            })
            .collect();

        odi_warnings.append(&mut ndi_warnings);
        let report = ComplianceReport::new(self.kind(), self.report_dataset(), findings).with_warnings(odi_warnings);
        tracing::info!(
            "🧾 NDI: {} of {} ingredients require notification",
            report.non_compliant_count(),
            report.total_ingredients()
        );
        Ok(report)
    }
}
