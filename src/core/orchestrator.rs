use crate::core::cache::ReferenceDataCache;
use crate::core::checkers::{AllergenChecker, GrasChecker, NdiChecker};
use crate::core::declaration::{uncovered_allergens, EscalationPolicy};
use crate::core::{ComplianceChecker, DatasetNames, ReferenceStore};
use crate::domain::model::{AggregateComplianceResult, CheckerOutcome};
use crate::utils::error::{ComplianceError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;

/// 同時執行三個檢查器並彙整結果。任一檢查器失敗不會中斷其他檢查器。
pub struct ComplianceOrchestrator {
    gras: Arc<dyn ComplianceChecker>,
    ndi: Arc<dyn ComplianceChecker>,
    allergens: Arc<dyn ComplianceChecker>,
    policy: EscalationPolicy,
}

impl ComplianceOrchestrator {
    pub fn new(
        gras: Arc<dyn ComplianceChecker>,
        ndi: Arc<dyn ComplianceChecker>,
        allergens: Arc<dyn ComplianceChecker>,
    ) -> Self {
        Self {
            gras,
            ndi,
            allergens,
            policy: EscalationPolicy::default(),
        }
    }

    pub fn from_cache<S, D>(cache: Arc<ReferenceDataCache<S>>, datasets: &D) -> Self
    where
        S: ReferenceStore + 'static,
        D: DatasetNames + ?Sized,
    {
        Self::new(
            Arc::new(GrasChecker::new(cache.clone(), datasets.gras_dataset())),
            Arc::new(NdiChecker::new(
                cache.clone(),
                datasets.odi_dataset(),
                datasets.ndi_dataset(),
            )),
            Arc::new(AllergenChecker::new(cache, datasets.allergen_dataset())),
        )
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 只有三個檢查器全部失敗時才回傳錯誤，其餘情況回傳（可能為降級的）彙總結果
    pub async fn run(
        &self,
        ingredients: &[String],
        declared_allergen_statement: Option<&str>,
    ) -> Result<AggregateComplianceResult> {
        let started = Instant::now();
        let shared: Arc<[String]> = Arc::from(ingredients);
        let statement = declared_allergen_statement.filter(|s| !s.trim().is_empty());

        tracing::info!("🚀 Running compliance checks on {} ingredients", shared.len());

        let (gras, ndi, allergens) = tokio::join!(
            run_checker(Arc::clone(&self.gras), Arc::clone(&shared)),
            run_checker(Arc::clone(&self.ndi), Arc::clone(&shared)),
            run_checker(Arc::clone(&self.allergens), shared),
        );

        let outcomes = [&gras, &ndi, &allergens];
        if outcomes.iter().all(|o| !o.is_ok()) {
            let failures = outcomes
                .iter()
                .map(|o| format!("{}: {}", o.checker, o.error.as_deref().unwrap_or("unknown error")))
                .collect();
            return Err(ComplianceError::AllCheckersFailed { failures });
        }

        let mut warnings: Vec<String> = outcomes
            .iter()
            .filter_map(|o| o.report.as_ref())
            .flat_map(|r| r.warnings().iter().cloned())
            .collect();

        let critical_escalations = match &allergens.report {
            Some(report) => uncovered_allergens(report.allergens(), statement, self.policy),
            None => {
                warnings.push(
                    "Allergen declaration consistency was not evaluated because the allergen checker failed"
                        .to_string(),
                );
                Vec::new()
            }
        };

        for escalation in &critical_escalations {
            tracing::warn!(
                "🚨 Undeclared allergen '{}' from {:?}",
                escalation.category,
                escalation.contributing_ingredients
            );
        }

        let degraded = outcomes.iter().any(|o| !o.is_ok());
        if degraded {
            tracing::warn!("⚠️ Compliance result is degraded: at least one checker failed");
        }

        let total_elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "✅ Compliance run finished in {}ms (escalations: {})",
            total_elapsed_ms,
            critical_escalations.len()
        );

        Ok(AggregateComplianceResult {
            gras,
            ndi,
            allergens,
            critical_escalations,
            degraded,
            warnings,
            total_elapsed_ms,
            checked_at: Utc::now(),
        })
    }
}

/// 在獨立 task 中執行檢查器，錯誤與 panic 都轉成失敗狀態
async fn run_checker(checker: Arc<dyn ComplianceChecker>, ingredients: Arc<[String]>) -> CheckerOutcome {
    let kind = checker.kind();
    let started = Instant::now();
    let joined = tokio::spawn(async move { checker.check(&ingredients).await }).await;
    let elapsed = started.elapsed();

    match joined {
        Ok(Ok(report)) => {
            tracing::debug!("⏱️ {} checker finished in {:?}", kind, elapsed);
            CheckerOutcome::succeeded(kind, elapsed, report)
        }
        Ok(Err(e)) => {
            tracing::error!("❌ {} checker failed: {}", kind, e);
            CheckerOutcome::failed(kind, elapsed, e.to_string())
        }
        Err(join_error) => {
            tracing::error!("❌ {} checker aborted: {}", kind, join_error);
            CheckerOutcome::failed(kind, elapsed, format!("{} checker aborted: {}", kind, join_error))
        }
    }
}
