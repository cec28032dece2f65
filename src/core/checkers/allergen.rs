use crate::core::cache::ReferenceDataCache;
use crate::core::checkers::required_snapshot;
use crate::core::matcher::match_ingredient;
use crate::core::{ComplianceChecker, ReferenceStore};
use crate::domain::model::{
    AllergenDetection, CheckerKind, ComplianceReport, FindingStatus, IngredientFinding,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// 主要過敏原偵測。資料集中每筆條目的標準名稱為過敏原類別，同義詞為其衍生成分。
///
/// The report's compliance flag only reflects whether every ingredient could be evaluated;
/// whether the label declares the detected allergens is decided by the orchestrator.
pub struct AllergenChecker<S: ReferenceStore> {
    cache: Arc<ReferenceDataCache<S>>,
    dataset: String,
}

impl<S: ReferenceStore> AllergenChecker<S> {
    pub fn new(cache: Arc<ReferenceDataCache<S>>, dataset: impl Into<String>) -> Self {
        Self {
            cache,
            dataset: dataset.into(),
        }
    }
}

/// 依首次偵測順序合併同類別，保留所有來源成分原字串
fn group_detections(findings: &[IngredientFinding]) -> Vec<AllergenDetection> {
    let mut detections: Vec<AllergenDetection> = Vec::new();
    let mut by_category: HashMap<&str, usize> = HashMap::new();

    for finding in findings {
        let FindingStatus::AllergenDetected { category } = &finding.status else {
            continue;
        };
        let index = *by_category.entry(category.as_str()).or_insert_with(|| {
            detections.push(AllergenDetection {
                category: category.clone(),
                contributing_ingredients: Vec::new(),
            });
            detections.len() - 1
        });
        detections[index]
            .contributing_ingredients
            .push(finding.match_result.raw.clone());
    }

    detections
}

#[async_trait]
impl<S: ReferenceStore + 'static> ComplianceChecker for AllergenChecker<S> {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Allergen
    }

    async fn check(&self, ingredients: &[String]) -> Result<ComplianceReport> {
        let mut warnings = Vec::new();
        let snapshot = required_snapshot(&self.cache, self.kind(), &self.dataset, &mut warnings).await?;

        let findings: Vec<IngredientFinding> = ingredients
            .iter()
            .map(|raw| {
                let match_result = match_ingredient(raw, &snapshot);
                let status = match &match_result.entry {
                    Some(entry) => FindingStatus::AllergenDetected {
                        category: entry.canonical_name.clone(),
                    },
                    None if match_result.normalized.is_empty() => FindingStatus::Unresolvable,
                    None => FindingStatus::NoAllergen,
                };
                IngredientFinding { status, match_result }
            })
            .collect();

        let detections = group_detections(&findings);
        tracing::info!(
            "🥛 Allergens: {} categor{} detected across {} ingredients",
            detections.len(),
            if detections.len() == 1 { "y" } else { "ies" },
            findings.len()
        );

        Ok(ComplianceReport::new(self.kind(), &self.dataset, findings)
            .with_allergens(detections)
            .with_warnings(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::core::checkers::fixtures::*;
    use crate::domain::model::MatchTier;

    fn checker(store: InMemoryStore) -> AllergenChecker<InMemoryStore> {
        AllergenChecker::new(Arc::new(ReferenceDataCache::new(store)), ALLERGENS)
    }

    #[tokio::test]
    async fn test_detects_milk_from_whey_protein_isolate() {
        let checker = checker(full_store());
        let report = checker
            .check(&ingredients(&["Whey Protein Isolate", "Sugar", "Natural Flavor"]))
            .await
            .unwrap();

        assert_eq!(report.allergens().len(), 1);
        assert_eq!(report.allergens()[0].category, "Milk");
        assert_eq!(report.allergens()[0].contributing_ingredients, vec!["Whey Protein Isolate"]);
        assert_eq!(report.findings()[0].match_result.tier, MatchTier::Synonym);
        assert_eq!(report.findings()[1].status, FindingStatus::NoAllergen);
        // Detecting an allergen does not make the report non-compliant
        assert!(report.overall_compliant());
    }

    #[tokio::test]
    async fn test_categories_are_deduplicated_with_all_contributors() {
        let checker = checker(full_store());
        let report = checker
            .check(&ingredients(&["Casein", "Soy Lecithin", "Whey", "Nonfat Dry Milk", "Casein"]))
            .await
            .unwrap();

        let categories: Vec<&str> = report.allergens().iter().map(|d| d.category.as_str()).collect();
        assert_eq!(categories, vec!["Milk", "Soy"]);
        assert_eq!(
            report.allergens()[0].contributing_ingredients,
            vec!["Casein", "Whey", "Nonfat Dry Milk", "Casein"]
        );
        assert_eq!(report.allergens()[1].contributing_ingredients, vec!["Soy Lecithin"]);
    }

    #[tokio::test]
    async fn test_unresolvable_ingredient_breaks_completeness() {
        let checker = checker(full_store());
        let report = checker.check(&ingredients(&["Sugar", "(contains 2% or less)"])).await.unwrap();

        assert_eq!(report.findings()[1].status, FindingStatus::Unresolvable);
        assert!(!report.overall_compliant());
        assert!(report.allergens().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_whole_check() {
        let checker = checker(InMemoryStore::new(1000).with_dataset(GRAS, gras_entries()));
        let result = checker.check(&ingredients(&["Whey"])).await;
        tokio_test::assert_err!(result);
    }
}
