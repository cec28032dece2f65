use anyhow::Result;
use ingredient_compliance::config::DatasetsConfig;
use ingredient_compliance::domain::model::{
    CheckerStatus, DatasetKind, FindingStatus, MatchTier, ReferenceEntry,
};
use ingredient_compliance::{CacheConfig, ComplianceEngine, EscalationPolicy, InMemoryStore};

fn reference_store() -> InMemoryStore {
    InMemoryStore::new(1000)
        .with_dataset(
            "gras_substances",
            vec![
                ReferenceEntry::new(DatasetKind::Gras, "Sugar").with_synonyms(["Sucrose", "Cane Sugar"]),
                ReferenceEntry::new(DatasetKind::Gras, "Natural Flavor").with_synonyms(["Natural Flavors"]),
                ReferenceEntry::new(DatasetKind::Gras, "Whey Protein Isolate"),
                ReferenceEntry::new(DatasetKind::Gras, "Soy Lecithin"),
                ReferenceEntry::new(DatasetKind::Gras, "Citric Acid"),
            ],
        )
        .with_dataset(
            "old_dietary_ingredients",
            vec![
                ReferenceEntry::new(DatasetKind::Odi, "Sugar"),
                ReferenceEntry::new(DatasetKind::Odi, "Whey Protein Isolate"),
                ReferenceEntry::new(DatasetKind::Odi, "Natural Flavor"),
            ],
        )
        .with_dataset(
            "ndi_notifications",
            vec![ReferenceEntry::new(DatasetKind::Ndi, "Nicotinamide Riboside").with_citation("NDI 1062")],
        )
        .with_dataset(
            "major_allergens",
            vec![
                ReferenceEntry::new(DatasetKind::Allergen, "Milk")
                    .with_synonyms(["Casein", "Whey", "Whey Protein Isolate"]),
                ReferenceEntry::new(DatasetKind::Allergen, "Soy").with_synonyms(["Soy Lecithin"]),
            ],
        )
}

fn engine(policy: EscalationPolicy) -> ComplianceEngine<InMemoryStore> {
    ComplianceEngine::new(reference_store(), CacheConfig::default(), DatasetsConfig::default(), policy)
}

fn ingredients(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_undeclared_milk_is_escalated() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine
        .run(&ingredients(&["Whey Protein Isolate", "Sugar", "Natural Flavor"]), None)
        .await?;

    assert!(!result.degraded);
    assert_eq!(result.critical_escalations.len(), 1);
    assert_eq!(result.critical_escalations[0].category, "Milk");
    assert_eq!(
        result.critical_escalations[0].contributing_ingredients,
        vec!["Whey Protein Isolate"]
    );
    assert!(!result.is_fully_compliant());

    let gras = result.gras.report.as_ref().expect("gras report");
    assert!(gras.overall_compliant());
    assert_eq!(gras.compliant_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_declared_allergens_pass_cleanly() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine
        .run(
            &ingredients(&["Whey Protein Isolate", "Soy Lecithin", "Cane Sugar"]),
            Some("CONTAINS: MILK, SOY"),
        )
        .await?;

    assert!(result.critical_escalations.is_empty());
    let allergens = result.allergens.report.as_ref().expect("allergen report");
    let categories: Vec<&str> = allergens.allergens().iter().map(|d| d.category.as_str()).collect();
    assert_eq!(categories, vec!["Milk", "Soy"]);

    let gras = result.gras.report.as_ref().expect("gras report");
    assert_eq!(gras.findings()[2].match_result.tier, MatchTier::Synonym);
    Ok(())
}

#[tokio::test]
async fn test_partial_declaration_escalates_only_missing_category() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine
        .run(&ingredients(&["Whey", "Soy Lecithin"]), Some("Contains: Soy"))
        .await?;

    assert_eq!(result.critical_escalations.len(), 1);
    assert_eq!(result.critical_escalations[0].category, "Milk");
    Ok(())
}

#[tokio::test]
async fn test_parenthetical_declarations_when_enabled() -> Result<()> {
    let label = ingredients(&["Whey (Milk)", "Sugar"]);

    let strict = engine(EscalationPolicy::default()).run(&label, None).await?;
    assert_eq!(strict.critical_escalations.len(), 1);

    let lenient = engine(EscalationPolicy {
        parenthetical_declarations: true,
    })
    .run(&label, None)
    .await?;
    assert!(lenient.critical_escalations.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_label_variants_resolve_through_normalization() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine
        .run(
            &ingredients(&["  Organic Cane Sugar ", "Citric Acid 2%", "Natural Flavors (from fruit)"]),
            None,
        )
        .await?;

    let gras = result.gras.report.as_ref().expect("gras report");
    assert!(gras.findings().iter().all(|f| f.status == FindingStatus::Recognized));
    assert_eq!(gras.findings()[0].match_result.tier, MatchTier::Fuzzy);
    assert_eq!(gras.findings()[1].match_result.tier, MatchTier::Exact);
    assert_eq!(gras.findings()[2].match_result.tier, MatchTier::Synonym);
    Ok(())
}

#[tokio::test]
async fn test_ndi_statuses_in_aggregate() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine
        .run(&ingredients(&["Sugar", "Nicotinamide Riboside", "Trehalose"]), Some("None"))
        .await?;

    let ndi = result.ndi.report.as_ref().expect("ndi report");
    let statuses: Vec<&FindingStatus> = ndi.findings().iter().map(|f| &f.status).collect();
    assert_eq!(
        statuses,
        vec![
            &FindingStatus::Grandfathered,
            &FindingStatus::Notified,
            &FindingStatus::NotificationRequired,
        ]
    );
    assert_eq!(ndi.non_compliant().count(), 1);
    assert_eq!(result.ndi.status, CheckerStatus::Ok);
    Ok(())
}

#[tokio::test]
async fn test_missing_allergen_dataset_degrades_result() -> Result<()> {
    let store = InMemoryStore::new(1000)
        .with_dataset(
            "gras_substances",
            vec![ReferenceEntry::new(DatasetKind::Gras, "Sugar")],
        )
        .with_dataset("old_dietary_ingredients", vec![ReferenceEntry::new(DatasetKind::Odi, "Sugar")])
        .with_dataset("ndi_notifications", Vec::new());
    let engine = ComplianceEngine::new(
        store,
        CacheConfig::default(),
        DatasetsConfig::default(),
        EscalationPolicy::default(),
    );

    let result = engine.run(&ingredients(&["Sugar"]), None).await?;

    assert!(result.degraded);
    assert_eq!(result.allergens.status, CheckerStatus::Failed);
    assert!(result.allergens.error.as_deref().unwrap_or_default().contains("major_allergens"));
    assert!(result.critical_escalations.is_empty());
    assert!(result.warnings.iter().any(|w| w.contains("not evaluated")));
    assert!(result.gras.report.as_ref().expect("gras report").overall_compliant());
    assert!(!result.is_fully_compliant());
    Ok(())
}

#[tokio::test]
async fn test_empty_ingredient_list() -> Result<()> {
    let engine = engine(EscalationPolicy::default());

    let result = engine.run(&[], None).await?;

    for outcome in result.outcomes() {
        let report = outcome.report.as_ref().expect("report");
        assert_eq!(report.total_ingredients(), 0);
        assert!(report.overall_compliant());
    }
    assert!(result.is_fully_compliant());
    Ok(())
}
