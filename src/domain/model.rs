use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::core::normalizer::normalize;

/// 參考資料集的種類標籤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Gras,
    Ndi,
    Odi,
    Allergen,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatasetKind::Gras => "GRAS",
            DatasetKind::Ndi => "NDI",
            DatasetKind::Odi => "ODI",
            DatasetKind::Allergen => "Allergen",
        };
        f.write_str(label)
    }
}

/// 單筆參考資料。載入快照後即不可變。
///
/// For allergen datasets the canonical name is the allergen category ("Milk") and the
/// synonyms are its derivative ingredient names ("casein", "whey").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub canonical_name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub kind: DatasetKind,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source_citation: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ReferenceEntry {
    pub fn new(kind: DatasetKind, canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            synonyms: Vec::new(),
            kind,
            status: None,
            source_citation: None,
            is_active: true,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.source_citation = Some(citation.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// 某資料集在某時間點的完整快照。刷新時整份替換，絕不原地修改。
#[derive(Debug)]
pub struct DatasetSnapshot {
    dataset: String,
    entries: Vec<ReferenceEntry>,
    loaded_at: DateTime<Utc>,
    loaded_instant: tokio::time::Instant,
    canonical_index: HashMap<String, usize>,
    synonym_index: HashMap<String, usize>,
}

impl DatasetSnapshot {
    pub fn new(dataset: impl Into<String>, entries: Vec<ReferenceEntry>) -> Self {
        let mut canonical_index = HashMap::new();
        let mut synonym_index = HashMap::new();

        // 只保留每個鍵第一次出現的位置，對應「快照中較早者優先」
        for (position, entry) in entries.iter().enumerate() {
            if !entry.is_active {
                continue;
            }
            let key = normalize(&entry.canonical_name);
            if !key.is_empty() {
                canonical_index.entry(key).or_insert(position);
            }
            for synonym in &entry.synonyms {
                let key = normalize(synonym);
                if !key.is_empty() {
                    synonym_index.entry(key).or_insert(position);
                }
            }
        }

        Self {
            dataset: dataset.into(),
            entries,
            loaded_at: Utc::now(),
            loaded_instant: tokio::time::Instant::now(),
            canonical_index,
            synonym_index,
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn age(&self) -> Duration {
        self.loaded_instant.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    pub(crate) fn position_by_canonical(&self, normalized: &str) -> Option<usize> {
        self.canonical_index.get(normalized).copied()
    }

    pub(crate) fn position_by_synonym(&self, normalized: &str) -> Option<usize> {
        self.synonym_index.get(normalized).copied()
    }

    pub(crate) fn entry_at(&self, position: usize) -> &ReferenceEntry {
        &self.entries[position]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Synonym,
    Fuzzy,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub raw: String,
    pub normalized: String,
    pub entry: Option<ReferenceEntry>,
    pub tier: MatchTier,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_phrase: Option<String>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.entry.is_some()
    }
}

/// 各檢查器對單一成分的判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FindingStatus {
    Recognized,
    NotRecognized,
    Grandfathered,
    Notified,
    NotificationRequired,
    AllergenDetected { category: String },
    NoAllergen,
    Unresolvable,
}

impl FindingStatus {
    pub fn is_compliant(&self) -> bool {
        !matches!(
            self,
            FindingStatus::NotRecognized
                | FindingStatus::NotificationRequired
                | FindingStatus::Unresolvable
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientFinding {
    #[serde(flatten)]
    pub status: FindingStatus,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
}

/// 偵測到的過敏原類別及其來源成分（保留原始字串與輸入順序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllergenDetection {
    pub category: String,
    pub contributing_ingredients: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerKind {
    Gras,
    Ndi,
    Allergen,
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckerKind::Gras => "gras",
            CheckerKind::Ndi => "ndi",
            CheckerKind::Allergen => "allergen",
        };
        f.write_str(label)
    }
}

/// 單一檢查器的報告。`overall_compliant` 只能由建構子從逐項結果推導。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    checker: CheckerKind,
    dataset: String,
    total_ingredients: usize,
    findings: Vec<IngredientFinding>,
    compliant_count: usize,
    non_compliant_count: usize,
    overall_compliant: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allergens: Vec<AllergenDetection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl ComplianceReport {
    pub fn new(checker: CheckerKind, dataset: impl Into<String>, findings: Vec<IngredientFinding>) -> Self {
        let compliant_count = findings.iter().filter(|f| f.status.is_compliant()).count();
        let non_compliant_count = findings.len() - compliant_count;

        Self {
            checker,
            dataset: dataset.into(),
            total_ingredients: findings.len(),
            overall_compliant: non_compliant_count == 0,
            findings,
            compliant_count,
            non_compliant_count,
            allergens: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_allergens(mut self, allergens: Vec<AllergenDetection>) -> Self {
        self.allergens = allergens;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn checker(&self) -> CheckerKind {
        self.checker
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn total_ingredients(&self) -> usize {
        self.total_ingredients
    }

    pub fn findings(&self) -> &[IngredientFinding] {
        &self.findings
    }

    pub fn compliant_count(&self) -> usize {
        self.compliant_count
    }

    pub fn non_compliant_count(&self) -> usize {
        self.non_compliant_count
    }

    pub fn overall_compliant(&self) -> bool {
        self.overall_compliant
    }

    pub fn allergens(&self) -> &[AllergenDetection] {
        &self.allergens
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 篩出不合規的成分
    pub fn non_compliant(&self) -> impl Iterator<Item = &IngredientFinding> {
        self.findings.iter().filter(|f| !f.status.is_compliant())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckerOutcome {
    pub checker: CheckerKind,
    pub status: CheckerStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ComplianceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckerOutcome {
    pub fn succeeded(checker: CheckerKind, elapsed: Duration, report: ComplianceReport) -> Self {
        Self {
            checker,
            status: CheckerStatus::Ok,
            elapsed_ms: elapsed.as_millis() as u64,
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(checker: CheckerKind, elapsed: Duration, error: String) -> Self {
        Self {
            checker,
            status: CheckerStatus::Failed,
            elapsed_ms: elapsed.as_millis() as u64,
            report: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CheckerStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalEscalation {
    pub category: String,
    pub contributing_ingredients: Vec<String>,
    pub reason: String,
}

/// 交給外部報告組裝階段的彙總結果，純資料，不含任何快取參照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateComplianceResult {
    pub gras: CheckerOutcome,
    pub ndi: CheckerOutcome,
    pub allergens: CheckerOutcome,
    pub critical_escalations: Vec<CriticalEscalation>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub total_elapsed_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl AggregateComplianceResult {
    pub fn outcomes(&self) -> [&CheckerOutcome; 3] {
        [&self.gras, &self.ndi, &self.allergens]
    }

    pub fn failed_checkers(&self) -> Vec<CheckerKind> {
        self.outcomes()
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.checker)
            .collect()
    }

    /// 僅當三個檢查器皆成功、皆合規且無升級事項時為真
    pub fn is_fully_compliant(&self) -> bool {
        !self.degraded
            && self.critical_escalations.is_empty()
            && self
                .outcomes()
                .iter()
                .all(|o| o.report.as_ref().is_some_and(|r| r.overall_compliant()))
    }
}
