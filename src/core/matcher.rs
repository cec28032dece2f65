use crate::core::normalizer::normalize;
use crate::domain::model::{Confidence, DatasetSnapshot, MatchResult, MatchTier};

/// 依序嘗試 exact → synonym → fuzzy，第一個成功的層級即為結果。
///
/// Pure and synchronous; safe to call from any number of tasks sharing one snapshot.
pub fn match_ingredient(raw: &str, snapshot: &DatasetSnapshot) -> MatchResult {
    let normalized = normalize(raw);

    if normalized.is_empty() {
        return unmatched(raw, normalized);
    }

    if let Some(position) = snapshot.position_by_canonical(&normalized) {
        return matched(raw, normalized, snapshot, position, MatchTier::Exact, Confidence::High, None);
    }

    if let Some(position) = snapshot.position_by_synonym(&normalized) {
        return matched(raw, normalized, snapshot, position, MatchTier::Synonym, Confidence::High, None);
    }

    if let Some(candidate) = best_fuzzy_candidate(&normalized, snapshot) {
        let confidence = if candidate.word_count > 1 {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        let phrase = Some(candidate.phrase);
        return matched(raw, normalized, snapshot, candidate.position, MatchTier::Fuzzy, confidence, phrase);
    }

    unmatched(raw, normalized)
}

struct FuzzyCandidate {
    phrase: String,
    word_count: usize,
    position: usize,
    name_length: usize,
}

/// 從最後一個字開始向左延伸組成候選片語，與標準名稱逐一比對。
/// 多個候選命中不同條目時，取標準名稱最短者，再取快照中最早者。
fn best_fuzzy_candidate(normalized: &str, snapshot: &DatasetSnapshot) -> Option<FuzzyCandidate> {
    let words: Vec<&str> = normalized.split(' ').collect();
    let mut best: Option<FuzzyCandidate> = None;

    for start in (0..words.len()).rev() {
        let phrase = words[start..].join(" ");
        let Some(position) = snapshot.position_by_canonical(&phrase) else {
            continue;
        };

        let candidate = FuzzyCandidate {
            name_length: phrase.chars().count(),
            word_count: words.len() - start,
            phrase,
            position,
        };

        let better = match &best {
            None => true,
            Some(current) => {
                (candidate.name_length, candidate.position) < (current.name_length, current.position)
            }
        };
        if better {
            best = Some(candidate);
        }
    }

    if let Some(candidate) = &best {
        tracing::debug!(
            "🔎 Fuzzy match '{}' -> '{}' in {}",
            normalized,
            candidate.phrase,
            snapshot.dataset()
        );
    }

    best
}

fn matched(
    raw: &str,
    normalized: String,
    snapshot: &DatasetSnapshot,
    position: usize,
    tier: MatchTier,
    confidence: Confidence,
    matched_phrase: Option<String>,
) -> MatchResult {
    MatchResult {
        raw: raw.to_string(),
        normalized,
        entry: Some(snapshot.entry_at(position).clone()),
        tier,
        confidence,
        matched_phrase,
    }
}

fn unmatched(raw: &str, normalized: String) -> MatchResult {
    MatchResult {
        raw: raw.to_string(),
        normalized,
        entry: None,
        tier: MatchTier::None,
        confidence: Confidence::Low,
        matched_phrase: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DatasetKind, ReferenceEntry};

    fn gras_snapshot() -> DatasetSnapshot {
        DatasetSnapshot::new(
            "gras_substances",
            vec![
                ReferenceEntry::new(DatasetKind::Gras, "Sugar").with_synonyms(["Sucrose", "Cane Sugar"]),
                ReferenceEntry::new(DatasetKind::Gras, "Citric Acid"),
                ReferenceEntry::new(DatasetKind::Gras, "Natural Flavor").with_synonyms(["Natural Flavors"]),
                ReferenceEntry::new(DatasetKind::Gras, "Green Tea Extract"),
                ReferenceEntry::new(DatasetKind::Gras, "Tea Extract"),
                ReferenceEntry::new(DatasetKind::Gras, "Extract"),
                ReferenceEntry::new(DatasetKind::Gras, "Ascorbic Acid").with_synonyms(["Vitamin C"]),
            ],
        )
    }

    #[test]
    fn test_canonical_name_matches_exactly() {
        let snapshot = gras_snapshot();
        for entry in snapshot.entries() {
            let result = match_ingredient(&entry.canonical_name, &snapshot);
            assert_eq!(result.tier, MatchTier::Exact, "{}", entry.canonical_name);
            assert_eq!(result.confidence, Confidence::High);
            assert_eq!(result.entry.as_ref(), Some(entry));
        }
    }

    #[test]
    fn test_exact_match_after_normalization() {
        let snapshot = gras_snapshot();
        let result = match_ingredient("CITRIC  ACID (anhydrous), USP", &snapshot);
        assert_eq!(result.tier, MatchTier::Exact);
        assert_eq!(result.normalized, "citric acid");
    }

    #[test]
    fn test_synonym_resolves_to_owning_entry() {
        let snapshot = gras_snapshot();

        let result = match_ingredient("Vitamin C", &snapshot);
        assert_eq!(result.tier, MatchTier::Synonym);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.entry.unwrap().canonical_name, "Ascorbic Acid");

        // "cane sugar" would also hit "Sugar" through the fuzzy tier; the synonym must win
        let result = match_ingredient("cane sugar", &snapshot);
        assert_eq!(result.tier, MatchTier::Synonym);
        assert_eq!(result.entry.unwrap().canonical_name, "Sugar");
    }

    #[test]
    fn test_fuzzy_prefers_shortest_canonical_name() {
        let snapshot = gras_snapshot();
        // Candidates "extract", "tea extract", "green tea extract" hit three different
        // entries; the shortest canonical name wins.
        let result = match_ingredient("Decaffeinated Green Tea Extract", &snapshot);
        assert_eq!(result.tier, MatchTier::Fuzzy);
        assert_eq!(result.entry.unwrap().canonical_name, "Extract");
        assert_eq!(result.matched_phrase.as_deref(), Some("extract"));
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_fuzzy_multi_word_candidate_is_medium_confidence() {
        let snapshot = gras_snapshot();
        let result = match_ingredient("Organic Natural Flavor", &snapshot);
        assert_eq!(result.tier, MatchTier::Fuzzy);
        assert_eq!(result.entry.unwrap().canonical_name, "Natural Flavor");
        assert_eq!(result.matched_phrase.as_deref(), Some("natural flavor"));
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_fuzzy_single_generic_word_is_low_confidence() {
        let snapshot = gras_snapshot();
        let result = match_ingredient("Organic Brown Sugar", &snapshot);
        assert_eq!(result.tier, MatchTier::Fuzzy);
        assert_eq!(result.entry.unwrap().canonical_name, "Sugar");
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_fuzzy_only_considers_trailing_phrases() {
        let snapshot = gras_snapshot();
        let result = match_ingredient("Sugar Alcohol Blend", &snapshot);
        assert_eq!(result.tier, MatchTier::None);
        assert!(result.entry.is_none());
    }

    #[test]
    fn test_no_match_returns_none_tier() {
        let snapshot = gras_snapshot();
        let result = match_ingredient("Trehalose", &snapshot);
        assert_eq!(result.tier, MatchTier::None);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.is_match());
    }

    #[test]
    fn test_empty_input_yields_none_tier_without_error() {
        let snapshot = gras_snapshot();
        for raw in ["", "   ", "(milk)", "12%"] {
            let result = match_ingredient(raw, &snapshot);
            assert_eq!(result.tier, MatchTier::None);
            assert_eq!(result.confidence, Confidence::Low);
            assert_eq!(result.normalized, "");
        }
    }

    #[test]
    fn test_inactive_entries_never_match() {
        let snapshot = DatasetSnapshot::new(
            "gras_substances",
            vec![ReferenceEntry::new(DatasetKind::Gras, "Ephedra").with_synonyms(["Ma Huang"]).inactive()],
        );
        assert_eq!(match_ingredient("Ephedra", &snapshot).tier, MatchTier::None);
        assert_eq!(match_ingredient("Ma Huang", &snapshot).tier, MatchTier::None);
    }

    #[test]
    fn test_duplicate_canonical_names_resolve_to_earliest_entry() {
        let snapshot = DatasetSnapshot::new(
            "ndi_notifications",
            vec![
                ReferenceEntry::new(DatasetKind::Ndi, "Curcumin").with_status("NDI 1001"),
                ReferenceEntry::new(DatasetKind::Ndi, "curcumin").with_status("NDI 1042"),
            ],
        );
        let result = match_ingredient("Curcumin", &snapshot);
        assert_eq!(result.entry.unwrap().status.as_deref(), Some("NDI 1001"));
    }
}
