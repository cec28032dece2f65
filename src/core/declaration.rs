use crate::domain::model::{AllergenDetection, CriticalEscalation};

#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationPolicy {
    /// 也接受成分旁括號內的宣告，例如 "Whey (Milk)"
    pub parenthetical_declarations: bool,
}

/// 宣告文字是否（不分大小寫）包含類別名稱
pub fn statement_covers(statement: Option<&str>, category: &str) -> bool {
    let category = category.trim().to_lowercase();
    if category.is_empty() {
        return true;
    }
    statement.is_some_and(|s| s.to_lowercase().contains(&category))
}

/// 成分原字串中是否有括號內容提及該類別
pub fn parenthetical_declares(raw_ingredient: &str, category: &str) -> bool {
    let category = category.trim().to_lowercase();
    let lowered = raw_ingredient.to_lowercase();
    let mut rest = lowered.as_str();

    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            return false;
        };
        if after[..close].contains(&category) {
            return true;
        }
        rest = &after[close + 1..];
    }
    false
}

/// 對每個未被宣告涵蓋的過敏原類別產生一筆重大升級事項
pub fn uncovered_allergens(
    detections: &[AllergenDetection],
    statement: Option<&str>,
    policy: EscalationPolicy,
) -> Vec<CriticalEscalation> {
    detections
        .iter()
        .filter(|detection| {
            if statement_covers(statement, &detection.category) {
                return false;
            }
            let declared_inline = policy.parenthetical_declarations
                && !detection.contributing_ingredients.is_empty()
                && detection
                    .contributing_ingredients
                    .iter()
                    .all(|raw| parenthetical_declares(raw, &detection.category));
            !declared_inline
        })
        .map(|detection| CriticalEscalation {
            category: detection.category.clone(),
            contributing_ingredients: detection.contributing_ingredients.clone(),
            reason: match statement {
                Some(_) => format!(
                    "Allergen '{}' detected but not named in the allergen statement",
                    detection.category
                ),
                None => format!(
                    "Allergen '{}' detected but the label has no allergen statement",
                    detection.category
                ),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk(contributors: &[&str]) -> AllergenDetection {
        AllergenDetection {
            category: "Milk".to_string(),
            contributing_ingredients: contributors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_statement_containment_is_case_insensitive() {
        assert!(statement_covers(Some("CONTAINS: MILK, SOY"), "Milk"));
        assert!(statement_covers(Some("contains milk"), "milk"));
        assert!(!statement_covers(Some("Contains: Soy"), "Milk"));
        assert!(!statement_covers(None, "Milk"));
    }

    #[test]
    fn test_parenthetical_declaration_detection() {
        assert!(parenthetical_declares("Whey (Milk)", "Milk"));
        assert!(parenthetical_declares("Lecithin (from soy), Casein (milk protein)", "milk"));
        assert!(!parenthetical_declares("Whey Protein Isolate", "Milk"));
        assert!(!parenthetical_declares("Whey (Milk", "Milk"));
    }

    #[test]
    fn test_missing_statement_escalates() {
        let escalations = uncovered_allergens(&[milk(&["Whey Protein Isolate"])], None, EscalationPolicy::default());

        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].category, "Milk");
        assert_eq!(escalations[0].contributing_ingredients, vec!["Whey Protein Isolate"]);
        assert!(escalations[0].reason.contains("no allergen statement"));
    }

    #[test]
    fn test_covered_category_does_not_escalate() {
        let escalations = uncovered_allergens(
            &[milk(&["Whey Protein Isolate"])],
            Some("Contains: Milk"),
            EscalationPolicy::default(),
        );
        assert!(escalations.is_empty());
    }

    #[test]
    fn test_parenthetical_only_counts_when_enabled() {
        let detections = [milk(&["Whey (Milk)"])];

        let strict = uncovered_allergens(&detections, None, EscalationPolicy::default());
        assert_eq!(strict.len(), 1);

        let lenient = uncovered_allergens(
            &detections,
            None,
            EscalationPolicy {
                parenthetical_declarations: true,
            },
        );
        assert!(lenient.is_empty());
    }

    #[test]
    fn test_parenthetical_must_cover_every_contributor() {
        let detections = [milk(&["Whey (Milk)", "Casein"])];
        let escalations = uncovered_allergens(
            &detections,
            Some("Contains: Soy"),
            EscalationPolicy {
                parenthetical_declarations: true,
            },
        );
        assert_eq!(escalations.len(), 1);
        assert!(escalations[0].reason.contains("not named"));
    }
}
