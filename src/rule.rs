//! Keyword match rule for listing titles.
//!
//! Matching is a plain case-insensitive substring test. It is not
//! word-boundary aware: the keyword `ipad` also matches `ipads` or
//! `superipad`. This looseness is accepted; a missed listing costs more than
//! an extra email.

use serde::Deserialize;

/// Part of a title searched for keywords.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// The whole title.
    #[default]
    Title,
    /// Only the `[H]` (have) section of a swap-style title.
    Have,
}

/// Relevance predicate over item titles.
#[derive(Debug, Clone)]
pub struct MatchRule {
    keywords: Vec<String>,
    scope: MatchScope,
}

impl MatchRule {
    /// Create a rule from keywords.
    ///
    /// Keywords are trimmed and lower-cased; blank keywords are dropped.
    pub fn new<I, S>(keywords: I, scope: MatchScope) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords, scope }
    }

    /// Keywords in normalized form.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Configured scope.
    pub fn scope(&self) -> MatchScope {
        self.scope
    }

    /// Check whether a title is relevant.
    pub fn matches(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        let haystack = match self.scope {
            MatchScope::Title => lower.as_str(),
            MatchScope::Have => match have_section(&lower) {
                Some(section) => section,
                None => return false,
            },
        };

        if haystack.is_empty() {
            return false;
        }
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Extract the `[h]` section of a lower-cased swap title.
///
/// The section starts at `[h]` and ends right before `[w]` when `[w]` comes
/// after it; otherwise it runs to the end of the title.
pub fn have_section(title_lower: &str) -> Option<&str> {
    let h = title_lower.find("[h]")?;
    match title_lower.find("[w]") {
        Some(w) if w > h => Some(&title_lower[h..w]),
        _ => Some(&title_lower[h..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rule() -> MatchRule {
        MatchRule::new(["ipad", "ipad pro"], MatchScope::Title)
    }

    #[test]
    fn test_matches_any_casing() {
        let rule = default_rule();
        assert!(rule.matches("iPad Pro for trade"));
        assert!(rule.matches("IPAD PRO FOR TRADE"));
        assert!(rule.matches("ipad pro for trade"));
    }

    #[test]
    fn test_rejects_other_devices() {
        let rule = default_rule();
        assert!(!rule.matches("iPhone 12 for sale"));
        assert!(!rule.matches("WTS iPhone"));
    }

    #[test]
    fn test_empty_title_never_matches() {
        assert!(!default_rule().matches(""));
    }

    #[test]
    fn test_substring_inside_word_matches() {
        assert!(default_rule().matches("Bundle of iPads"));
        assert!(default_rule().matches("miniipadcase"));
    }

    #[test]
    fn test_keywords_normalized() {
        let rule = MatchRule::new(["  IPad ", "", "   "], MatchScope::Title);
        assert_eq!(rule.keywords(), &["ipad".to_string()]);
    }

    #[test]
    fn test_rule_without_keywords_matches_nothing() {
        let rule = MatchRule::new(Vec::<String>::new(), MatchScope::Title);
        assert!(!rule.matches("iPad"));
    }

    #[test]
    fn test_have_section_before_want() {
        assert_eq!(
            have_section("[usa-ca] [h] ipad air [w] paypal"),
            Some("[h] ipad air ")
        );
    }

    #[test]
    fn test_have_section_after_want() {
        assert_eq!(
            have_section("[usa-ca] [w] ipad [h] paypal"),
            Some("[h] paypal")
        );
    }

    #[test]
    fn test_have_section_missing() {
        assert_eq!(have_section("selling ipad"), None);
    }

    #[test]
    fn test_have_scope_ignores_wants() {
        let rule = MatchRule::new(["ipad"], MatchScope::Have);
        assert!(rule.matches("[USA-NY] [H] iPad Pro 11 [W] PayPal"));
        assert!(!rule.matches("[USA-NY] [H] PayPal [W] iPad Pro"));
        assert!(!rule.matches("Selling iPad Air"));
    }

    #[test]
    fn test_have_scope_without_want() {
        let rule = MatchRule::new(["ipad"], MatchScope::Have);
        assert!(rule.matches("[US-TX] [H] iPad mini 6"));
    }
}
