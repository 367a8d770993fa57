//! Realname macro expansion.

/// Literal token recognized in free-text realname fields.
pub const COUNTRY_MACRO: &str = "%country";

/// Replaces every `%country` occurrence in `text` with `country_code`.
///
/// The code must already be normalized (post fallback and reserved-range
/// rewriting), so a failed lookup substitutes `AQ`. Text without the token
/// is returned unchanged.
pub fn expand_country_macro(text: &str, country_code: &str) -> String {
    if !text.contains(COUNTRY_MACRO) {
        return text.to_string();
    }
    text.replace(COUNTRY_MACRO, country_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_single_occurrence() {
        assert_eq!(expand_country_macro("user (%country)", "DE"), "user (DE)");
    }

    #[test]
    fn test_expands_all_occurrences() {
        assert_eq!(
            expand_country_macro("%country/%country", "US"),
            "US/US"
        );
    }

    #[test]
    fn test_text_without_token_unchanged() {
        assert_eq!(expand_country_macro("plain realname", "DE"), "plain realname");
        assert_eq!(expand_country_macro("", "DE"), "");
    }

    #[test]
    fn test_fallback_code_substitution() {
        assert_eq!(expand_country_macro("from %country", "AQ"), "from AQ");
    }

    #[test]
    fn test_partial_token_not_expanded() {
        assert_eq!(expand_country_macro("%countr", "DE"), "%countr");
        // A longer word still contains the literal token and is expanded.
        assert_eq!(expand_country_macro("%countryside", "DE"), "DEside");
    }
}
