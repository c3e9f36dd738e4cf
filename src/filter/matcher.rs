//! Trigger pattern matching.

use regex::{Regex, RegexBuilder};

/// A trigger pattern, compiled once and shared read-only by every check.
///
/// Matching is case-insensitive and unanchored: the pattern may match anywhere
/// in the text.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    pattern: Regex,
}

impl TextMatcher {
    /// Compiles `pattern` case-insensitively.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(TextMatcher { pattern })
    }

    /// Returns true if the pattern matches anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matcher() -> TextMatcher {
        TextMatcher::new("b[^a-z]*12").unwrap()
    }

    #[test]
    fn punctuation_between_tokens_matches() {
        assert!(matcher().matches("B...12"));
    }

    #[test]
    fn digits_and_spaces_that_split_the_token_do_not_match() {
        assert!(!matcher().matches("B1 2"));
    }

    #[test]
    fn letters_between_tokens_do_not_match() {
        assert!(!matcher().matches("bx12"));
    }

    #[test]
    fn match_is_case_insensitive() {
        let matcher = TextMatcher::new("hello world").unwrap();
        assert!(matcher.matches("HELLO World"));
    }

    #[test]
    fn match_is_unanchored() {
        assert!(matcher().matches("well, b-12 is the answer"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(TextMatcher::new("b[").is_err());
    }

    proptest! {
        #[test]
        fn matching_ignores_case(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
            let text = format!("{}b 12{}", prefix, suffix);
            prop_assert_eq!(matcher().matches(&text), matcher().matches(&text.to_uppercase()));
            prop_assert!(matcher().matches(&text));
        }
    }
}
