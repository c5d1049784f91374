use crate::config::FlagConfig;
use crate::errors::Result;
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;

/// The compiled bad-flag matcher shared by the scanner and the replacer.
///
/// The flag is escaped before compilation, so matching is always literal. It
/// operates on raw bytes: content that is not valid UTF-8 is matched and
/// rewritten without being decoded, and every byte outside a match is kept.
#[derive(Debug, Clone)]
pub struct FlagPattern {
    bad: String,
    good: String,
    regex: Regex,
}

impl FlagPattern {
    /// Compiles a matcher for `bad`, replacing with `good`.
    pub fn new(bad: &str, good: &str) -> Result<Self> {
        if bad.is_empty() {
            return Err("the flag to replace must not be empty".into());
        }

        Ok(Self {
            bad: bad.to_string(),
            good: good.to_string(),
            regex: Regex::new(&regex::escape(bad))?,
        })
    }

    /// Builds the matcher described by a loaded configuration.
    pub fn from_config(config: &FlagConfig) -> Result<Self> {
        Self::new(&config.bad_flag, &config.good_flag)
    }

    pub fn bad(&self) -> &str {
        &self.bad
    }

    pub fn good(&self) -> &str {
        &self.good
    }

    /// Counts non-overlapping occurrences of the bad flag.
    pub fn count(&self, haystack: &[u8]) -> usize {
        self.regex.find_iter(haystack).count()
    }

    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.regex.is_match(haystack)
    }

    /// Replaces every occurrence of the bad flag with the good flag.
    ///
    /// Returns `Cow::Borrowed` when nothing matched.
    pub fn replace_all<'h>(&self, haystack: &'h [u8]) -> Cow<'h, [u8]> {
        self.regex
            .replace_all(haystack, NoExpand(self.good.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memcall() -> FlagPattern {
        FlagPattern::new("-Wno-nontrivial-memcall", "-Wno-nontrivial-memaccess").unwrap()
    }

    #[test]
    fn test_count_is_literal() {
        let pattern = FlagPattern::new("a.b", "x").unwrap();
        assert_eq!(pattern.count(b"a.b aXb a.b"), 2);
        assert!(!pattern.is_match(b"aXb"));
    }

    #[test]
    fn test_replace_preserves_surrounding_bytes() {
        let input = b"flags = [\"-Wno-nontrivial-memcall\"]\n\xff\xfe -Wno-nontrivial-memcall\n";
        let output = memcall().replace_all(input);
        assert_eq!(
            output.as_ref(),
            &b"flags = [\"-Wno-nontrivial-memaccess\"]\n\xff\xfe -Wno-nontrivial-memaccess\n"[..]
        );
    }

    #[test]
    fn test_replace_borrows_when_unchanged() {
        let input = b"-Wall -Wextra";
        assert!(matches!(memcall().replace_all(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_replacement_is_not_expanded() {
        let pattern = FlagPattern::new("-Wold", "$1-${x}").unwrap();
        assert_eq!(pattern.replace_all(b"-Wold").as_ref(), b"$1-${x}");
    }

    #[test]
    fn test_rejects_empty_flag() {
        assert!(FlagPattern::new("", "x").is_err());
    }
}
