//! Project identifier matchers.

use std::fmt;

use regex::Regex;

/// Prefix marking a manifest `match` entry as a regular expression.
pub const REGEX_PREFIX: &str = "regexp:";

/// A predicate over module paths.
#[derive(Clone)]
pub enum Matcher {
    /// Exact string equality
    Exact(String),
    /// Unanchored regular expression search
    Regex(Regex),
}

impl Matcher {
    pub fn exact(path: impl Into<String>) -> Self {
        Matcher::Exact(path.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Exact(expected) => expected == path,
            Matcher::Regex(re) => re.is_match(path),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Matcher::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(s) => write!(f, "{}", s),
            Matcher::Regex(re) => write!(f, "{}{}", REGEX_PREFIX, re.as_str()),
        }
    }
}

// Regex has no PartialEq; two regex matchers are equal when their sources are.
impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Exact(a), Matcher::Exact(b)) => a == b,
            (Matcher::Regex(a), Matcher::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Matcher {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let m = Matcher::exact("go.uber.org/zap");
        assert!(m.matches("go.uber.org/zap"));
        assert!(!m.matches("go.uber.org/zap/zaptest"));
    }

    #[test]
    fn test_regex_match_is_unanchored() {
        let m = Matcher::Regex(Regex::new("opentelemetry-collector/").unwrap());
        assert!(m.matches("github.com/open-telemetry/opentelemetry-collector/pdata"));
        assert!(!m.matches("github.com/open-telemetry/opentelemetry-collector"));
    }

    #[test]
    fn test_display_round_trips_manifest_syntax() {
        let m = Matcher::Regex(Regex::new("^a/.*$").unwrap());
        assert_eq!(m.to_string(), "regexp:^a/.*$");
        assert_eq!(m, Matcher::Regex(Regex::new("^a/.*$").unwrap()));
        assert_ne!(m, Matcher::exact("^a/.*$"));
    }
}
