//! Memoized full-match regex compilation.

use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Pattern string → compiled full-match regex.
///
/// Invalid patterns are remembered as `None` so they are reported once and
/// then simply never match.
#[derive(Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Option<Arc<Regex>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `text` matches `pattern` in full. An empty pattern matches anything.
    pub fn full_match(&self, pattern: &str, text: &str) -> bool {
        self.get(pattern).is_some_and(|regex| regex.is_match(text))
    }

    fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        if let Some(compiled) = self.compiled.read().get(pattern) {
            return compiled.clone();
        }

        let compiled = match compile_full_match(pattern) {
            Ok(regex) => Some(Arc::new(regex)),
            Err(e) => {
                warn!("Ignoring invalid pattern '{}': {}", pattern, e);
                None
            }
        };
        self.compiled
            .write()
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }

    pub fn clear(&self) {
        self.compiled.write().clear();
    }
}

/// Compile `pattern` anchored at both ends of the input
pub fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    if pattern.is_empty() {
        return Regex::new(r"(?s)\A.*\z");
    }
    Regex::new(&format!(r"\A(?:{pattern})\z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_match_not_contains() {
        let cache = PatternCache::new();
        assert!(cache.full_match("abc", "abc"));
        assert!(!cache.full_match("abc", "xabcx"));
        assert!(!cache.full_match("b", "abc"));
        assert!(cache.full_match("a.*", "abc"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let cache = PatternCache::new();
        assert!(cache.full_match("PING|PONG", "PONG"));
        assert!(!cache.full_match("PING|PONG", "PINGPONG"));
    }

    #[test]
    fn test_empty_pattern_matches_anything() {
        let cache = PatternCache::new();
        assert!(cache.full_match("", ""));
        assert!(cache.full_match("", "anything at all"));
        assert!(cache.full_match("", "multi\nline"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let cache = PatternCache::new();
        assert!(!cache.full_match("(unclosed", "(unclosed"));
        assert!(!cache.full_match("(unclosed", "anything"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compiled_once_per_pattern() {
        let cache = PatternCache::new();
        cache.full_match("PING", "PING");
        cache.full_match("PING", "PONG");
        cache.full_match("STATUS", "STATUS");
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_inline_flags_stay_scoped() {
        let cache = PatternCache::new();
        assert!(cache.full_match("(?i)ping", "PING"));
    }
}
