//! Regex filter over item keys.

use regex::{Regex, RegexBuilder};

use super::error::FilterError;

/// Compiled size limit for user-supplied patterns.
const PATTERN_SIZE_LIMIT: usize = 1024 * 1024;

/// Keeps only items whose key contains a match for the pattern (search, not full match).
#[derive(Debug, Clone)]
pub struct KeyFilter {
    regex: Regex,
}

impl KeyFilter {
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|source| FilterError {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
