// Response matching for seedprobe
// Content-agnostic: callers decide which scope the content came from

use crate::error::{AuditError, Result};
use regex::Regex;
use std::fmt;

/// A detection pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    /// Exact, case-sensitive substring
    Substring(String),
}

impl Pattern {
    /// Compile a regular expression pattern.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Pattern::Regex)
            .map_err(|source| AuditError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn substring(needle: impl Into<String>) -> Self {
        Pattern::Substring(needle.into())
    }

    /// Textual representation recorded on issues
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Regex(re) => re.as_str(),
            Pattern::Substring(s) => s,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful match: the minimal fragment and the pattern that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: String,
    pub pattern: String,
}

/// Match `content` against `pattern`.
///
/// Regexes yield the first capture group of the first match, or the whole
/// match when the pattern has no group (or the group did not participate).
/// Substrings yield themselves when contained verbatim.
pub fn match_content(content: &str, pattern: &Pattern) -> Option<MatchResult> {
    let matched = match pattern {
        Pattern::Regex(re) => {
            let caps = re.captures(content)?;
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())?
        }
        Pattern::Substring(needle) => {
            if !content.contains(needle.as_str()) {
                return None;
            }
            needle.clone()
        }
    };

    Some(MatchResult {
        matched,
        pattern: pattern.as_str().to_string(),
    })
}
