//! Topic pattern matching.
//!
//! A topic is a non-empty string naming a resource (here, a path relative to
//! the watched root). A subscription pattern is one of:
//!
//! - `"~"`: matches every topic
//! - `"<prefix>~"`: matches every topic starting with `<prefix>`
//! - anything else: matches the identical topic only
//!
//! Matching is byte-wise and case-sensitive. There is no escaping, so a topic
//! that itself ends in `~` can only be reached by a prefix or global pattern.

use serde::{Deserialize, Serialize};

/// The single wildcard character recognised in patterns.
pub const WILDCARD: char = '~';

/// Returns true if `topic` satisfies `pattern`.
///
/// Total and pure: malformed patterns (including the empty string) are
/// treated as exact-match literals.
///
/// # Examples
///
/// ```
/// use treewatch::topic::matches;
///
/// assert!(matches("important/x.txt", "~"));
/// assert!(matches("important/x.txt", "important/~"));
/// assert!(!matches("misc/x.txt", "important/~"));
/// assert!(matches("a.txt", "a.txt"));
/// ```
#[must_use]
pub fn matches(topic: &str, pattern: &str) -> bool {
    if pattern.len() == WILDCARD.len_utf8() && pattern.ends_with(WILDCARD) {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(WILDCARD) {
        return topic.as_bytes().starts_with(prefix.as_bytes());
    }
    topic == pattern
}

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TopicPattern {
    /// Matches every topic.
    All,
    /// Matches topics starting with the stored prefix.
    Prefix(String),
    /// Matches the stored topic exactly.
    Exact(String),
}

impl TopicPattern {
    /// Parses the textual pattern form.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(WILDCARD) {
            Some("") => Self::All,
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// Returns true if `topic` satisfies this pattern.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => topic.as_bytes().starts_with(prefix.as_bytes()),
            Self::Exact(exact) => topic == exact,
        }
    }

    /// Renders the pattern back to its textual form.
    #[must_use]
    pub fn as_pattern_string(&self) -> String {
        match self {
            Self::All => WILDCARD.to_string(),
            Self::Prefix(prefix) => format!("{prefix}{WILDCARD}"),
            Self::Exact(exact) => exact.clone(),
        }
    }
}

impl From<&str> for TopicPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl std::fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_pattern_string())
    }
}
