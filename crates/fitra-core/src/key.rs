//! Draft keys.
//!
//! A draft is addressed by `(subject, day, namespace)`. The tuple stays
//! structured everywhere in the workspace and is rendered to a flat string
//! only when it reaches a key-value backend.
//!
//! # Storage key layout
//!
//! `fitra:{namespace}:draft:{subject}:{YYYY-MM-DD}`
//!
//! `%` and `:` inside the namespace or subject are percent-escaped, so two
//! distinct keys can never render to the same string.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Namespace used by the training step-2 input form.
pub const TRAINING_NAMESPACE: &str = "training";

const STORAGE_PREFIX: &str = "fitra";

/// Identifies exactly one draft instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DraftKey {
    pub subject: String,
    pub day: NaiveDate,
    pub namespace: String,
}

impl DraftKey {
    pub fn new(subject: impl Into<String>, day: NaiveDate, namespace: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            day,
            namespace: namespace.into(),
        }
    }

    /// Key for the training namespace.
    pub fn training(subject: impl Into<String>, day: NaiveDate) -> Self {
        Self::new(subject, day, TRAINING_NAMESPACE)
    }

    /// Render the key for a string-keyed backend.
    pub fn storage_key(&self) -> String {
        format!(
            "{STORAGE_PREFIX}:{}:draft:{}:{}",
            escape_component(&self.namespace),
            escape_component(&self.subject),
            self.day.format("%Y-%m-%d"),
        )
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.subject, self.day)
    }
}

/// Escape the separator and the escape character itself.
fn escape_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn training_storage_key_layout() {
        let key = DraftKey::training("demo", day("2026-01-01"));
        assert_eq!(key.storage_key(), "fitra:training:draft:demo:2026-01-01");
    }

    #[test]
    fn day_is_zero_padded() {
        let key = DraftKey::training("demo", day("2026-03-07"));
        assert!(key.storage_key().ends_with(":2026-03-07"));
    }

    #[test]
    fn separator_in_subject_does_not_collide() {
        // Naive concatenation would render both as "a:b:c".
        let d = day("2026-01-01");
        let one = DraftKey::new("b:c", d, "a");
        let two = DraftKey::new("c", d, "a:b");
        assert_ne!(one.storage_key(), two.storage_key());
    }

    #[test]
    fn escape_is_unambiguous() {
        let d = day("2026-01-01");
        let literal = DraftKey::training("x%3Ay", d);
        let escaped = DraftKey::training("x:y", d);
        assert_ne!(literal.storage_key(), escaped.storage_key());
        assert_eq!(escaped.storage_key(), "fitra:training:draft:x%3Ay:2026-01-01");
    }

    #[test]
    fn distinct_days_distinct_keys() {
        let a = DraftKey::training("demo", day("2026-01-01"));
        let b = DraftKey::training("demo", day("2026-01-02"));
        assert_ne!(a, b);
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn display_is_readable() {
        let key = DraftKey::training("demo", day("2026-01-01"));
        assert_eq!(key.to_string(), "training/demo/2026-01-01");
    }
}
