//! `MemoryEntry` and its deterministic id (spec §3.4, §8 invariant 5, S5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The delimiter separating digest fields. Reuses the events crate's
/// reserved separator byte so both crates draw the same "cannot appear in
/// ordinary text" line, though the two uses are otherwise independent.
const DIGEST_DELIMITER: char = '\u{1}';

/// Identifies a memory uniquely; all three components are required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryKey {
    pub app_name: String,
    pub user_id: String,
    pub memory_id: String,
}

/// A user-scoped (app, user) pair, used for list/search/clear operations
/// that don't target one specific memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    pub app_name: String,
    pub user_id: String,
}

impl UserKey {
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.app_name.is_empty() || self.user_id.is_empty() {
            return Err(crate::error::MemoryError::Validation(
                "app_name and user_id must both be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyed by `(app_name, user_id, memory_id)` (spec §3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: MemoryKey,
    pub memory_text: String,
    pub topics: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        memory_text: impl Into<String>,
        topics: Vec<String>,
    ) -> Self {
        let app_name = app_name.into();
        let user_id = user_id.into();
        let memory_text = memory_text.into();
        let id = memory_id(&memory_text, &topics, &app_name, &user_id);
        let now = Utc::now();
        Self {
            key: MemoryKey {
                app_name,
                user_id,
                memory_id: id,
            },
            memory_text,
            topics,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Deterministic digest over `memory_text ⊕ sorted(topics) ⊕ app ⊕ user`
/// (spec §3.4): `sha256(memory_text || SOH || sorted(topics).join(SOH) ||
/// SOH || app || SOH || user)`, hex-encoded. Sorting the topics before
/// hashing is what makes the id order-independent (spec §8 invariant 5 /
/// calibration S5).
pub fn memory_id(memory_text: &str, topics: &[String], app_name: &str, user_id: &str) -> String {
    let mut sorted_topics = topics.to_vec();
    sorted_topics.sort();
    let joined_topics = sorted_topics.join(&DIGEST_DELIMITER.to_string());

    let mut hasher = Sha256::new();
    hasher.update(memory_text.as_bytes());
    hasher.update(DIGEST_DELIMITER.to_string().as_bytes());
    hasher.update(joined_topics.as_bytes());
    hasher.update(DIGEST_DELIMITER.to_string().as_bytes());
    hasher.update(app_name.as_bytes());
    hasher.update(DIGEST_DELIMITER.to_string().as_bytes());
    hasher.update(user_id.as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec §8 invariant 5 / calibration S5.
    #[test]
    fn memory_id_is_independent_of_topic_order() {
        let a = memory_id(
            "alice likes tea",
            &["beverage".to_string(), "morning".to_string()],
            "app",
            "u1",
        );
        let b = memory_id(
            "alice likes tea",
            &["morning".to_string(), "beverage".to_string()],
            "app",
            "u1",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn memory_id_changes_with_any_field() {
        let base = memory_id("text", &["t".to_string()], "app", "u1");
        assert_ne!(base, memory_id("other", &["t".to_string()], "app", "u1"));
        assert_ne!(base, memory_id("text", &["u".to_string()], "app", "u1"));
        assert_ne!(base, memory_id("text", &["t".to_string()], "app2", "u1"));
        assert_ne!(base, memory_id("text", &["t".to_string()], "app", "u2"));
    }

    proptest::proptest! {
        #[test]
        fn memory_id_is_a_pure_function_of_sorted_inputs(
            text in ".*",
            mut topics in proptest::collection::vec(".*", 0..5),
            app in ".*",
            user in ".*",
        ) {
            let first = memory_id(&text, &topics, &app, &user);
            topics.reverse();
            let second = memory_id(&text, &topics, &app, &user);
            proptest::prop_assert_eq!(first, second);
        }
    }
}
