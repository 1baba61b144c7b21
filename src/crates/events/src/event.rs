//! The canonical [`Event`] record (spec §3.1).

use crate::actions::Actions;
use crate::response::ModelResponse;
use crate::tag::{TagString, PATH_DELIMITER};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// The event schema version an [`Event`] was minted against.
pub const EVENT_VERSION_INITIAL: u8 = 0;

/// The current event schema version. Every event this crate constructs is
/// stamped with this value; `clone` normalizes older events up to it.
pub const EVENT_VERSION_CURRENT: u8 = 1;

/// An immutable record flowing through an agent invocation.
///
/// `structured_output` is intentionally excluded from (de)serialization: it
/// is an in-memory-only payload (e.g. a parsed tool result) that never
/// crosses a persistence or wire boundary.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub invocation_id: String,
    pub author: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Legacy hierarchical routing path, kept populated on every event this
    /// crate emits regardless of `version` (open question #2 in
    /// `SPEC_FULL.md`: both fields are always written for compatibility with
    /// legacy readers).
    pub branch: String,
    pub tag: TagString,
    pub requires_completion: bool,
    pub long_running_tool_ids: HashSet<String>,
    pub state_delta: HashMap<String, Vec<u8>>,
    #[serde(skip)]
    pub structured_output: Option<serde_json::Value>,
    pub actions: Option<Actions>,
    pub filter_key: String,
    pub version: u8,
    pub response: Option<ModelResponse>,
}

impl Event {
    /// Construct a new, current-version event.
    pub fn new(invocation_id: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            invocation_id: invocation_id.into(),
            author: author.into(),
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            branch: String::new(),
            tag: TagString::new(),
            requires_completion: false,
            long_running_tool_ids: HashSet::new(),
            state_delta: HashMap::new(),
            structured_output: None,
            actions: None,
            filter_key: String::new(),
            version: EVENT_VERSION_CURRENT,
            response: None,
        }
    }

    /// Set both `branch` and `filter_key` to the same hierarchical path.
    pub fn with_filter_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.branch = key.clone();
        self.filter_key = key;
        self
    }

    pub fn with_response(mut self, response: ModelResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_structured_output(mut self, value: serde_json::Value) -> Self {
        self.structured_output = Some(value);
        self
    }

    pub fn with_state_delta(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.state_delta.insert(key.into(), value);
        self
    }

    pub fn with_requires_completion(mut self, requires_completion: bool) -> Self {
        self.requires_completion = requires_completion;
        self
    }

    /// The filter key that currently governs routing for this event:
    /// `branch` for legacy (pre-current-version) events, `filter_key`
    /// otherwise.
    pub fn effective_filter_key(&self) -> &str {
        if self.version != EVENT_VERSION_CURRENT {
            &self.branch
        } else {
            &self.filter_key
        }
    }

    /// Whether this event matches hierarchical filter `key` — `key` is true
    /// iff it is a `/`-delimited prefix of this event's effective filter key,
    /// or vice versa. The empty filter matches everything.
    pub fn filter(&self, key: &str) -> bool {
        if key.is_empty() {
            return true;
        }
        let own = self.effective_filter_key();
        if own.is_empty() {
            return false;
        }
        path_prefix_match(own, key)
    }
}

/// `filter` logic lifted to `Option<&Event>` so a caller holding a
/// possibly-absent event need not special-case it: a nil event matches any
/// filter (spec §8 invariant 1).
pub fn event_filter(event: Option<&Event>, key: &str) -> bool {
    match event {
        None => true,
        Some(e) => e.filter(key),
    }
}

fn path_prefix_match(a: &str, b: &str) -> bool {
    let a_segs: Vec<&str> = a.split(PATH_DELIMITER).collect();
    let b_segs: Vec<&str> = b.split(PATH_DELIMITER).collect();
    let n = a_segs.len().min(b_segs.len());
    a_segs[..n] == b_segs[..n]
}

impl Clone for Event {
    /// Deep-clones every field and mints a fresh id — cloning an event never
    /// produces an indistinguishable duplicate (spec §8 invariant 2). A
    /// legacy-version source is normalized to the current version by
    /// copying `branch` into `filter_key`.
    fn clone(&self) -> Self {
        let (branch, filter_key, version) = if self.version != EVENT_VERSION_CURRENT {
            (self.branch.clone(), self.branch.clone(), EVENT_VERSION_CURRENT)
        } else {
            (self.branch.clone(), self.filter_key.clone(), self.version)
        };
        Self {
            invocation_id: self.invocation_id.clone(),
            author: self.author.clone(),
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: self.timestamp,
            branch,
            tag: self.tag.clone(),
            requires_completion: self.requires_completion,
            long_running_tool_ids: self.long_running_tool_ids.clone(),
            state_delta: self.state_delta.clone(),
            structured_output: self.structured_output.clone(),
            actions: self.actions.clone(),
            filter_key,
            version,
            response: self.response.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_mints_a_new_id_and_preserves_timestamp() {
        let e = Event::new("inv-1", "agent-a").with_filter_key("root/child");
        let cloned = e.clone();
        assert_ne!(cloned.id, e.id);
        assert_eq!(cloned.timestamp, e.timestamp);
    }

    #[test]
    fn clone_deep_copies_mutable_collections() {
        let mut e = Event::new("inv-1", "agent-a");
        e.long_running_tool_ids.insert("tool-1".into());
        e.state_delta.insert("k".into(), vec![1, 2, 3]);

        let mut cloned = e.clone();
        cloned.long_running_tool_ids.insert("tool-2".into());
        cloned.state_delta.get_mut("k").unwrap().push(4);

        assert_eq!(e.long_running_tool_ids.len(), 1);
        assert_eq!(e.state_delta["k"], vec![1, 2, 3]);
    }

    #[test]
    fn clone_normalizes_legacy_version() {
        let mut e = Event::new("inv-1", "agent-a");
        e.version = EVENT_VERSION_INITIAL;
        e.branch = "legacy/path".into();
        e.filter_key = String::new();

        let cloned = e.clone();
        assert_eq!(cloned.version, EVENT_VERSION_CURRENT);
        assert_eq!(cloned.filter_key, "legacy/path");
    }

    // Spec §8 invariant 1.
    #[test]
    fn filter_prefix_semantics() {
        let e = Event::new("inv-1", "a").with_filter_key("root/child/leaf");
        assert!(e.filter(""));
        assert!(e.filter("root"));
        assert!(e.filter("root/child"));
        assert!(e.filter("root/child/leaf"));
        assert!(e.filter("root/child/leaf/deeper")); // e's key is a prefix of the query
        assert!(!e.filter("other"));

        assert!(event_filter(None, "anything"));
    }

    #[test]
    fn legacy_event_filters_on_branch() {
        let mut e = Event::new("inv-1", "a");
        e.version = EVENT_VERSION_INITIAL;
        e.branch = "legacy/branch".into();
        e.filter_key = "ignored".into();
        assert!(e.filter("legacy/branch"));
        assert!(!e.filter("ignored"));
    }
}
