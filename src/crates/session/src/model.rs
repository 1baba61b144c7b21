//! The `Session` record and its key (spec §3.3).

use chrono::{DateTime, Utc};
use events::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies a session uniquely; all three components are required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// All three components non-empty, per spec §6.2's key-validation rule
    /// (sessions reuse the same "all non-empty" contract as memory keys).
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.app_name.is_empty() || self.user_id.is_empty() || self.session_id.is_empty() {
            return Err(crate::error::SessionError::Validation(
                "app_name, user_id and session_id must all be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named, timestamped out-of-band log attached to a session (e.g. the
/// AG-UI bridge's wire-event stream).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEvent {
    pub track_name: String,
    pub payload: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// A summary recorded against one filter-key (or legacy branch) path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

/// Keyed by `(app_name, user_id, session_id)` (spec §3.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub events: Vec<Event>,
    /// Named state map, string key to raw bytes.
    pub state: HashMap<String, Vec<u8>>,
    /// filter-key (or, for legacy events, branch) to recorded summary.
    pub summaries: HashMap<String, SessionSummary>,
    /// Named out-of-band tracks, e.g. `"ag-ui"`.
    pub tracks: HashMap<String, Vec<TrackEvent>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            events: Vec::new(),
            state: HashMap::new(),
            summaries: HashMap::new(),
            tracks: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The grouping path for an event's summary lookup: filter-key for
    /// current-version events, branch for legacy ones (spec §4.7).
    pub fn summary_group(event: &Event) -> &str {
        if event.version == events::EVENT_VERSION_CURRENT {
            &event.filter_key
        } else {
            &event.branch
        }
    }
}
