//! The optional hint block an author can attach to an [`crate::Event`] to
//! influence downstream processing (the runner, the graph engine, session
//! summarization) without encoding control flow into `state_delta`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deep-copyable processing hints attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actions {
    /// Ask the runner to skip session summarization for this event's
    /// filter-key branch.
    #[serde(default)]
    pub skip_summarization: bool,

    /// Ask the runner to transfer control to a named agent.
    #[serde(default)]
    pub transfer_to_agent: Option<String>,

    /// Ask the runner to escalate (stop looping and return control to the
    /// caller), analogous to a graph node routing to `__end__`.
    #[serde(default)]
    pub escalate: bool,

    /// Out-of-band auth configuration requests keyed by provider id, opaque
    /// to the core runtime.
    #[serde(default)]
    pub requested_auth_configs: HashMap<String, serde_json::Value>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }
}
