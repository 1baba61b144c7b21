//! The AG-UI wire event shapes (spec §6.5). These are the external
//! counterpart of [`events::Event`] — one internal event typically expands
//! into zero or more wire events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireEvent {
    RunStarted {
        thread_id: String,
        run_id: String,
    },
    TextMessageStart {
        id: String,
        role: String,
    },
    TextMessageContent {
        id: String,
        delta: String,
    },
    TextMessageEnd {
        id: String,
    },
    ToolCallStart {
        id: String,
        name: String,
        parent_message_id: Option<String>,
    },
    ToolCallArgs {
        id: String,
        delta: String,
    },
    ToolCallEnd {
        id: String,
    },
    ToolCallResult {
        message_id: String,
        tool_call_id: String,
        content: String,
    },
    StateSnapshot {
        state: HashMap<String, serde_json::Value>,
    },
    RunError {
        message: String,
    },
    RunFinished {
        thread_id: String,
        run_id: String,
    },
}
