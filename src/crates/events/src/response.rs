//! Wire shapes for the model interface consumed by the graph engine and
//! runner (spec §6.3). The contract itself — `generate_content` returning a
//! stream of these — is defined by `langgraph_core::llm::ChatModel`; the
//! shapes live here because an [`crate::Event`] carries an optional reference
//! to one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discriminates the kind of payload a [`ModelResponse`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// A partial streaming chunk.
    Chunk,
    /// The terminal response for this generation.
    Final,
    /// The model requested a tool call.
    ToolCall,
    /// A tool's result being relayed back as model-visible context.
    ToolResponse,
    /// The model backend reported an error in-band.
    Error,
}

/// One choice within a (possibly multi-choice) model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    /// Index of this choice among the response's choices.
    pub index: u32,
    /// Incremental delta content for this choice, present on streaming
    /// chunks.
    pub delta_message: Option<serde_json::Value>,
    /// The complete message for this choice, present on the final response.
    pub message: Option<serde_json::Value>,
}

/// Token accounting for a model call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// An in-band error surfaced by a model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelErrorPayload {
    pub kind: String,
    pub message: String,
}

/// A single item in a model's streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub kind: ResponseKind,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
    /// `true` for streaming chunks that are not the terminal item.
    pub partial: bool,
    /// `true` only for the terminal item of the stream.
    pub done: bool,
    pub error: Option<ModelErrorPayload>,
    /// Provider-specific metadata, passed through opaquely.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ModelResponse {
    /// Build a terminal, non-error response wrapping a single message.
    pub fn done_with_message(message: serde_json::Value, usage: Option<Usage>) -> Self {
        Self {
            kind: ResponseKind::Final,
            choices: vec![Choice {
                index: 0,
                delta_message: None,
                message: Some(message),
            }],
            usage,
            partial: false,
            done: true,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Build a partial streaming chunk.
    pub fn chunk(delta: serde_json::Value) -> Self {
        Self {
            kind: ResponseKind::Chunk,
            choices: vec![Choice {
                index: 0,
                delta_message: Some(delta),
                message: None,
            }],
            usage: None,
            partial: true,
            done: false,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Whether the delta of the first choice carries a tool-call id —
    /// used by the reasoning-tag decider.
    pub fn has_tool_call_delta(&self) -> bool {
        self.choices.iter().any(|c| {
            c.delta_message
                .as_ref()
                .and_then(|d| d.get("tool_call_id"))
                .is_some()
        })
    }
}
