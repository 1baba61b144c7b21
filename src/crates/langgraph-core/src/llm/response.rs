//! Response types returned by [`crate::llm::ChatModel::chat`] and
//! [`crate::llm::ChatModel::stream`].

use crate::llm_stream::MessageChunkStream;
use crate::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token accounting for a single chat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Extra tokens spent on a thinking-model's hidden reasoning pass, when
    /// the provider reports it separately from `output_tokens`.
    pub reasoning_tokens: Option<u64>,
    pub total_tokens: u64,
}

/// A thinking model's reasoning content, captured when
/// [`crate::llm::ReasoningMode::should_capture`] is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningContent {
    pub content: String,
}

/// The complete, non-streaming result of a [`crate::llm::ChatModel::chat`] call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<UsageMetadata>,
    pub reasoning: Option<ReasoningContent>,
    /// Provider-specific metadata (model name, finish_reason, request id, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// The streaming counterpart of [`ChatResponse`]: a live stream of
/// [`crate::llm_stream::MessageChunk`]s plus an optional reasoning token
/// stream, and usage that is only known once the stream is exhausted.
pub struct ChatStreamResponse {
    pub stream: MessageChunkStream,
    pub reasoning_stream: Option<MessageChunkStream>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_metadata_is_plain_data() {
        let usage = UsageMetadata {
            input_tokens: 10,
            output_tokens: 5,
            reasoning_tokens: None,
            total_tokens: 15,
        };
        assert_eq!(usage.total_tokens, usage.input_tokens + usage.output_tokens);
    }
}
