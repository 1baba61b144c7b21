//! Error types for event construction, classification and emission.

use thiserror::Error;

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors that can occur while building, classifying or emitting events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The emit channel rejected the event because no capacity became
    /// available before the configured timeout elapsed.
    #[error("emit timed out after {0:?}")]
    EmitTimeout(std::time::Duration),

    /// The ambient context was cancelled while an emit was blocked.
    #[error("emit cancelled: {0}")]
    Cancelled(String),

    /// The outer event channel has no remaining receiver.
    #[error("event channel closed")]
    ChannelClosed,

    /// A tag string contained the reserved delimiter byte as a literal
    /// character, which would corrupt tag segmentation.
    #[error("tag segment '{0}' contains the reserved delimiter")]
    InvalidTagSegment(String),

    /// An agent's own error surfaced mid-invocation (spec §7: model-error,
    /// tool-error and graph-routing-error all flow through the stream this
    /// way rather than as a fixed variant per collaborator).
    #[error("agent error: {0}")]
    Agent(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EventError {
    /// Wraps an arbitrary collaborator error as an [`EventError::Agent`].
    pub fn agent(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Agent(Box::new(source))
    }
}
