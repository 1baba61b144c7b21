//! Top-level error aggregator for a turn (spec §7): a thin enum with
//! `#[from]` variants per collaborator, mirroring the teacher's top-level
//! CLI error shape.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("event error: {0}")]
    Event(#[from] events::EventError),

    #[error("plugin error: {0}")]
    Plugin(#[from] plugins::PluginError),

    #[error("session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("memory error: {0}")]
    Memory(#[from] memory::MemoryError),

    #[error("graph error: {0}")]
    Graph(#[from] langgraph_core::error::GraphError),

    #[error("artifact error: {0}")]
    Artifact(#[from] artifacts::ArtifactError),

    #[error("translator error: {0}")]
    Translator(#[from] translator::TranslatorError),

    #[error("agent produced no terminal event for this turn")]
    NoTerminalEvent,
}
