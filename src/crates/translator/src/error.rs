//! Errors raised by [`crate::Translator`] when a caller violates the wire
//! protocol's invariants (spec §6.5).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslatorError>;

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("run-started was already emitted for this translator")]
    AlreadyStarted,

    #[error("run-started must be emitted before any other wire event")]
    NotStarted,

    #[error("the run is already terminal (run-finished or run-error already emitted)")]
    AlreadyFinished,

    #[error("tool-call-result references tool-call-id {0:?} which was never started")]
    UnknownToolCallId(String),

    #[error("malformed model response payload: {0}")]
    Malformed(String),
}
