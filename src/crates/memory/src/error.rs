//! Errors raised by [`crate::MemoryService`] and the auto-memory worker.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("memory not found: app={app} user={user} id={id}")]
    NotFound {
        app: String,
        user: String,
        id: String,
    },

    #[error("memory already exists: app={app} user={user} id={id}")]
    AlreadyExists {
        app: String,
        user: String,
        id: String,
    },

    #[error("memory limit exceeded: {limit} entries for app={app} user={user}")]
    LimitExceeded {
        app: String,
        user: String,
        limit: usize,
    },

    #[error("auto-memory queue is full (capacity {0})")]
    Backpressure(usize),

    #[error("auto-memory job timed out after {0:?}")]
    JobTimeout(std::time::Duration),
}
