//! Errors raised by [`crate::SessionService`] implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session not found: app={app} user={user} session={session}")]
    NotFound {
        app: String,
        user: String,
        session: String,
    },

    #[error("session already exists: app={app} user={user} session={session}")]
    AlreadyExists {
        app: String,
        user: String,
        session: String,
    },

    #[error("append-event hook chain aborted: {0}")]
    HookAborted(String),

    #[error("track \"{0}\" not found on session")]
    TrackNotFound(String),
}
