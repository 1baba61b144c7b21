//! Errors raised by [`crate::ArtifactStore`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtifactError>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("artifact not found: session={session} filename={filename}")]
    NotFound { session: String, filename: String },

    #[error(
        "artifact version not found: session={session} filename={filename} version={version}"
    )]
    VersionNotFound {
        session: String,
        filename: String,
        version: u64,
    },
}
