//! `Artifact` and its key (spec §3.5, §6.6): versioned binary blobs keyed
//! by `(session, filename)`.

use serde::{Deserialize, Serialize};

/// Identifies the artifact namespace a filename lives in. Reuses
/// [`session::SessionKey`]'s three components since artifacts are always
/// scoped to one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub filename: String,
}

impl ArtifactKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            filename: filename.into(),
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.app_name.is_empty()
            || self.user_id.is_empty()
            || self.session_id.is_empty()
            || self.filename.is_empty()
        {
            return Err(crate::error::ArtifactError::Validation(
                "app_name, user_id, session_id and filename must all be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The namespace this key's filename versions are tracked under,
    /// i.e. the key with its filename stripped.
    pub fn session_only(&self) -> (String, String, String) {
        (
            self.app_name.clone(),
            self.user_id.clone(),
            self.session_id.clone(),
        )
    }
}

/// One immutable revision of a named binary blob (spec §3.5). Revisions
/// are numbered from 0 and monotonically increasing per `(session,
/// filename)`; a revision once written is never mutated or removed except
/// by `delete`, which drops every revision of that filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub revision: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(revision: u64, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            revision,
            mime_type: mime_type.into(),
            bytes,
        }
    }
}
