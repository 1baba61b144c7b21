//! Versioned binary artifact store contract, keyed by `(session, filename)`
//! (spec §3.5, §6.6).

pub mod error;
pub mod model;
pub mod service;

pub use error::{ArtifactError, Result};
pub use model::{Artifact, ArtifactKey};
pub use service::{ArtifactService, InMemoryArtifactStore};
