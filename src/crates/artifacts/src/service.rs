//! The `ArtifactService` contract (spec §6.6) and its in-process reference
//! implementation.

use crate::error::{ArtifactError, Result};
use crate::model::{Artifact, ArtifactKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[async_trait]
pub trait ArtifactService: Send + Sync {
    /// Appends a new revision, returning its revision number (starts at 0,
    /// increments by one per call for the same key).
    async fn save(&self, key: &ArtifactKey, mime_type: String, bytes: Vec<u8>) -> Result<u64>;

    /// Loads the latest revision, or the given `version` if present.
    async fn load(&self, key: &ArtifactKey, version: Option<u64>) -> Result<Artifact>;

    /// The distinct filenames saved under one session.
    async fn list_keys(&self, app_name: &str, user_id: &str, session_id: &str)
        -> Result<Vec<String>>;

    /// Every revision number saved for one filename, ascending.
    async fn list_versions(&self, key: &ArtifactKey) -> Result<Vec<u64>>;

    /// Drops every revision of the named filename.
    async fn delete(&self, key: &ArtifactKey) -> Result<()>;
}

type SessionScope = (String, String, String);

/// Per-session lock striping, the same pattern `InMemoryMemoryService` uses
/// for `add`: held across the read-current-max-then-append sequence of
/// `save` so concurrent saves to the same filename don't race on the next
/// revision number (spec §5).
pub struct InMemoryArtifactStore {
    revisions: RwLock<HashMap<ArtifactKey, Vec<Artifact>>>,
    locks: RwLock<HashMap<SessionScope, Arc<Mutex<()>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            revisions: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, scope: &SessionScope) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(scope) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactService for InMemoryArtifactStore {
    async fn save(&self, key: &ArtifactKey, mime_type: String, bytes: Vec<u8>) -> Result<u64> {
        key.validate()?;
        let lock = self.lock_for(&key.session_only()).await;
        let _guard = lock.lock().await;

        let mut revisions = self.revisions.write().await;
        let history = revisions.entry(key.clone()).or_insert_with(Vec::new);
        let revision = history.len() as u64;
        history.push(Artifact::new(revision, mime_type, bytes));
        Ok(revision)
    }

    async fn load(&self, key: &ArtifactKey, version: Option<u64>) -> Result<Artifact> {
        let revisions = self.revisions.read().await;
        let history = revisions.get(key).ok_or_else(|| ArtifactError::NotFound {
            session: key.session_id.clone(),
            filename: key.filename.clone(),
        })?;

        match version {
            Some(v) => history.iter().find(|a| a.revision == v).cloned().ok_or_else(|| {
                ArtifactError::VersionNotFound {
                    session: key.session_id.clone(),
                    filename: key.filename.clone(),
                    version: v,
                }
            }),
            None => history.last().cloned().ok_or_else(|| ArtifactError::NotFound {
                session: key.session_id.clone(),
                filename: key.filename.clone(),
            }),
        }
    }

    async fn list_keys(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<String>> {
        let revisions = self.revisions.read().await;
        let mut filenames: Vec<String> = revisions
            .keys()
            .filter(|k| k.app_name == app_name && k.user_id == user_id && k.session_id == session_id)
            .map(|k| k.filename.clone())
            .collect();
        filenames.sort();
        filenames.dedup();
        Ok(filenames)
    }

    async fn list_versions(&self, key: &ArtifactKey) -> Result<Vec<u64>> {
        let revisions = self.revisions.read().await;
        Ok(revisions
            .get(key)
            .map(|history| history.iter().map(|a| a.revision).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<()> {
        self.revisions.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(filename: &str) -> ArtifactKey {
        ArtifactKey::new("app", "u1", "s1", filename)
    }

    #[tokio::test]
    async fn save_assigns_monotonically_increasing_revisions() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        let r0 = store.save(&k, "application/pdf".into(), vec![1]).await.unwrap();
        let r1 = store.save(&k, "application/pdf".into(), vec![2]).await.unwrap();
        assert_eq!(r0, 0);
        assert_eq!(r1, 1);
    }

    #[tokio::test]
    async fn load_without_version_returns_latest() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        store.save(&k, "text/plain".into(), vec![1]).await.unwrap();
        store.save(&k, "text/plain".into(), vec![2]).await.unwrap();

        let latest = store.load(&k, None).await.unwrap();
        assert_eq!(latest.bytes, vec![2]);
        assert_eq!(latest.revision, 1);
    }

    #[tokio::test]
    async fn load_with_version_returns_that_revision() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        store.save(&k, "text/plain".into(), vec![1]).await.unwrap();
        store.save(&k, "text/plain".into(), vec![2]).await.unwrap();

        let first = store.load(&k, Some(0)).await.unwrap();
        assert_eq!(first.bytes, vec![1]);
    }

    #[tokio::test]
    async fn load_missing_filename_is_not_found() {
        let store = InMemoryArtifactStore::new();
        let err = store.load(&key("missing.txt"), None).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_missing_version_is_version_not_found() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        store.save(&k, "text/plain".into(), vec![1]).await.unwrap();
        let err = store.load(&k, Some(7)).await.unwrap_err();
        assert!(matches!(err, ArtifactError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn list_keys_returns_distinct_sorted_filenames_for_session() {
        let store = InMemoryArtifactStore::new();
        store.save(&key("b.txt"), "text/plain".into(), vec![1]).await.unwrap();
        store.save(&key("a.txt"), "text/plain".into(), vec![1]).await.unwrap();
        store.save(&key("a.txt"), "text/plain".into(), vec![2]).await.unwrap();

        let keys = store.list_keys("app", "u1", "s1").await.unwrap();
        assert_eq!(keys, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn list_versions_is_ascending() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        store.save(&k, "text/plain".into(), vec![1]).await.unwrap();
        store.save(&k, "text/plain".into(), vec![2]).await.unwrap();
        store.save(&k, "text/plain".into(), vec![3]).await.unwrap();

        assert_eq!(store.list_versions(&k).await.unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn delete_removes_every_revision() {
        let store = InMemoryArtifactStore::new();
        let k = key("report.pdf");
        store.save(&k, "text/plain".into(), vec![1]).await.unwrap();
        store.save(&k, "text/plain".into(), vec![2]).await.unwrap();

        store.delete(&k).await.unwrap();
        assert!(store.list_versions(&k).await.unwrap().is_empty());
        let err = store.load(&k, None).await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }
}
