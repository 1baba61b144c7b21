//! The `MemoryService` contract (spec §6.2) and its in-process reference
//! implementation.

use crate::error::{MemoryError, Result};
use crate::model::{memory_id, MemoryEntry, MemoryKey, UserKey};
use crate::tools::default_tools;
use async_trait::async_trait;
use langgraph_core::CallableTool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A substring/topic match against the query.
#[derive(Debug, Clone)]
pub struct MemoryMatch {
    pub entry: MemoryEntry,
    pub matched_topic: bool,
}

#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn add(&self, user: &UserKey, memory: String, topics: Vec<String>) -> Result<MemoryEntry>;
    async fn update(&self, key: &MemoryKey, memory: String, topics: Vec<String>) -> Result<MemoryEntry>;
    async fn delete(&self, key: &MemoryKey) -> Result<()>;
    async fn clear(&self, user: &UserKey) -> Result<()>;

    /// Newest-first, capped at `limit`.
    async fn read(&self, user: &UserKey, limit: usize) -> Result<Vec<MemoryEntry>>;

    /// Substring match against `memory_text` or exact match against a topic.
    async fn search(&self, user: &UserKey, query: &str) -> Result<Vec<MemoryMatch>>;

    /// The currently enabled tool handles (spec §6.2). Empty until
    /// `install_tools` (or an implementor's equivalent) has wired them up.
    async fn tools(&self) -> Result<Vec<Arc<dyn CallableTool>>>;

    async fn close(&self) -> Result<()>;
}

/// Per-`(app, user)` lock striping: `Arc<Mutex<()>>` held across the
/// limit-check-then-insert sequence of `add`, the same pattern
/// `langgraph-checkpoint`'s in-memory backend uses to guard concurrent
/// writes per thread id (spec §5).
pub struct InMemoryMemoryService {
    entries: RwLock<HashMap<MemoryKey, MemoryEntry>>,
    locks: RwLock<HashMap<UserKey, Arc<Mutex<()>>>>,
    max_per_user: usize,
    tools: RwLock<Vec<Arc<dyn CallableTool>>>,
}

impl InMemoryMemoryService {
    pub fn new(max_per_user: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
            max_per_user,
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Builds the standard six tool handles (`tools::default_tools`) against
    /// `service` and installs them as this instance's enabled set, filtered
    /// down to `enabled` by `ToolDeclaration::name`. An empty `enabled` set
    /// enables all six, mirroring `WorkerConfig::enabled_tools`'s own
    /// unset-means-unrestricted default. Call once, after wrapping the
    /// service in the `Arc` passed back in as `service`:
    ///
    /// ```ignore
    /// let service = Arc::new(InMemoryMemoryService::default());
    /// let handle: Arc<dyn MemoryService> = service.clone();
    /// service.install_tools(handle, &HashSet::new()).await;
    /// ```
    pub async fn install_tools(&self, service: Arc<dyn MemoryService>, enabled: &HashSet<String>) {
        let mut built = default_tools(service);
        if !enabled.is_empty() {
            built.retain(|tool| enabled.contains(&tool.declaration().name));
        }
        *self.tools.write().await = built;
    }

    async fn lock_for(&self, user: &UserKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(user) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn count_for_user(entries: &HashMap<MemoryKey, MemoryEntry>, user: &UserKey) -> usize {
        entries
            .keys()
            .filter(|k| k.app_name == user.app_name && k.user_id == user.user_id)
            .count()
    }
}

impl Default for InMemoryMemoryService {
    /// Default cap of 50 entries per user, per spec §4.4's
    /// `max-existing-memories` default.
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl MemoryService for InMemoryMemoryService {
    async fn add(&self, user: &UserKey, memory: String, topics: Vec<String>) -> Result<MemoryEntry> {
        user.validate()?;
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let mut entries = self.entries.write().await;
        if Self::count_for_user(&entries, user) >= self.max_per_user {
            return Err(MemoryError::LimitExceeded {
                app: user.app_name.clone(),
                user: user.user_id.clone(),
                limit: self.max_per_user,
            });
        }

        let id = memory_id(&memory, &topics, &user.app_name, &user.user_id);
        let key = MemoryKey {
            app_name: user.app_name.clone(),
            user_id: user.user_id.clone(),
            memory_id: id,
        };
        if entries.contains_key(&key) {
            return Err(MemoryError::AlreadyExists {
                app: key.app_name,
                user: key.user_id,
                id: key.memory_id,
            });
        }

        let entry = MemoryEntry::new(user.app_name.clone(), user.user_id.clone(), memory, topics);
        entries.insert(key, entry.clone());
        Ok(entry)
    }

    async fn update(&self, key: &MemoryKey, memory: String, topics: Vec<String>) -> Result<MemoryEntry> {
        let mut entries = self.entries.write().await;
        let existing = entries.get_mut(key).ok_or_else(|| MemoryError::NotFound {
            app: key.app_name.clone(),
            user: key.user_id.clone(),
            id: key.memory_id.clone(),
        })?;
        existing.memory_text = memory;
        existing.topics = topics;
        existing.updated_at = chrono::Utc::now();
        existing.last_updated = existing.updated_at;
        Ok(existing.clone())
    }

    async fn delete(&self, key: &MemoryKey) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self, user: &UserKey) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|k, _| !(k.app_name == user.app_name && k.user_id == user.user_id));
        Ok(())
    }

    async fn read(&self, user: &UserKey, limit: usize) -> Result<Vec<MemoryEntry>> {
        let entries = self.entries.read().await;
        let mut matching: Vec<MemoryEntry> = entries
            .values()
            .filter(|e| e.key.app_name == user.app_name && e.key.user_id == user.user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn search(&self, user: &UserKey, query: &str) -> Result<Vec<MemoryMatch>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.key.app_name == user.app_name && e.key.user_id == user.user_id)
            .filter_map(|e| {
                let topic_hit = e.topics.iter().any(|t| t == query);
                let text_hit = e.memory_text.contains(query);
                if topic_hit || text_hit {
                    Some(MemoryMatch {
                        entry: e.clone(),
                        matched_topic: topic_hit,
                    })
                } else {
                    None
                }
            })
            .collect())
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn CallableTool>>> {
        Ok(self.tools.read().await.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_read_newest_first() {
        let svc = InMemoryMemoryService::new(50);
        let user = UserKey::new("app", "u1");
        svc.add(&user, "first".into(), vec![]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        svc.add(&user, "second".into(), vec![]).await.unwrap();

        let entries = svc.read(&user, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].memory_text, "second");
    }

    #[tokio::test]
    async fn add_rejects_duplicate_memory_id() {
        let svc = InMemoryMemoryService::new(50);
        let user = UserKey::new("app", "u1");
        svc.add(&user, "same text".into(), vec!["a".into()])
            .await
            .unwrap();
        let err = svc
            .add(&user, "same text".into(), vec!["a".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn add_enforces_per_user_limit() {
        let svc = InMemoryMemoryService::new(2);
        let user = UserKey::new("app", "u1");
        svc.add(&user, "one".into(), vec![]).await.unwrap();
        svc.add(&user, "two".into(), vec![]).await.unwrap();
        let err = svc.add(&user, "three".into(), vec![]).await.unwrap_err();
        assert!(matches!(err, MemoryError::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn search_matches_text_and_topic() {
        let svc = InMemoryMemoryService::new(50);
        let user = UserKey::new("app", "u1");
        svc.add(&user, "alice likes tea".into(), vec!["beverage".into()])
            .await
            .unwrap();

        let by_text = svc.search(&user, "likes tea").await.unwrap();
        assert_eq!(by_text.len(), 1);
        assert!(!by_text[0].matched_topic);

        let by_topic = svc.search(&user, "beverage").await.unwrap();
        assert_eq!(by_topic.len(), 1);
        assert!(by_topic[0].matched_topic);
    }

    #[tokio::test]
    async fn clear_removes_only_that_users_entries() {
        let svc = InMemoryMemoryService::new(50);
        let u1 = UserKey::new("app", "u1");
        let u2 = UserKey::new("app", "u2");
        svc.add(&u1, "a".into(), vec![]).await.unwrap();
        svc.add(&u2, "b".into(), vec![]).await.unwrap();

        svc.clear(&u1).await.unwrap();
        assert!(svc.read(&u1, 10).await.unwrap().is_empty());
        assert_eq!(svc.read(&u2, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tools_are_empty_until_installed() {
        let svc = InMemoryMemoryService::new(50);
        assert!(svc.tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_tools_with_empty_enabled_set_installs_all_six() {
        let svc: Arc<InMemoryMemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let handle: Arc<dyn MemoryService> = svc.clone();
        svc.install_tools(handle, &HashSet::new()).await;

        let names: Vec<String> = svc
            .tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.declaration().name)
            .collect();
        assert_eq!(
            names,
            vec![
                "memory_add",
                "memory_update",
                "memory_delete",
                "memory_clear",
                "memory_load",
                "memory_search",
            ]
        );
    }

    #[tokio::test]
    async fn install_tools_filters_to_the_enabled_set() {
        let svc: Arc<InMemoryMemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let handle: Arc<dyn MemoryService> = svc.clone();
        let enabled: HashSet<String> = ["memory_load", "memory_search"]
            .into_iter()
            .map(String::from)
            .collect();
        svc.install_tools(handle, &enabled).await;

        let names: Vec<String> = svc
            .tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.declaration().name)
            .collect();
        assert_eq!(names, vec!["memory_load", "memory_search"]);
    }
}
