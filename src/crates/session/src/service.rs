//! The `SessionService` contract (spec §6.1) and its in-process reference
//! implementation.

use crate::error::{Result, SessionError};
use crate::hooks::AppendEventHookChain;
use crate::model::{Session, SessionKey, TrackEvent};
use async_trait::async_trait;
use events::{Event, InvocationContext};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The tier a `update_state` write targets (spec §6.1's "whole-session,
/// per-user, per-app tiers").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    Session,
    User,
    App,
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create(&self, key: SessionKey) -> Result<Session>;
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>>;
    async fn list_by_user(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionKey>>;
    async fn delete(&self, key: &SessionKey) -> Result<()>;

    /// `scope` selects which state tier `field` is written into; `Session`
    /// writes the session's own state map, `User`/`App` write a map shared
    /// across every session for that user / app respectively.
    async fn update_state(
        &self,
        key: &SessionKey,
        scope: StateScope,
        field: String,
        value: Vec<u8>,
    ) -> Result<()>;

    /// Runs the configured append-event hook chain; if every hook lets it
    /// through, appends `event` to the session's log and bumps `updated_at`.
    async fn append_event(
        &self,
        ctx: &InvocationContext,
        key: &SessionKey,
        event: Event,
    ) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Sessions that additionally support named out-of-band tracks expose
    /// themselves here; the default is "not supported" (spec §9: "Session
    /// 'track' side-channels — an optional capability... implementers
    /// SHOULD compose it rather than branch inside session methods").
    fn as_track_service(&self) -> Option<&dyn TrackService> {
        None
    }
}

#[async_trait]
pub trait TrackService: Send + Sync {
    async fn append_track_event(
        &self,
        key: &SessionKey,
        track_name: &str,
        event: TrackEvent,
    ) -> Result<()>;

    async fn read_track_events(
        &self,
        key: &SessionKey,
        track_name: &str,
    ) -> Result<Vec<TrackEvent>>;
}

/// In-process reference implementation: all state lives in a
/// `tokio::sync::RwLock<HashMap<..>>`, mirroring
/// `langgraph_checkpoint::memory::InMemoryCheckpointSaver`'s shape.
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
    user_state: RwLock<HashMap<(String, String), HashMap<String, Vec<u8>>>>,
    app_state: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
    hooks: AppendEventHookChain,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_state: RwLock::new(HashMap::new()),
            app_state: RwLock::new(HashMap::new()),
            hooks: AppendEventHookChain::default(),
        }
    }

    pub fn with_hooks(hooks: AppendEventHookChain) -> Self {
        Self {
            hooks,
            ..Self::new()
        }
    }
}

impl Default for InMemorySessionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(&self, key: SessionKey) -> Result<Session> {
        key.validate()?;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SessionError::AlreadyExists {
                app: key.app_name,
                user: key.user_id,
                session: key.session_id,
            });
        }
        let session = Session::new(key.clone());
        sessions.insert(key, session.clone());
        info!(session = %session.key.session_id, "session created");
        Ok(session)
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn list_by_user(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionKey>> {
        Ok(self
            .sessions
            .read()
            .await
            .keys()
            .filter(|k| k.app_name == app_name && k.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions.write().await.remove(key);
        Ok(())
    }

    async fn update_state(
        &self,
        key: &SessionKey,
        scope: StateScope,
        field: String,
        value: Vec<u8>,
    ) -> Result<()> {
        match scope {
            StateScope::Session => {
                let mut sessions = self.sessions.write().await;
                let session = sessions
                    .get_mut(key)
                    .ok_or_else(|| SessionError::NotFound {
                        app: key.app_name.clone(),
                        user: key.user_id.clone(),
                        session: key.session_id.clone(),
                    })?;
                session.state.insert(field, value);
                session.updated_at = chrono::Utc::now();
            }
            StateScope::User => {
                let mut user_state = self.user_state.write().await;
                user_state
                    .entry((key.app_name.clone(), key.user_id.clone()))
                    .or_default()
                    .insert(field, value);
            }
            StateScope::App => {
                let mut app_state = self.app_state.write().await;
                app_state.entry(key.app_name.clone()).or_default().insert(field, value);
            }
        }
        Ok(())
    }

    async fn append_event(
        &self,
        ctx: &InvocationContext,
        key: &SessionKey,
        event: Event,
    ) -> Result<()> {
        let current = self
            .get(key)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                app: key.app_name.clone(),
                user: key.user_id.clone(),
                session: key.session_id.clone(),
            })?;

        if !self.hooks.run(ctx, &current, &event).await? {
            debug!(session = %key.session_id, "append-event hook chain aborted append");
            return Err(SessionError::HookAborted(
                "append-event hook chain returned false".to_string(),
            ));
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::NotFound {
                app: key.app_name.clone(),
                user: key.user_id.clone(),
                session: key.session_id.clone(),
            })?;
        session.events.push(event);
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn as_track_service(&self) -> Option<&dyn TrackService> {
        Some(self)
    }
}

#[async_trait]
impl TrackService for InMemorySessionService {
    async fn append_track_event(
        &self,
        key: &SessionKey,
        track_name: &str,
        event: TrackEvent,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::NotFound {
                app: key.app_name.clone(),
                user: key.user_id.clone(),
                session: key.session_id.clone(),
            })?;
        session
            .tracks
            .entry(track_name.to_string())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn read_track_events(
        &self,
        key: &SessionKey,
        track_name: &str,
    ) -> Result<Vec<TrackEvent>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(key)
            .ok_or_else(|| SessionError::NotFound {
                app: key.app_name.clone(),
                user: key.user_id.clone(),
                session: key.session_id.clone(),
            })?;
        Ok(session
            .tracks
            .get(track_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::AppendEventHook;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let svc = InMemorySessionService::new();
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();
        let session = svc.get(&key).await.unwrap().unwrap();
        assert_eq!(session.key, key);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_key() {
        let svc = InMemorySessionService::new();
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();
        let err = svc.create(key).await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn create_rejects_empty_key_component() {
        let svc = InMemorySessionService::new();
        let key = SessionKey::new("app", "", "s1");
        let err = svc.create(key).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn append_event_persists_in_order() {
        let svc = InMemorySessionService::new();
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();
        let ctx = InvocationContext::new();

        for i in 0..3 {
            let e = Event::new("inv", format!("author-{i}"));
            svc.append_event(&ctx, &key, e).await.unwrap();
        }

        let session = svc.get(&key).await.unwrap().unwrap();
        assert_eq!(session.events.len(), 3);
        assert_eq!(session.events[1].author, "author-1");
    }

    struct Rejecting;

    #[async_trait]
    impl AppendEventHook for Rejecting {
        async fn call(
            &self,
            _ctx: &InvocationContext,
            _session: &Session,
            _event: &Event,
        ) -> crate::error::Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn append_event_hook_can_abort_the_append() {
        let svc = InMemorySessionService::with_hooks(AppendEventHookChain::new(vec![Arc::new(
            Rejecting,
        )]));
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();
        let ctx = InvocationContext::new();

        let err = svc
            .append_event(&ctx, &key, Event::new("inv", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HookAborted(_)));

        let session = svc.get(&key).await.unwrap().unwrap();
        assert!(session.events.is_empty());
    }

    struct CountingHook {
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl AppendEventHook for CountingHook {
        async fn call(
            &self,
            _ctx: &InvocationContext,
            _session: &Session,
            _event: &Event,
        ) -> crate::error::Result<bool> {
            self.called.store(true, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test]
    async fn append_event_runs_configured_hooks() {
        let called = Arc::new(AtomicBool::new(false));
        let svc = InMemorySessionService::with_hooks(AppendEventHookChain::new(vec![Arc::new(
            CountingHook {
                called: called.clone(),
            },
        )]));
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();
        let ctx = InvocationContext::new();
        svc.append_event(&ctx, &key, Event::new("inv", "a"))
            .await
            .unwrap();
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn track_service_append_and_read() {
        let svc = InMemorySessionService::new();
        let key = SessionKey::new("app", "u1", "s1");
        svc.create(key.clone()).await.unwrap();

        let tracks = svc.as_track_service().expect("tracks supported");
        tracks
            .append_track_event(
                &key,
                "ag-ui",
                TrackEvent {
                    track_name: "ag-ui".into(),
                    payload: b"hello".to_vec(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await
            .unwrap();

        let events = tracks.read_track_events(&key, "ag-ui").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, b"hello");
    }

    #[tokio::test]
    async fn list_by_user_filters_correctly() {
        let svc = InMemorySessionService::new();
        svc.create(SessionKey::new("app", "u1", "s1")).await.unwrap();
        svc.create(SessionKey::new("app", "u1", "s2")).await.unwrap();
        svc.create(SessionKey::new("app", "u2", "s3")).await.unwrap();

        let keys = svc.list_by_user("app", "u1").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
