//! Composes a session, an optional plugin manager, an agent and the
//! ambient auto-memory/artifact/translator collaborators, and drives one
//! user turn to completion (spec §2 top-level data flow).

use crate::agent::Agent;
use crate::config::RunnerConfig;
use crate::error::Result;
use events::{EventSink, InvocationContext};
use futures::StreamExt;
use plugins::{AgentCallbackArgs, PluginManager};
use session::{Session, SessionKey, SessionService};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Auto-memory enqueue is behind a trait object so a caller can wire
/// either a live [`memory::AutoMemoryHandle`] or [`memory::DisabledAutoMemory`]
/// without the runner branching on an enabled flag itself (spec §4.4: "wraps
/// the service with a pass-through that no-ops enqueue-job").
#[async_trait::async_trait]
pub trait AutoMemorySink: Send + Sync {
    async fn enqueue(&self, session: &Session);
}

#[async_trait::async_trait]
impl AutoMemorySink for memory::AutoMemoryHandle {
    async fn enqueue(&self, session: &Session) {
        if let Err(e) = self.enqueue_job(session).await {
            warn!(error = %e, session = %session.key.session_id, "auto-memory enqueue failed");
        }
    }
}

#[async_trait::async_trait]
impl AutoMemorySink for memory::DisabledAutoMemory {
    async fn enqueue(&self, _session: &Session) {}
}

/// Every event produced during a turn, in emission order — the event each
/// was run through `on_event` and persisted as. `wire_events` is populated
/// only when [`RunnerConfig::translate_for_external_consumers`] is set.
pub struct TurnOutcome {
    pub events: Vec<events::Event>,
    pub wire_events: Vec<translator::WireEvent>,
}

pub struct Runner {
    config: RunnerConfig,
    session_service: Arc<dyn SessionService>,
    plugin_manager: Option<Arc<PluginManager>>,
    agent: Arc<dyn Agent>,
    auto_memory: Arc<dyn AutoMemorySink>,
}

impl Runner {
    pub fn new(
        config: RunnerConfig,
        session_service: Arc<dyn SessionService>,
        plugin_manager: Option<Arc<PluginManager>>,
        agent: Arc<dyn Agent>,
        auto_memory: Arc<dyn AutoMemorySink>,
    ) -> Self {
        Self {
            config,
            session_service,
            plugin_manager,
            agent,
            auto_memory,
        }
    }

    /// Materializes or loads `key`'s session, wires plugin callbacks around
    /// the agent, drives the invocation's event stream to completion,
    /// persisting each event, and enqueues an auto-memory job at the end.
    pub async fn run_turn(
        &self,
        ctx: &InvocationContext,
        key: &SessionKey,
        invocation_id: &str,
        user_input: serde_json::Value,
    ) -> Result<TurnOutcome> {
        self.ensure_session(key).await?;

        let agent_args = AgentCallbackArgs {
            invocation_id: invocation_id.to_string(),
            agent_name: self.agent.name().to_string(),
            user_input: user_input.clone(),
        };

        if let Some(manager) = &self.plugin_manager {
            if let Some(before) = manager.before_agent(ctx, &agent_args).await? {
                if let Some(custom) = before.custom_response {
                    debug!(invocation = %invocation_id, "before_agent short-circuited the invocation");
                    let persisted = self.persist_and_collect(ctx, key, vec![custom]).await?;
                    let wire_events = self.translate(key, invocation_id, &persisted)?;
                    self.enqueue_auto_memory(key).await;
                    return Ok(TurnOutcome { events: persisted, wire_events });
                }
            }
        }

        let (sink, mut receiver) = EventSink::channel(self.config.channel_capacity);
        let mut raw_stream = self.agent.invoke(ctx, invocation_id, user_input).await?;

        let forward_ctx = ctx.clone();
        let emit_timeout = self.config.emit_timeout;
        let forward = tokio::spawn(async move {
            while let Some(item) = raw_stream.next().await {
                match item {
                    Ok(event) => {
                        if sink.emit(&forward_ctx, Some(event), emit_timeout).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "agent stream yielded an error; stopping forward");
                        break;
                    }
                }
            }
        });

        let mut raw_events = Vec::new();
        while let Some(event) = receiver.recv().await {
            raw_events.push(event);
        }
        let _ = forward.await;

        let persisted = self.persist_and_collect(ctx, key, raw_events).await?;

        if let (Some(manager), Some(last)) = (&self.plugin_manager, persisted.last().cloned()) {
            let replaced = manager.after_agent(ctx, &agent_args, last).await?;
            debug!(invocation = %invocation_id, event = %replaced.id, "after_agent ran");
        }

        let wire_events = self.translate(key, invocation_id, &persisted)?;
        self.enqueue_auto_memory(key).await;

        Ok(TurnOutcome { events: persisted, wire_events })
    }

    /// Maps a turn's persisted events to the AG-UI wire sequence when
    /// enabled (spec §6.5); a no-op, empty result otherwise.
    fn translate(
        &self,
        key: &SessionKey,
        invocation_id: &str,
        persisted: &[events::Event],
    ) -> Result<Vec<translator::WireEvent>> {
        if !self.config.translate_for_external_consumers {
            return Ok(Vec::new());
        }
        let mut t = translator::Translator::new(key.session_id.clone(), invocation_id.to_string());
        let mut wire = vec![t.run_started()?];
        for event in persisted {
            wire.extend(t.translate_event(event)?);
        }
        wire.push(t.finish_ok()?);
        Ok(wire)
    }

    async fn ensure_session(&self, key: &SessionKey) -> Result<()> {
        if self.session_service.get(key).await?.is_none() {
            self.session_service.create(key.clone()).await?;
            info!(session = %key.session_id, "session created for turn");
        }
        Ok(())
    }

    /// Runs each event through the `on_event` plugin chain, then the
    /// session's append-event hook chain, returning the (possibly
    /// replaced) events in order.
    async fn persist_and_collect(
        &self,
        ctx: &InvocationContext,
        key: &SessionKey,
        raw_events: Vec<events::Event>,
    ) -> Result<Vec<events::Event>> {
        let mut out = Vec::with_capacity(raw_events.len());
        for event in raw_events {
            let event = match &self.plugin_manager {
                Some(manager) => {
                    let invocation_id = event.invocation_id.clone();
                    manager.on_event(ctx, &invocation_id, event).await?
                }
                None => event,
            };
            self.session_service.append_event(ctx, key, event.clone()).await?;
            out.push(event);
        }
        Ok(out)
    }

    async fn enqueue_auto_memory(&self, key: &SessionKey) {
        match self.session_service.get(key).await {
            Ok(Some(session)) => self.auto_memory.enqueue(&session).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not reload session for auto-memory enqueue"),
        }
    }

    pub async fn close(&self) -> Result<()> {
        if let Some(manager) = &self.plugin_manager {
            manager.close().await?;
        }
        self.session_service.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EventStream;
    use async_trait::async_trait;
    use events::Event;
    use session::InMemorySessionService;
    use std::sync::Mutex;

    struct ScriptedAgent {
        name: String,
        events: Mutex<Option<Vec<Event>>>,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn invoke(
            &self,
            _ctx: &InvocationContext,
            _invocation_id: &str,
            _user_input: serde_json::Value,
        ) -> events::Result<EventStream> {
            let events = self.events.lock().unwrap().take().unwrap_or_default();
            Ok(Box::pin(tokio_stream::iter(events.into_iter().map(Ok))))
        }
    }

    #[tokio::test]
    async fn run_turn_persists_every_agent_event() {
        let session_service: Arc<dyn SessionService> = Arc::new(InMemorySessionService::new());
        let agent = Arc::new(ScriptedAgent {
            name: "test-agent".to_string(),
            events: Mutex::new(Some(vec![
                Event::new("inv-1", "test-agent"),
                Event::new("inv-1", "test-agent"),
            ])),
        });
        let runner = Runner::new(
            RunnerConfig::default(),
            session_service.clone(),
            None,
            agent,
            Arc::new(memory::DisabledAutoMemory),
        );

        let ctx = InvocationContext::new();
        let key = SessionKey::new("app", "u1", "s1");
        let outcome = runner
            .run_turn(&ctx, &key, "inv-1", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();

        assert_eq!(outcome.events.len(), 2);
        let session = session_service.get(&key).await.unwrap().unwrap();
        assert_eq!(session.events.len(), 2);
    }

    #[tokio::test]
    async fn run_turn_creates_session_if_missing() {
        let session_service: Arc<dyn SessionService> = Arc::new(InMemorySessionService::new());
        let agent = Arc::new(ScriptedAgent {
            name: "a".to_string(),
            events: Mutex::new(Some(vec![])),
        });
        let runner = Runner::new(
            RunnerConfig::default(),
            session_service.clone(),
            None,
            agent,
            Arc::new(memory::DisabledAutoMemory),
        );

        let key = SessionKey::new("app", "u1", "new-session");
        assert!(session_service.get(&key).await.unwrap().is_none());

        runner
            .run_turn(&InvocationContext::new(), &key, "inv-1", serde_json::json!(null))
            .await
            .unwrap();

        assert!(session_service.get(&key).await.unwrap().is_some());
    }
}
