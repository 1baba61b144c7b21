//! The append-event hook chain (spec §6.1): each hook receives
//! `(ctx, session, event, key)` and decides whether to continue.

use crate::model::Session;
use async_trait::async_trait;
use events::{Event, InvocationContext};

/// One link in the append-event hook chain. `call` receives the session
/// being appended to and the candidate event, and decides whether the chain
/// continues. Returning `Ok(false)` aborts the append without an error —
/// `Ok(true)` (or no hooks at all) lets it proceed.
#[async_trait]
pub trait AppendEventHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        session: &Session,
        event: &Event,
    ) -> crate::error::Result<bool>;
}

/// An ordered list of [`AppendEventHook`]s run serially; the first to
/// return `false` stops the chain.
#[derive(Default, Clone)]
pub struct AppendEventHookChain {
    hooks: std::sync::Arc<Vec<std::sync::Arc<dyn AppendEventHook>>>,
}

impl AppendEventHookChain {
    pub fn new(hooks: Vec<std::sync::Arc<dyn AppendEventHook>>) -> Self {
        Self {
            hooks: std::sync::Arc::new(hooks),
        }
    }

    /// Runs the chain; returns `Ok(true)` iff every hook let the append
    /// proceed.
    pub async fn run(
        &self,
        ctx: &InvocationContext,
        session: &Session,
        event: &Event,
    ) -> crate::error::Result<bool> {
        for hook in self.hooks.iter() {
            if !hook.call(ctx, session, event).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
