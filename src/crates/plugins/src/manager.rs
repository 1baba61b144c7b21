//! Construction and dispatch for the ordered before/after hook pipeline
//! (spec §4.2, §8 invariants 3 and S2/S3 calibration cases).

use crate::error::{PluginError, Result};
use crate::hooks::{
    wrap, AfterAgentResult, AgentCallbackArgs, BeforeAgentResult, BeforeModelOutcome,
    BeforeToolResult, ModelCallbackArgs, Plugin, Registry, ToolCallbackArgs,
};
use events::{Event, InvocationContext, ModelResponse};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Owns the ordered registry built from a set of named plugins and drives
/// every hook-dispatch point in the runtime.
///
/// Registration order is preserved and is dispatch order for `before_*` and
/// `on_event` hooks. `after_*` hooks run in the *same* registration order,
/// each seeing the replacement (if any) produced by the previous one —
/// "threaded", not "first wins".
pub struct PluginManager {
    names: Vec<String>,
    registry: Registry,
}

impl PluginManager {
    /// Builds a manager from plugins in the order they should run.
    ///
    /// Rejects an empty plugin name and a name reused by two plugins —
    /// both are construction-time errors, never a partial/degraded manager.
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(plugins.len());
        let mut registry = Registry::new();

        for plugin in &plugins {
            let name = plugin.name();
            if name.is_empty() {
                return Err(PluginError::EmptyName);
            }
            if !seen.insert(name.to_string()) {
                return Err(PluginError::DuplicateName(name.to_string()));
            }
            names.push(name.to_string());
        }

        for plugin in &plugins {
            plugin.register(&mut registry);
        }

        Ok(Self { names, registry })
    }

    pub fn plugin_names(&self) -> &[String] {
        &self.names
    }

    /// Runs `before_agent` hooks in order; the first to return a non-`None`
    /// result short-circuits the remaining hooks (spec §8 invariant 3,
    /// generalized from the before-model case to every before-* phase).
    pub async fn before_agent(
        &self,
        ctx: &InvocationContext,
        args: &AgentCallbackArgs,
    ) -> Result<Option<BeforeAgentResult>> {
        for (owner, hook) in &self.registry.before_agent {
            if let Some(result) = wrap(owner, hook.call(ctx, args).await)? {
                debug!(plugin = %owner, "before_agent short-circuited");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Runs `after_agent` hooks in order, threading the (possibly replaced)
    /// event through each.
    pub async fn after_agent(
        &self,
        ctx: &InvocationContext,
        args: &AgentCallbackArgs,
        mut current: Event,
    ) -> Result<Event> {
        for (owner, hook) in &self.registry.after_agent {
            let replaced: AfterAgentResult = wrap(owner, hook.call(ctx, args, &current).await)?;
            if let Some(next) = replaced {
                current = next;
            }
        }
        Ok(current)
    }

    /// Runs `before_model` hooks in order. Each hook sees the request as
    /// rewritten by every prior hook; a hook that returns a custom response
    /// short-circuits the rest of the chain and the model call itself
    /// (spec §8 invariant 3).
    pub async fn before_model(
        &self,
        ctx: &InvocationContext,
        args: &ModelCallbackArgs,
    ) -> Result<BeforeModelOutcome> {
        let mut ctx = ctx.clone();
        let mut request = args.request.clone();

        for (owner, hook) in &self.registry.before_model {
            let call_args = ModelCallbackArgs {
                invocation_id: args.invocation_id.clone(),
                request: request.clone(),
            };
            if let Some(result) = wrap(owner, hook.call(&ctx, &call_args).await)? {
                if let Some(next_ctx) = result.context_override {
                    ctx = next_ctx;
                }
                if let Some(next_request) = result.request_override {
                    request = next_request;
                }
                if let Some(response) = result.custom_response {
                    debug!(plugin = %owner, "before_model short-circuited");
                    return Ok(BeforeModelOutcome {
                        context: ctx,
                        request,
                        short_circuit: Some(response),
                    });
                }
            }
        }

        Ok(BeforeModelOutcome {
            context: ctx,
            request,
            short_circuit: None,
        })
    }

    pub async fn after_model(
        &self,
        ctx: &InvocationContext,
        args: &ModelCallbackArgs,
        mut current: ModelResponse,
    ) -> Result<ModelResponse> {
        for (owner, hook) in &self.registry.after_model {
            if let Some(next) = wrap(owner, hook.call(ctx, args, &current).await)? {
                current = next;
            }
        }
        Ok(current)
    }

    pub async fn before_tool(
        &self,
        ctx: &InvocationContext,
        args: &ToolCallbackArgs,
    ) -> Result<Option<BeforeToolResult>> {
        for (owner, hook) in &self.registry.before_tool {
            if let Some(result) = wrap(owner, hook.call(ctx, args).await)? {
                debug!(plugin = %owner, "before_tool short-circuited");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    pub async fn after_tool(
        &self,
        ctx: &InvocationContext,
        args: &ToolCallbackArgs,
        mut current: Vec<u8>,
    ) -> Result<Vec<u8>> {
        for (owner, hook) in &self.registry.after_tool {
            if let Some(next) = wrap(owner, hook.call(ctx, args, &current).await)? {
                current = next;
            }
        }
        Ok(current)
    }

    /// Runs `on_event` hooks in order, threading the (possibly replaced)
    /// event through each. `None` from a hook means "unchanged", never
    /// "drop" — there is no way for an `on_event` hook to suppress an event.
    pub async fn on_event(
        &self,
        ctx: &InvocationContext,
        invocation_id: &str,
        mut current: Event,
    ) -> Result<Event> {
        for (owner, hook) in &self.registry.on_event {
            if let Some(next) = wrap(owner, hook.call(ctx, invocation_id, &current).await)? {
                current = next;
            }
        }
        Ok(current)
    }

    /// Closes every registered closer in reverse registration order,
    /// regardless of earlier failures, then joins any errors (spec §8 S2).
    pub async fn close(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (owner, hook) in self.registry.closers.iter().rev() {
            if let Err(e) = hook.close().await {
                warn!(plugin = %owner, error = %e, "plugin failed to close");
                errors.push((owner.clone(), e));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PluginError::CloseFailed { errors })
        }
    }
}
