//! Hook argument/result shapes and the per-phase trait each plugin
//! implements against (spec §4.2).

use crate::error::{HookError, Result as HookDispatchResult};
use async_trait::async_trait;
use events::{Event, InvocationContext, ModelResponse};

pub type HookResult<T> = std::result::Result<T, HookError>;

/// Arguments passed to `before_agent`/`after_agent` hooks.
#[derive(Debug, Clone)]
pub struct AgentCallbackArgs {
    pub invocation_id: String,
    pub agent_name: String,
    pub user_input: serde_json::Value,
}

/// What a `before_agent` hook may return.
#[derive(Debug, Clone, Default)]
pub struct BeforeAgentResult {
    /// A context carrying extra values the hook wants visible downstream.
    pub context_override: Option<InvocationContext>,
    /// If set, the agent invocation is skipped entirely and this event is
    /// used as if the agent had produced it.
    pub custom_response: Option<Event>,
}

/// What an `after_agent` hook may return: a replacement for the final event
/// seen so far in the chain.
pub type AfterAgentResult = Option<Event>;

#[async_trait]
pub trait BeforeAgentHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &AgentCallbackArgs,
    ) -> HookResult<Option<BeforeAgentResult>>;
}

#[async_trait]
pub trait AfterAgentHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &AgentCallbackArgs,
        current: &Event,
    ) -> HookResult<AfterAgentResult>;
}

/// Arguments passed to `before_model`/`after_model` hooks.
#[derive(Debug, Clone)]
pub struct ModelCallbackArgs {
    pub invocation_id: String,
    pub request: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct BeforeModelResult {
    pub context_override: Option<InvocationContext>,
    /// If set, replaces the request seen by the model and by every
    /// subsequent `before_model` hook in the chain — this is how a
    /// global-instruction-style plugin rewrites the outgoing messages
    /// without short-circuiting the call.
    pub request_override: Option<serde_json::Value>,
    /// If set, the model is never called; this response flows downstream as
    /// if the model had produced it.
    pub custom_response: Option<ModelResponse>,
}

#[async_trait]
pub trait BeforeModelHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &ModelCallbackArgs,
    ) -> HookResult<Option<BeforeModelResult>>;
}

/// Result of running the full `before_model` chain: the request as rewritten
/// by every non-short-circuiting hook, plus a short-circuit response if one
/// fired.
#[derive(Debug, Clone)]
pub struct BeforeModelOutcome {
    pub context: InvocationContext,
    pub request: serde_json::Value,
    pub short_circuit: Option<ModelResponse>,
}

#[async_trait]
pub trait AfterModelHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &ModelCallbackArgs,
        current: &ModelResponse,
    ) -> HookResult<Option<ModelResponse>>;
}

/// Arguments passed to `before_tool`/`after_tool` hooks.
#[derive(Debug, Clone)]
pub struct ToolCallbackArgs {
    pub invocation_id: String,
    pub tool_name: String,
    pub tool_call_id: String,
    pub raw_args: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct BeforeToolResult {
    pub context_override: Option<InvocationContext>,
    /// If set, the tool is never called; these raw bytes flow downstream as
    /// if the tool had produced them.
    pub custom_result: Option<Vec<u8>>,
}

#[async_trait]
pub trait BeforeToolHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &ToolCallbackArgs,
    ) -> HookResult<Option<BeforeToolResult>>;
}

#[async_trait]
pub trait AfterToolHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        args: &ToolCallbackArgs,
        current: &[u8],
    ) -> HookResult<Option<Vec<u8>>>;
}

/// `on_event` sees every event that flows onto the outer channel. Returning
/// `Some` replaces the event for downstream hooks and consumers; `None`
/// means "no change" — it must never be interpreted as "drop the event".
#[async_trait]
pub trait OnEventHook: Send + Sync {
    async fn call(
        &self,
        ctx: &InvocationContext,
        invocation_id: &str,
        event: &Event,
    ) -> HookResult<Option<Event>>;
}

#[async_trait]
pub trait CloseHook: Send + Sync {
    async fn close(&self) -> HookResult<()>;
}

/// A plugin registers whichever hook lists it needs into the shared
/// [`Registry`]; a nil/absent registry entry is simply never dispatched.
/// Modeled as a record of optional handler lists rather than one large
/// interface, per spec §9 design note.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, registry: &mut Registry);
}

/// Central dispatch table. All registry-mutation methods on a `None`
/// registry reference are unreachable by construction — `PluginManager`
/// itself is the only holder and is always `Some` once built; callers that
/// hold an `Option<Arc<PluginManager>>` (the "nil manager" clause of §4.2)
/// short-circuit to no-ops before ever touching a `Registry`.
#[derive(Default)]
pub struct Registry {
    pub(crate) before_agent: Vec<(String, std::sync::Arc<dyn BeforeAgentHook>)>,
    pub(crate) after_agent: Vec<(String, std::sync::Arc<dyn AfterAgentHook>)>,
    pub(crate) before_model: Vec<(String, std::sync::Arc<dyn BeforeModelHook>)>,
    pub(crate) after_model: Vec<(String, std::sync::Arc<dyn AfterModelHook>)>,
    pub(crate) before_tool: Vec<(String, std::sync::Arc<dyn BeforeToolHook>)>,
    pub(crate) after_tool: Vec<(String, std::sync::Arc<dyn AfterToolHook>)>,
    pub(crate) on_event: Vec<(String, std::sync::Arc<dyn OnEventHook>)>,
    pub(crate) closers: Vec<(String, std::sync::Arc<dyn CloseHook>)>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn add_before_agent(&mut self, owner: &str, hook: std::sync::Arc<dyn BeforeAgentHook>) {
        self.before_agent.push((owner.to_string(), hook));
    }

    pub fn add_after_agent(&mut self, owner: &str, hook: std::sync::Arc<dyn AfterAgentHook>) {
        self.after_agent.push((owner.to_string(), hook));
    }

    pub fn add_before_model(&mut self, owner: &str, hook: std::sync::Arc<dyn BeforeModelHook>) {
        self.before_model.push((owner.to_string(), hook));
    }

    pub fn add_after_model(&mut self, owner: &str, hook: std::sync::Arc<dyn AfterModelHook>) {
        self.after_model.push((owner.to_string(), hook));
    }

    pub fn add_before_tool(&mut self, owner: &str, hook: std::sync::Arc<dyn BeforeToolHook>) {
        self.before_tool.push((owner.to_string(), hook));
    }

    pub fn add_after_tool(&mut self, owner: &str, hook: std::sync::Arc<dyn AfterToolHook>) {
        self.after_tool.push((owner.to_string(), hook));
    }

    pub fn add_on_event(&mut self, owner: &str, hook: std::sync::Arc<dyn OnEventHook>) {
        self.on_event.push((owner.to_string(), hook));
    }

    pub fn add_closer(&mut self, owner: &str, hook: std::sync::Arc<dyn CloseHook>) {
        self.closers.push((owner.to_string(), hook));
    }
}

pub(crate) fn wrap<T>(plugin: &str, result: HookResult<T>) -> HookDispatchResult<T> {
    result.map_err(|e| crate::error::PluginError::wrap(plugin, e))
}
