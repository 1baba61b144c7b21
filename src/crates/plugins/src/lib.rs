//! Ordered before/after hook pipeline mediating model, tool and agent calls,
//! plus event-stream observation (spec §4.2).

pub mod error;
pub mod hooks;
pub mod manager;

pub use error::{HookError, PluginError, Result};
pub use hooks::{
    AfterAgentHook, AfterModelHook, AfterToolHook, AgentCallbackArgs, BeforeAgentHook,
    BeforeAgentResult, BeforeModelHook, BeforeModelOutcome, BeforeModelResult, BeforeToolHook,
    BeforeToolResult, CloseHook, ModelCallbackArgs, OnEventHook, Plugin, Registry,
    ToolCallbackArgs,
};
pub use manager::PluginManager;
