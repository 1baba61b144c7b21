//! The generalized tool contract consumed by the graph engine and the
//! plugin before/after-tool hooks: a typed declaration plus an
//! opaque-raw-bytes call surface (spec §6.4).
//!
//! This sits alongside [`crate::tool::Tool`] rather than replacing it —
//! `Tool` is the teacher's JSON-in/JSON-out executor shape used by the
//! graph's own tool-calling nodes; `CallableTool` is the narrower contract
//! the plugin mediator and external tool collaborators see, where arguments
//! and results are raw bytes (JSON-encoded by convention, per spec §6.4,
//! but opaque to everything except tool-call-id correlation).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a tool declares about itself: name, human description, and its
/// input/output JSON schemas (output schema is optional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum CallableToolError {
    #[error("tool '{tool}' execution failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

#[async_trait]
pub trait CallableTool: Send + Sync {
    fn declaration(&self) -> ToolDeclaration;

    /// `raw_args` is JSON-encoded by convention; the core never inspects it
    /// beyond passing it through, except to correlate a tool-call id
    /// carried alongside it at the call site.
    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError>;
}

/// Adapts the teacher's JSON-`Value`-based [`crate::tool::Tool`] to the
/// raw-bytes [`CallableTool`] contract, so existing JSON-executor tools can
/// be registered with the plugin mediator without rewriting their executor.
pub struct JsonToolAdapter {
    inner: std::sync::Arc<crate::tool::Tool>,
}

impl JsonToolAdapter {
    pub fn new(inner: std::sync::Arc<crate::tool::Tool>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CallableTool for JsonToolAdapter {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.inner.name.clone(),
            description: self.inner.description.clone(),
            input_schema: self.inner.input_schema.clone(),
            output_schema: None,
        }
    }

    async fn call(&self, raw_args: &[u8]) -> Result<Vec<u8>, CallableToolError> {
        let args: Value = serde_json::from_slice(raw_args).map_err(|e| {
            CallableToolError::ExecutionFailed {
                tool: self.inner.name.clone(),
                message: format!("invalid JSON arguments: {e}"),
            }
        })?;

        let result = self.inner.execute(args, None).await.map_err(|e| {
            CallableToolError::ExecutionFailed {
                tool: self.inner.name.clone(),
                message: e.to_string(),
            }
        })?;

        serde_json::to_vec(&result).map_err(|e| CallableToolError::ExecutionFailed {
            tool: self.inner.name.clone(),
            message: format!("failed to encode result: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use std::sync::Arc;

    #[tokio::test]
    async fn json_adapter_round_trips_through_raw_bytes() {
        let tool = Tool::new(
            "echo",
            "echoes its input",
            serde_json::json!({"type": "object"}),
            Arc::new(|args, _runtime| Box::pin(async move { Ok(args) })),
        );
        let adapter = JsonToolAdapter::new(Arc::new(tool));

        let raw_args = serde_json::to_vec(&serde_json::json!({"x": 1})).unwrap();
        let raw_result = adapter.call(&raw_args).await.unwrap();
        let result: Value = serde_json::from_slice(&raw_result).unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn declaration_mirrors_the_inner_tool() {
        let tool = Tool::new(
            "echo",
            "echoes its input",
            serde_json::json!({"type": "object"}),
            Arc::new(|args, _runtime| Box::pin(async move { Ok(args) })),
        );
        let adapter = JsonToolAdapter::new(Arc::new(tool));
        let decl = adapter.declaration();
        assert_eq!(decl.name, "echo");
        assert!(decl.output_schema.is_none());
    }
}
