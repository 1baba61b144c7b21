//! The ambient, cancellation-carrying context handle threaded through hook
//! dispatch, graph execution and service calls (spec §9 design note: "passed
//! as an ambient cancellation-carrying handle, not as a thread-local").

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A lightweight, cloneable invocation context.
///
/// Cloning shares the same underlying cancellation flag (cancelling any
/// clone cancels all of them) but takes an independent snapshot of the value
/// bag — this is what lets a `before_*` hook return a "replacement context"
/// that carries extra values forward without mutating the caller's context.
#[derive(Clone, Debug)]
pub struct InvocationContext {
    cancellation: CancellationToken,
    values: Arc<HashMap<String, serde_json::Value>>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            values: Arc::new(HashMap::new()),
        }
    }

    /// A context whose cancellation is linked to (but independent of) a
    /// parent's — cancelling the parent cancels this child, but this child
    /// can be cancelled without affecting the parent. Mirrors "a parent
    /// timeout subsumes child timeouts" (spec §5).
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            values: self.values.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Return a new context with `key` set, leaving `self` untouched.
    pub fn with_value(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value);
        Self {
            cancellation: self.cancellation.clone(),
            values: Arc::new(values),
        }
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_value_does_not_mutate_original() {
        let ctx = InvocationContext::new();
        let child = ctx.with_value("k", serde_json::json!(1));
        assert!(ctx.get("k").is_none());
        assert_eq!(child.get("k"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn child_cancellation_follows_parent() {
        let parent = InvocationContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
