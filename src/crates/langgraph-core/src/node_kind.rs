//! The node-type taxonomy a compiled graph classifies each node under
//! (spec §4.3.1): function (pure state→state), agent (delegates to a
//! sub-agent producing a stream), condition (router; output is a node-id),
//! start/end. `__start__`/`__end__` are represented structurally by the
//! reserved edge sentinels [`crate::graph::START`]/[`crate::graph::END`]
//! rather than by a [`crate::graph::NodeSpec`] entry, so in practice only
//! `Function`/`Agent`/`Condition` are ever attached to a real node; `Start`
//! and `End` exist so the taxonomy named in the spec is total.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Agent,
    Condition,
    Start,
    End,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Function
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::Function => "function",
            NodeKind::Agent => "agent",
            NodeKind::Condition => "condition",
            NodeKind::Start => "start",
            NodeKind::End => "end",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_function() {
        assert_eq!(NodeKind::default(), NodeKind::Function);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&NodeKind::Agent).unwrap(), "\"agent\"");
        assert_eq!(serde_json::to_string(&NodeKind::Condition).unwrap(), "\"condition\"");
    }
}
