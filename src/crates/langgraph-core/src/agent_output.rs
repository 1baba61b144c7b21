//! Subgraph output mapping (spec §4.3.4): when an agent node is nested, the
//! sub-agent's terminal response is mapped back into parent state via a
//! mapper yielding a state delta containing the last-response text, a
//! `node_responses` map entry keyed by node-id, a reset `user_input`, and
//! the node's own `<id>_output`/`<id>_parsed` fields (the latter present
//! iff the sub-agent produced a structured-output payload). This is a
//! specialization of [`crate::subgraph::create_subgraph_node`]'s blind
//! object-merge for the one case the spec names explicitly.

use crate::graph::NodeExecutor;
use crate::node_kind::NodeKind;
use crate::subgraph::SubgraphExecutor;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The fields a terminal agent response contributes to this mapping.
#[derive(Debug, Clone, Default)]
pub struct AgentTerminalResponse {
    pub text: String,
    pub structured_output: Option<Value>,
}

/// Builds the state delta for one agent node's terminal response, given the
/// state observed just before the node ran (so `node_responses` accumulates
/// across nodes rather than overwriting it).
pub fn map_agent_output(node_id: &str, prior_state: &Value, response: &AgentTerminalResponse) -> Value {
    let mut node_responses = prior_state
        .get("node_responses")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    node_responses.insert(node_id.to_string(), Value::String(response.text.clone()));

    let mut delta = Map::new();
    delta.insert("last_response".to_string(), Value::String(response.text.clone()));
    delta.insert("node_responses".to_string(), Value::Object(node_responses));
    delta.insert("user_input".to_string(), Value::Null);
    delta.insert(format!("{node_id}_output"), Value::String(response.text.clone()));
    if let Some(parsed) = &response.structured_output {
        delta.insert(format!("{node_id}_parsed"), parsed.clone());
    }
    Value::Object(delta)
}

/// Extracts an [`AgentTerminalResponse`] from a sub-agent's raw output
/// value, reading the `response`/`structured_output` fields a terminal
/// [`events::Event`] would carry once serialized to JSON for graph state.
/// Falls back to treating a bare string output as the response text.
fn terminal_response_from(output: &Value) -> AgentTerminalResponse {
    match output {
        Value::String(s) => AgentTerminalResponse {
            text: s.clone(),
            structured_output: None,
        },
        Value::Object(obj) => AgentTerminalResponse {
            text: obj
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default(),
            structured_output: obj.get("structured_output").cloned(),
        },
        other => AgentTerminalResponse {
            text: other.to_string(),
            structured_output: None,
        },
    }
}

/// Creates a node executor that runs `subgraph` and maps its terminal
/// output into the spec's `last_response`/`node_responses`/`<id>_output`/
/// `<id>_parsed` fields rather than blindly merging the subgraph's raw
/// output object into parent state.
pub fn create_agent_output_node(node_id: impl Into<String>, subgraph: Arc<dyn SubgraphExecutor>) -> NodeExecutor {
    let node_id = node_id.into();
    Arc::new(move |state: Value| {
        let node_id = node_id.clone();
        let subgraph = subgraph.clone();
        Box::pin(async move {
            let prior_state = state.clone();
            let output = subgraph
                .invoke(state)
                .await
                .map_err(|e| Box::new(crate::error::GraphError::node_execution(node_id.clone(), e.to_string()))
                    as Box<dyn std::error::Error + Send + Sync>)?;
            let response = terminal_response_from(&output);
            Ok(map_agent_output(&node_id, &prior_state, &response))
        })
    })
}

/// The node kind a node built with [`create_agent_output_node`] should be
/// classified under in its [`crate::graph::NodeSpec`].
pub const AGENT_OUTPUT_NODE_KIND: NodeKind = NodeKind::Agent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_text_response_into_spec_fields() {
        let prior = serde_json::json!({"user_input": "hello"});
        let response = AgentTerminalResponse {
            text: "hi there".to_string(),
            structured_output: None,
        };
        let delta = map_agent_output("greeter", &prior, &response);

        assert_eq!(delta["last_response"], "hi there");
        assert_eq!(delta["node_responses"]["greeter"], "hi there");
        assert_eq!(delta["greeter_output"], "hi there");
        assert!(delta.get("greeter_parsed").is_none());
        assert_eq!(delta["user_input"], Value::Null);
    }

    #[test]
    fn structured_output_adds_parsed_field() {
        let prior = Value::Null;
        let response = AgentTerminalResponse {
            text: "the weather is sunny".to_string(),
            structured_output: Some(serde_json::json!({"temp_f": 72})),
        };
        let delta = map_agent_output("weather", &prior, &response);

        assert_eq!(delta["weather_parsed"]["temp_f"], 72);
    }

    #[test]
    fn accumulates_node_responses_across_nodes() {
        let prior = serde_json::json!({"node_responses": {"first": "a"}});
        let response = AgentTerminalResponse {
            text: "b".to_string(),
            structured_output: None,
        };
        let delta = map_agent_output("second", &prior, &response);

        assert_eq!(delta["node_responses"]["first"], "a");
        assert_eq!(delta["node_responses"]["second"], "b");
    }

    #[test]
    fn terminal_response_reads_object_shape() {
        let output = serde_json::json!({"response": "done", "structured_output": {"ok": true}});
        let parsed = terminal_response_from(&output);
        assert_eq!(parsed.text, "done");
        assert_eq!(parsed.structured_output.unwrap()["ok"], true);
    }
}
