//! Bridges a compiled `langgraph-core` graph into the [`Agent`] contract:
//! the graph's own `StreamChunk` observability feed (spec §4.3.7: "the
//! engine forwards each yielded event immediately to the outer event
//! channel") is translated into `events::Event`s, each stamped with the
//! step-metadata block spec §4.3.2 requires of a step's structural event.

use crate::agent::{Agent, EventStream};
use async_trait::async_trait;
use events::{Event, EventError, InvocationContext};
use futures::StreamExt;
use langgraph_core::step_meta::StepMeta;
use langgraph_core::{CompiledGraph, StreamEvent, StreamMode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Tracks which Pregel step each in-flight task was planned under, so a
/// `TaskEnd`/`TaskError` chunk can be stamped with the same step its
/// matching `TaskStart` was (spec §4.3.2's step index is per-superstep, not
/// per-chunk).
struct StepTracker {
    counter: AtomicU64,
    by_task: Mutex<HashMap<String, u64>>,
}

impl StepTracker {
    fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            by_task: Mutex::new(HashMap::new()),
        }
    }

    fn begin(&self, task_id: &str) -> u64 {
        let step = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.by_task.lock().unwrap().insert(task_id.to_string(), step);
        step
    }

    fn end(&self, task_id: &str) -> u64 {
        self.by_task
            .lock()
            .unwrap()
            .remove(task_id)
            .unwrap_or_else(|| self.counter.load(Ordering::SeqCst))
    }
}

/// An [`Agent`] whose invocation runs a compiled graph to completion,
/// surfacing its execution as a stream of step-stamped events.
pub struct GraphAgent {
    name: String,
    graph: Arc<CompiledGraph>,
}

impl GraphAgent {
    pub fn new(name: impl Into<String>, graph: Arc<CompiledGraph>) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }
}

#[async_trait]
impl Agent for GraphAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        _ctx: &InvocationContext,
        invocation_id: &str,
        user_input: serde_json::Value,
    ) -> events::Result<EventStream> {
        let chunks = self
            .graph
            .stream_chunks_with_modes(user_input, vec![StreamMode::Tasks], None)
            .await
            .map_err(EventError::agent)?;

        let invocation_id = invocation_id.to_string();
        let author = self.name.clone();
        let tracker = Arc::new(StepTracker::new());

        let events = chunks.filter_map(move |chunk| {
            let event = to_event(&invocation_id, &author, tracker.as_ref(), chunk.event);
            async move { event.map(Ok) }
        });

        Ok(Box::pin(events))
    }
}

/// Maps one graph `StreamEvent` to zero-or-one `events::Event`s. Chunks this
/// bridge has no mapping for (the engine only ever yields `Tasks`-mode
/// chunks here) fall through to `None` rather than erroring — an
/// unrecognized observability chunk is not an invocation failure.
fn to_event(
    invocation_id: &str,
    author: &str,
    tracker: &StepTracker,
    event: StreamEvent,
) -> Option<Event> {
    match event {
        StreamEvent::TaskStart { node, .. } => {
            let step = tracker.begin(&node);
            let mut ev = Event::new(invocation_id, author).with_filter_key(node.clone());
            StepMeta::new(step, node).stamp(&mut ev).ok();
            Some(ev)
        }
        StreamEvent::TaskEnd { node, output, .. } => {
            let step = tracker.end(&node);
            let mut ev = Event::new(invocation_id, author).with_filter_key(node.clone());
            StepMeta::new(step, node.clone()).stamp(&mut ev).ok();
            stamp_output(&mut ev, &node, &output);
            Some(ev)
        }
        StreamEvent::TaskError { node, error, .. } => {
            let step = tracker.end(&node);
            let mut ev = Event::new(invocation_id, author).with_filter_key(node.clone());
            StepMeta::new(step, node).stamp(&mut ev).ok();
            ev.state_delta
                .insert("error".to_string(), error.into_bytes());
            Some(ev)
        }
        StreamEvent::Interrupted { node, step, reason } => {
            let mut ev = Event::new(invocation_id, author).with_filter_key(node.clone());
            StepMeta::new(step as u64, node)
                .with_interrupt(serde_json::json!({ "reason": reason }))
                .stamp(&mut ev)
                .ok();
            ev.requires_completion = true;
            Some(ev)
        }
        _ => None,
    }
}

/// Copies a node's output delta into the event's `state_delta` (one entry
/// per top-level field, JSON-encoded — spec §3.1's byte-wise state-delta
/// payload), and lifts `<node_id>_parsed` into `structured_output` when the
/// node produced one (spec §4.3.4).
fn stamp_output(ev: &mut Event, node: &str, output: &serde_json::Value) {
    let parsed_key = format!("{node}_parsed");
    if let Some(obj) = output.as_object() {
        for (key, value) in obj {
            if let Ok(bytes) = serde_json::to_vec(value) {
                ev.state_delta.insert(key.clone(), bytes);
            }
        }
        if let Some(parsed) = obj.get(&parsed_key) {
            ev.structured_output = Some(parsed.clone());
        }
    } else if let Ok(bytes) = serde_json::to_vec(output) {
        ev.state_delta.insert("output".to_string(), bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use langgraph_core::StateGraph;
    use serde_json::json;

    fn two_step_graph() -> Arc<CompiledGraph> {
        let mut graph = StateGraph::new();
        graph.add_node("step1", |mut state| {
            Box::pin(async move {
                if let Some(obj) = state.as_object_mut() {
                    obj.insert("step1_ran".to_string(), json!(true));
                }
                Ok(state)
            })
        });
        graph.add_node("step2", |mut state| {
            Box::pin(async move {
                if let Some(obj) = state.as_object_mut() {
                    obj.insert("step2_ran".to_string(), json!(true));
                }
                Ok(state)
            })
        });
        graph.add_edge("__start__", "step1");
        graph.add_edge("step1", "step2");
        graph.add_edge("step2", "__end__");
        Arc::new(graph.compile().expect("graph compiles"))
    }

    #[tokio::test]
    async fn streams_one_stamped_event_per_node() {
        let agent = GraphAgent::new("worker", two_step_graph());
        let ctx = InvocationContext::new();
        let stream = agent
            .invoke(&ctx, "inv-1", json!({"value": 1}))
            .await
            .expect("invoke succeeds");

        let events: Vec<Event> = stream.map(|r| r.expect("no stream error")).collect().await;

        // TaskStart + TaskEnd per node, for two nodes.
        assert_eq!(events.len(), 4);
        for event in &events {
            assert_eq!(event.invocation_id, "inv-1");
            assert!(StepMeta::from_event(event).is_some());
        }

        let steps: Vec<u64> = events
            .iter()
            .map(|e| StepMeta::from_event(e).unwrap().step)
            .collect();
        assert_eq!(steps, vec![1, 1, 2, 2]);

        let final_event = events.last().unwrap();
        assert_eq!(
            serde_json::from_slice::<bool>(&final_event.state_delta["step2_ran"]).unwrap(),
            true
        );
    }

    #[tokio::test]
    async fn surfaces_interrupt_as_a_requires_completion_event() {
        use langgraph_core::interrupt::InterruptConfig;

        let mut graph = StateGraph::new();
        graph.add_node("approve", |state| Box::pin(async move { Ok(state) }));
        graph.add_edge("__start__", "approve");
        graph.add_edge("approve", "__end__");
        let interrupts = InterruptConfig::new().with_interrupt_before(vec!["approve".to_string()]);
        let compiled = Arc::new(graph.compile_with_interrupts(interrupts).expect("compiles"));

        let agent = GraphAgent::new("worker", compiled);
        let ctx = InvocationContext::new();
        let stream = agent
            .invoke(&ctx, "inv-2", json!({}))
            .await
            .expect("invoke succeeds");

        let events: Vec<Event> = stream.map(|r| r.expect("no stream error")).collect().await;

        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert!(ev.requires_completion);
        let meta = StepMeta::from_event(ev).expect("step meta present");
        assert_eq!(meta.node_id, "approve");
        assert!(meta.interrupt.is_some());
    }
}
