//! The `Agent` collaborator the runner drives (spec §2's data-flow
//! paragraph: "the agent... produces a stream of Events"). A graph-agent is
//! the expected real implementation; this crate only depends on the trait.

use async_trait::async_trait;
use events::{Event, InvocationContext};
use std::pin::Pin;

/// A stream of events an agent invocation yields, in emission order. Errors
/// surfaced mid-stream are the agent's own (e.g. a graph routing error);
/// the runner forwards them to the caller without retrying (spec §7:
/// "partial streaming events are never retried").
pub type EventStream = Pin<Box<dyn futures::Stream<Item = events::Result<Event>> + Send>>;

/// Invoked once per turn with the caller's raw input; yields the events the
/// invocation produces, in order.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        ctx: &InvocationContext,
        invocation_id: &str,
        user_input: serde_json::Value,
    ) -> events::Result<EventStream>;
}
