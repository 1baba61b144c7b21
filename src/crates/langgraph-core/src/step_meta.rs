//! Step-metadata events (spec §4.3.2): each Pregel step emits a structural
//! event carrying a step-metadata block in `state-delta` under the reserved
//! key `events::PREGEL_STEP_META_KEY`, visible to on-event plugins and to
//! callers. This module is the bridge between the engine's own internal
//! step bookkeeping and the `events::Event` wire shape the rest of the
//! runtime exchanges.

use events::{Event, PREGEL_STEP_META_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step's metadata: which step, which node(s) ran, and the interrupt
/// value if the step halted planning (spec §4.3.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMeta {
    pub step: u64,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<Value>,
}

impl StepMeta {
    pub fn new(step: u64, node_id: impl Into<String>) -> Self {
        Self {
            step,
            node_id: node_id.into(),
            interrupt: None,
        }
    }

    pub fn with_interrupt(mut self, interrupt: Value) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Serializes to the bytes an [`Event::state_delta`] entry holds.
    fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Reads a `StepMeta` back out of an event's state-delta, if present.
    pub fn from_event(event: &Event) -> Option<StepMeta> {
        event
            .state_delta
            .get(PREGEL_STEP_META_KEY)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    /// Stamps `event`'s state-delta with this step's metadata under the
    /// reserved key, in place.
    pub fn stamp(&self, event: &mut Event) -> serde_json::Result<()> {
        event
            .state_delta
            .insert(PREGEL_STEP_META_KEY.to_string(), self.to_bytes()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_and_reads_back() {
        let mut event = Event::new("inv-1", "graph");
        let meta = StepMeta::new(3, "summarize");
        meta.stamp(&mut event).unwrap();

        let read_back = StepMeta::from_event(&event).unwrap();
        assert_eq!(read_back.step, 3);
        assert_eq!(read_back.node_id, "summarize");
        assert!(read_back.interrupt.is_none());
    }

    #[test]
    fn carries_an_interrupt_value() {
        let mut event = Event::new("inv-1", "graph");
        let meta = StepMeta::new(5, "approve").with_interrupt(serde_json::json!({"reason": "needs_approval"}));
        meta.stamp(&mut event).unwrap();

        let read_back = StepMeta::from_event(&event).unwrap();
        assert_eq!(read_back.interrupt.unwrap()["reason"], "needs_approval");
    }

    #[test]
    fn absent_when_never_stamped() {
        let event = Event::new("inv-1", "graph");
        assert!(StepMeta::from_event(&event).is_none());
    }
}
