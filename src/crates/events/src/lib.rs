//! Canonical event record, tag classification and bounded-channel emission
//! for the orchestration runtime's event streaming core (spec §3.1–§3.2,
//! §4.1).

pub mod actions;
pub mod ctx;
pub mod emitter;
pub mod error;
pub mod event;
pub mod response;
pub mod tag;

pub use actions::Actions;
pub use ctx::InvocationContext;
pub use emitter::EventSink;
pub use error::{EventError, Result};
pub use event::{event_filter, Event, EVENT_VERSION_CURRENT, EVENT_VERSION_INITIAL};
pub use response::{Choice, ModelErrorPayload, ModelResponse, ResponseKind, Usage};
pub use tag::{classify_reasoning_tag, TagString, TAG_REASONING_FINAL, TAG_REASONING_TOOL, TAG_REASONING_UNKNOWN};

/// Reserved `state_delta` key under which the graph engine's per-step
/// structural metadata is carried (spec §4.3.2).
pub const PREGEL_STEP_META_KEY: &str = "_pregel_step_meta";
