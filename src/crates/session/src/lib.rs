//! Session service contract: per-`(app, user, session)` event log, named
//! state tiers, per-filter-key summaries and track side-channels
//! (spec §3.3, §6.1, §4.7).

pub mod error;
pub mod hooks;
pub mod model;
pub mod service;
pub mod summarizer;

pub use error::{Result, SessionError};
pub use hooks::{AppendEventHook, AppendEventHookChain};
pub use model::{Session, SessionKey, SessionSummary, TrackEvent};
pub use service::{InMemorySessionService, SessionService, StateScope, TrackService};
pub use summarizer::{summarize_group, NoopSummarizer, Summarizer};
