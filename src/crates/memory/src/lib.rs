//! Memory service contract, pluggable memory tools and the auto-memory
//! extraction worker (spec §3.4, §4.4, §6.2).

pub mod error;
pub mod model;
pub mod service;
pub mod tools;
pub mod worker;

pub use error::{MemoryError, Result};
pub use model::{memory_id, MemoryEntry, MemoryKey, UserKey};
pub use service::{InMemoryMemoryService, MemoryMatch, MemoryService};
pub use tools::{
    default_tools, instruction_prompt, AddMemoryTool, ClearMemoryTool, DeleteMemoryTool,
    LoadMemoryTool, SearchMemoryTool, UpdateMemoryTool,
};
pub use worker::{
    AutoMemoryHandle, AutoMemoryJob, AutoMemoryWorker, DisabledAutoMemory, Extractor,
    MemoryOperation, NoopExtractor, WorkerConfig,
};
