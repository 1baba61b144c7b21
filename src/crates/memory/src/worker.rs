//! The auto-memory worker: a bounded queue of extraction jobs drained by N
//! worker fibers, each invoking an LLM extractor and applying the proposed
//! add/update/delete operations against a [`MemoryService`] (spec §4.4).

use crate::error::{MemoryError, Result};
use crate::model::{MemoryEntry, MemoryKey, UserKey};
use crate::service::MemoryService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use events::Event;
use session::{Session, SessionKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tooling::config::{get_env, get_env_parse_or, ConfigBuilder};
use tooling::Result as ToolingResult;
use tracing::{debug, error, info, warn};

/// One operation an extractor proposes against the memory store.
#[derive(Debug, Clone)]
pub enum MemoryOperation {
    Add { memory: String, topics: Vec<String> },
    Update { memory_id: String, memory: String, topics: Vec<String> },
    Delete { memory_id: String },
}

/// Calls an LLM to propose memory operations from the messages seen since
/// the last processed cutoff, given the user's existing memories.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        new_messages: &[Event],
        existing: &[MemoryEntry],
    ) -> Result<Vec<MemoryOperation>>;
}

/// Proposes nothing. Used as a default/test double where no real extractor
/// is wired up, mirroring the `session` crate's `NoopSummarizer`.
pub struct NoopExtractor;

#[async_trait]
impl Extractor for NoopExtractor {
    async fn extract(
        &self,
        _new_messages: &[Event],
        _existing: &[MemoryEntry],
    ) -> Result<Vec<MemoryOperation>> {
        Ok(Vec::new())
    }
}

/// Configuration enumerated in spec §4.4.
#[derive(Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub queue_size: usize,
    pub job_timeout: Duration,
    pub max_existing_memories: usize,
    pub enabled_tools: HashSet<String>,
}

impl Default for WorkerConfig {
    /// `worker_count: 1` — the spec's "typically 1" default, matching the
    /// reference memory/session services' single-writer-per-key bias rather
    /// than a thread pool.
    fn default() -> Self {
        Self {
            worker_count: 1,
            queue_size: 256,
            job_timeout: Duration::from_secs(30),
            max_existing_memories: 50,
            enabled_tools: HashSet::new(),
        }
    }
}

impl ConfigBuilder for WorkerConfig {
    fn validate(&self) -> ToolingResult<()> {
        if self.worker_count == 0 {
            return Err(tooling::ToolingError::General(
                "worker_count must be non-zero".to_string(),
            ));
        }
        if self.queue_size == 0 {
            return Err(tooling::ToolingError::General(
                "queue_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> ToolingResult<Self> {
        let defaults = Self::default();
        let enabled_tools = match get_env(&format!("{prefix}ENABLED_TOOLS"))? {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.enabled_tools.clone(),
        };
        Ok(Self {
            worker_count: get_env_parse_or(&format!("{prefix}WORKER_COUNT"), defaults.worker_count)?,
            queue_size: get_env_parse_or(&format!("{prefix}QUEUE_SIZE"), defaults.queue_size)?,
            job_timeout: Duration::from_secs(get_env_parse_or(
                &format!("{prefix}JOB_TIMEOUT_SECS"),
                defaults.job_timeout.as_secs(),
            )?),
            max_existing_memories: get_env_parse_or(
                &format!("{prefix}MAX_EXISTING_MEMORIES"),
                defaults.max_existing_memories,
            )?,
            enabled_tools,
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        self.worker_count = other.worker_count;
        self.queue_size = other.queue_size;
        self.job_timeout = other.job_timeout;
        self.max_existing_memories = other.max_existing_memories;
        self.enabled_tools = other.enabled_tools;
        self
    }
}

#[cfg(test)]
mod worker_config_tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(WorkerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_worker_count_is_rejected() {
        let mut config = WorkerConfig::default();
        config.worker_count = 0;
        assert!(config.validate().is_err());
    }
}

/// The minimal payload copied at enqueue time: session key, transcript
/// snapshot and the cutoff timestamp of the last event it contains.
#[derive(Debug, Clone)]
pub struct AutoMemoryJob {
    pub session_key: SessionKey,
    pub new_messages: Vec<Event>,
    pub cutoff: DateTime<Utc>,
}

/// Caller-facing handle: enqueue jobs, inspect per-session cutoffs. Cheap to
/// clone; every clone shares the same bounded queue and cutoff map.
#[derive(Clone)]
pub struct AutoMemoryHandle {
    sender: mpsc::Sender<AutoMemoryJob>,
    cutoffs: Arc<RwLock<HashMap<SessionKey, DateTime<Utc>>>>,
}

impl AutoMemoryHandle {
    /// Copies the minimum job payload and enqueues it. Never blocks: a full
    /// queue returns [`MemoryError::Backpressure`] immediately rather than
    /// waiting, and never evicts an already-queued job to make room.
    pub async fn enqueue_job(&self, session: &Session) -> Result<()> {
        let cutoff_before = self.cutoffs.read().await.get(&session.key).copied();
        let new_messages: Vec<Event> = session
            .events
            .iter()
            .filter(|e| cutoff_before.map_or(true, |c| e.timestamp > c))
            .cloned()
            .collect();

        if new_messages.is_empty() {
            return Ok(());
        }

        let cutoff = new_messages
            .iter()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        let job = AutoMemoryJob {
            session_key: session.key.clone(),
            new_messages,
            cutoff,
        };

        self.sender.try_send(job).map_err(|e| {
            let capacity = self.sender.max_capacity();
            match e {
                mpsc::error::TrySendError::Full(_) => MemoryError::Backpressure(capacity),
                mpsc::error::TrySendError::Closed(_) => MemoryError::Backpressure(capacity),
            }
        })
    }

    /// The cutoff currently recorded for `key`, if any job for it has ever
    /// completed.
    pub async fn cutoff_for(&self, key: &SessionKey) -> Option<DateTime<Utc>> {
        self.cutoffs.read().await.get(key).copied()
    }
}

/// A pass-through that no-ops `enqueue_job` — the composition the spec (§4.4,
/// §6.2) prescribes for callers that want to suppress auto-extraction
/// without threading an `enabled: bool` flag through every call site.
#[derive(Clone, Default)]
pub struct DisabledAutoMemory;

impl DisabledAutoMemory {
    pub async fn enqueue_job(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}

async fn session_lock(
    locks: &RwLock<HashMap<SessionKey, Arc<Mutex<()>>>>,
    key: &SessionKey,
) -> Arc<Mutex<()>> {
    if let Some(lock) = locks.read().await.get(key) {
        return lock.clone();
    }
    let mut locks = locks.write().await;
    locks
        .entry(key.clone())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

async fn run_job(
    job: AutoMemoryJob,
    memory_service: &Arc<dyn MemoryService>,
    extractor: &Arc<dyn Extractor>,
    config: &WorkerConfig,
    session_locks: &RwLock<HashMap<SessionKey, Arc<Mutex<()>>>>,
    cutoffs: &RwLock<HashMap<SessionKey, DateTime<Utc>>>,
) {
    // Serializes jobs for the same session so enqueue order is preserved
    // even when `worker_count > 1` lets unrelated sessions run concurrently.
    let lock = session_lock(session_locks, &job.session_key).await;
    let _guard = lock.lock().await;

    let user = UserKey::new(job.session_key.app_name.clone(), job.session_key.user_id.clone());

    let outcome = tooling::async_utils::timeout::with_timeout(config.job_timeout, async {
        let existing = memory_service
            .read(&user, config.max_existing_memories)
            .await?;
        extractor.extract(&job.new_messages, &existing).await
    })
    .await;

    let operations = match outcome {
        Ok(ops) => ops,
        Err(tooling::async_utils::timeout::TimeoutError::Timeout(_)) => {
            error!(
                session = %job.session_key.session_id,
                "auto-memory job timed out after {:?}",
                config.job_timeout
            );
            return;
        }
        Err(tooling::async_utils::timeout::TimeoutError::OperationFailed(e)) => {
            error!(session = %job.session_key.session_id, error = %e, "auto-memory extraction failed");
            return;
        }
    };

    for op in operations {
        let result = match op {
            MemoryOperation::Add { memory, topics } => {
                memory_service.add(&user, memory, topics).await.map(|_| ())
            }
            MemoryOperation::Update {
                memory_id,
                memory,
                topics,
            } => {
                let key = MemoryKey {
                    app_name: user.app_name.clone(),
                    user_id: user.user_id.clone(),
                    memory_id,
                };
                memory_service.update(&key, memory, topics).await.map(|_| ())
            }
            MemoryOperation::Delete { memory_id } => {
                let key = MemoryKey {
                    app_name: user.app_name.clone(),
                    user_id: user.user_id.clone(),
                    memory_id,
                };
                memory_service.delete(&key).await
            }
        };
        // Spec §4.4: "errors for one operation do not abort the job."
        if let Err(e) = result {
            warn!(session = %job.session_key.session_id, error = %e, "auto-memory operation failed, continuing");
        }
    }

    cutoffs
        .write()
        .await
        .insert(job.session_key.clone(), job.cutoff);
    debug!(session = %job.session_key.session_id, cutoff = %job.cutoff, "auto-memory job completed");
}

/// Owns the worker pool. `handle()` returns the cloneable enqueue-side;
/// dropping the worker does not stop it — call [`AutoMemoryWorker::stop`]
/// explicitly.
pub struct AutoMemoryWorker {
    handle: AutoMemoryHandle,
    stop: CancellationToken,
    drain_deadline: Arc<Mutex<Option<Instant>>>,
    workers: Vec<JoinHandle<()>>,
}

impl AutoMemoryWorker {
    pub fn start(
        config: WorkerConfig,
        memory_service: Arc<dyn MemoryService>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let session_locks: Arc<RwLock<HashMap<SessionKey, Arc<Mutex<()>>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let cutoffs: Arc<RwLock<HashMap<SessionKey, DateTime<Utc>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let stop = CancellationToken::new();
        let drain_deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let worker_count = config.worker_count.max(1);
        let config = Arc::new(config);

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let memory_service = memory_service.clone();
            let extractor = extractor.clone();
            let session_locks = session_locks.clone();
            let cutoffs = cutoffs.clone();
            let config = config.clone();
            let stop = stop.clone();
            let drain_deadline = drain_deadline.clone();

            workers.push(tokio::spawn(async move {
                info!(worker_id, "auto-memory worker started");
                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        tokio::select! {
                            biased;
                            _ = stop.cancelled() => None,
                            maybe = rx.recv() => maybe,
                        }
                    };
                    match job {
                        Some(job) => {
                            run_job(job, &memory_service, &extractor, &config, &session_locks, &cutoffs)
                                .await
                        }
                        None => break,
                    }
                }

                // Best-effort drain: keep taking whatever is already queued
                // until the deadline `stop()` recorded, then exit.
                let deadline = *drain_deadline.lock().await;
                if let Some(deadline) = deadline {
                    while Instant::now() < deadline {
                        let maybe = receiver.lock().await.try_recv();
                        match maybe {
                            Ok(job) => {
                                run_job(job, &memory_service, &extractor, &config, &session_locks, &cutoffs)
                                    .await
                            }
                            Err(_) => break,
                        }
                    }
                }
                info!(worker_id, "auto-memory worker stopped");
            }));
        }

        Self {
            handle: AutoMemoryHandle { sender, cutoffs },
            stop,
            drain_deadline,
            workers,
        }
    }

    pub fn handle(&self) -> AutoMemoryHandle {
        self.handle.clone()
    }

    /// Signals every worker to stop accepting new work, gives them up to
    /// `deadline` to drain whatever is already queued, then joins them.
    pub async fn stop(self, deadline: Duration) {
        *self.drain_deadline.lock().await = Some(Instant::now() + deadline);
        self.stop.cancel();
        for worker in self.workers {
            let _ = tokio::time::timeout(deadline + Duration::from_millis(50), worker).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryMemoryService;

    fn session_with_events(key: SessionKey, texts: &[&str]) -> Session {
        let mut session = Session::new(key);
        for text in texts {
            let event = Event::new("inv-1", "user").with_state_delta("text", text.as_bytes().to_vec());
            session.events.push(event);
        }
        session
    }

    struct EchoExtractor;

    #[async_trait]
    impl Extractor for EchoExtractor {
        async fn extract(
            &self,
            new_messages: &[Event],
            _existing: &[MemoryEntry],
        ) -> Result<Vec<MemoryOperation>> {
            Ok(new_messages
                .iter()
                .map(|e| MemoryOperation::Add {
                    memory: e.id.clone(),
                    topics: vec![],
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn enqueue_then_worker_applies_add_operations() {
        let memory_service: Arc<dyn MemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let worker = AutoMemoryWorker::start(
            WorkerConfig::default(),
            memory_service.clone(),
            Arc::new(EchoExtractor),
        );
        let handle = worker.handle();

        let key = SessionKey::new("app", "u1", "s1");
        let session = session_with_events(key.clone(), &["hi", "there"]);
        handle.enqueue_job(&session).await.unwrap();

        // Give the worker a moment to drain the one job.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let user = UserKey::new("app", "u1");
        let entries = memory_service.read(&user, 10).await.unwrap();
        assert_eq!(entries.len(), 2);

        worker.stop(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn enqueue_with_no_new_events_is_a_noop() {
        let memory_service: Arc<dyn MemoryService> = Arc::new(InMemoryMemoryService::new(50));
        let worker = AutoMemoryWorker::start(
            WorkerConfig::default(),
            memory_service.clone(),
            Arc::new(NoopExtractor),
        );
        let handle = worker.handle();
        let session = Session::new(SessionKey::new("app", "u1", "s1"));
        handle.enqueue_job(&session).await.unwrap();
        worker.stop(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn disabled_auto_memory_never_enqueues() {
        let disabled = DisabledAutoMemory;
        let session = session_with_events(SessionKey::new("app", "u1", "s1"), &["hi"]);
        disabled.enqueue_job(&session).await.unwrap();
    }

    #[tokio::test]
    async fn backpressure_does_not_drop_an_already_queued_job() {
        // A queue of size 1 with no worker draining it: the first enqueue
        // succeeds and occupies the slot, the second must bounce off
        // backpressure without evicting the first.
        let (sender, mut receiver) = mpsc::channel(1);
        let cutoffs = Arc::new(RwLock::new(HashMap::new()));
        let handle = AutoMemoryHandle { sender, cutoffs };

        let key = SessionKey::new("app", "u1", "s1");
        let first = session_with_events(key.clone(), &["one"]);
        handle.enqueue_job(&first).await.unwrap();

        let second = session_with_events(key, &["one", "two"]);
        let err = handle.enqueue_job(&second).await.unwrap_err();
        assert!(matches!(err, MemoryError::Backpressure(_)));

        let still_queued = receiver.try_recv().unwrap();
        assert_eq!(still_queued.new_messages.len(), 1);
    }
}
