//! Typed worker pool.
//!
//! Each role owns a semaphore sized to its worker count and a FIFO queue of idle workers, so
//! consecutive acquisitions rotate through the role. A [`WorkerLease`] holds the permit and the
//! worker; dropping it puts the worker back at the end of the queue and restores availability.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::WorkerRole;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// What a stage does when no worker of its role is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquirePolicy {
    /// Fail the request immediately.
    #[default]
    FailFast,
    /// Wait up to the given duration, then fail.
    Bounded(Duration),
}

impl AcquirePolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.acquire_timeout_ms {
            Some(ms) => AcquirePolicy::Bounded(Duration::from_millis(ms)),
            None => AcquirePolicy::FailFast,
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// A pool worker with a fixed role.
pub struct Worker {
    id: String,
    role: WorkerRole,
    knowledge: Value,
    available: AtomicBool,
    tasks_served: AtomicU64,
}

impl Worker {
    pub fn new(id: impl Into<String>, role: WorkerRole) -> Self {
        Self {
            id: id.into(),
            role,
            knowledge: role_knowledge(role),
            available: AtomicBool::new(true),
            tasks_served: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> WorkerRole {
        self.role
    }

    pub fn knowledge(&self) -> &Value {
        &self.knowledge
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn tasks_served(&self) -> u64 {
        self.tasks_served.load(Ordering::Relaxed)
    }

    pub(crate) fn record_task(&self) {
        self.tasks_served.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("available", &self.is_available())
            .finish()
    }
}

fn role_knowledge(role: WorkerRole) -> Value {
    match role {
        WorkerRole::Processor => json!({
            "planning": {
                "strategies": ["sequential", "parallel", "divide-and-conquer"],
                "prioritization": ["criticality", "dependency", "complexity"]
            }
        }),
        WorkerRole::Collector => json!({
            "data_sources": ["internal", "external", "cached", "computed"],
            "data_formats": ["json", "text", "structured", "unstructured"]
        }),
        WorkerRole::Analyzer => json!({
            "analysis_techniques": ["pattern-matching", "statistical", "ml-based"],
            "insight_types": ["trend", "anomaly", "correlation", "causation"]
        }),
        WorkerRole::Executor => json!({
            "execution_strategies": ["immediate", "staged", "conditional"],
            "verification_methods": ["success-criteria", "output-validation", "side-effect-check"]
        }),
        WorkerRole::Monitor => json!({
            "monitoring_metrics": ["success-rate", "execution-time", "resource-usage"],
            "alert_thresholds": { "critical": 0.9, "warning": 0.7, "info": 0.5 }
        }),
    }
}

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

type IdleQueue = Arc<Mutex<VecDeque<Arc<Worker>>>>;

/// Exclusive hold on one worker. Released on drop.
pub struct WorkerLease {
    worker: Arc<Worker>,
    idle: IdleQueue,
    _permit: OwnedSemaphorePermit,
}

impl WorkerLease {
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        // requeue before the permit is released so a new permit holder always finds a worker
        self.worker.available.store(true, Ordering::Release);
        self.idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Arc::clone(&self.worker));
        debug!(target: "lyra::pipeline", worker = %self.worker.id, "worker released");
    }
}

impl fmt::Debug for WorkerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLease").field("worker", &self.worker.id).finish()
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

struct RoleQueue {
    permits: Arc<Semaphore>,
    idle: IdleQueue,
}

/// Fixed-size pool of typed workers.
pub struct WorkerPool {
    queues: HashMap<WorkerRole, RoleQueue>,
    workers: Vec<Arc<Worker>>,
    policy: AcquirePolicy,
}

impl WorkerPool {
    /// Build `counts[role]` workers per role, named `<role>-<n>`.
    pub fn new(counts: &BTreeMap<WorkerRole, usize>, policy: AcquirePolicy) -> Self {
        let mut queues = HashMap::new();
        let mut workers = Vec::new();

        for role in WorkerRole::ALL {
            let count = counts.get(&role).copied().unwrap_or(0);
            let members: VecDeque<Arc<Worker>> = (1..=count)
                .map(|n| Arc::new(Worker::new(format!("{}-{}", role, n), role)))
                .collect();
            workers.extend(members.iter().cloned());
            queues.insert(
                role,
                RoleQueue {
                    permits: Arc::new(Semaphore::new(count)),
                    idle: Arc::new(Mutex::new(members)),
                },
            );
        }

        debug!(target: "lyra::pipeline", workers = workers.len(), ?policy, "worker pool built");
        Self { queues, workers, policy }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let counts = BTreeMap::from([
            (WorkerRole::Processor, config.processors),
            (WorkerRole::Collector, config.collectors),
            (WorkerRole::Analyzer, config.analyzers),
            (WorkerRole::Executor, config.executors),
            (WorkerRole::Monitor, config.monitors),
        ]);
        Self::new(&counts, AcquirePolicy::from_config(config))
    }

    pub fn policy(&self) -> AcquirePolicy {
        self.policy
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Idle workers of `role` right now.
    pub fn available(&self, role: WorkerRole) -> usize {
        self.queues
            .get(&role)
            .map(|q| q.permits.available_permits())
            .unwrap_or(0)
    }

    /// Take an idle worker of `role` according to the pool's policy.
    pub async fn acquire(&self, role: WorkerRole) -> PipelineResult<WorkerLease> {
        let queue = self
            .queues
            .get(&role)
            .ok_or(PipelineError::NoWorkerAvailable { role })?;

        let permit = match self.policy {
            AcquirePolicy::FailFast => Arc::clone(&queue.permits).try_acquire_owned().ok(),
            AcquirePolicy::Bounded(limit) => {
                tokio::time::timeout(limit, Arc::clone(&queue.permits).acquire_owned())
                    .await
                    .ok()
                    .and_then(Result::ok)
            }
        };

        let Some(permit) = permit else {
            warn!(target: "lyra::pipeline", %role, policy = ?self.policy, "no idle worker");
            return Err(PipelineError::NoWorkerAvailable { role });
        };

        let worker = queue
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or(PipelineError::NoWorkerAvailable { role })?;
        worker.available.store(false, Ordering::Release);
        debug!(target: "lyra::pipeline", worker = %worker.id, "worker acquired");

        Ok(WorkerLease {
            worker,
            idle: Arc::clone(&queue.idle),
            _permit: permit,
        })
    }
}
