//! Worker-Pool Task Pipeline.
//!
//! One free-text request runs through five strictly sequential stages
//! (plan → collect → analyze → execute → verify), each on a worker leased from the typed pool.
//! Failures abort the whole request into an error [`TaskResult`] that keeps the steps recorded
//! so far. Requests are never retried.

pub mod pool;
pub mod stages;

pub use pool::{AcquirePolicy, Worker, WorkerLease, WorkerPool};
pub use stages::{
    Analysis, Analyzer, CollectedData, Collector, DataItem, ExecutionOutcome, Executor, Insight, Plan,
    PlanStep, Planner, SimulatedWorkforce, StageFailure, StageHandlers, StageOutput, Verification, Verifier,
};

use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::shorthand::{log_short, ShortLevel};

// ---------------------------------------------------------------------------
// Roles, stages, status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Processor,
    Collector,
    Analyzer,
    Executor,
    Monitor,
}

impl WorkerRole {
    pub const ALL: [WorkerRole; 5] = [
        WorkerRole::Processor,
        WorkerRole::Collector,
        WorkerRole::Analyzer,
        WorkerRole::Executor,
        WorkerRole::Monitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Processor => "processor",
            WorkerRole::Collector => "collector",
            WorkerRole::Analyzer => "analyzer",
            WorkerRole::Executor => "executor",
            WorkerRole::Monitor => "monitor",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage actions, each bound to exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Collect,
    Analyze,
    Execute,
    Verify,
}

impl Stage {
    pub fn role(&self) -> WorkerRole {
        match self {
            Stage::Plan => WorkerRole::Processor,
            Stage::Collect => WorkerRole::Collector,
            Stage::Analyze => WorkerRole::Analyzer,
            Stage::Execute => WorkerRole::Executor,
            Stage::Verify => WorkerRole::Monitor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Collect => "collect",
            Stage::Analyze => "analyze",
            Stage::Execute => "execute",
            Stage::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request lifecycle. Moves one step forward at a time, or to `Error` from any live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Planned,
    Collected,
    Analyzed,
    Completed,
    Error,
}

impl TaskStatus {
    fn next(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Created => Some(TaskStatus::Planned),
            TaskStatus::Planned => Some(TaskStatus::Collected),
            TaskStatus::Collected => Some(TaskStatus::Analyzed),
            TaskStatus::Analyzed => Some(TaskStatus::Completed),
            TaskStatus::Completed | TaskStatus::Error => None,
        }
    }

    pub fn can_transition(&self, to: TaskStatus) -> bool {
        match to {
            TaskStatus::Error => *self != TaskStatus::Error,
            _ => self.next() == Some(to),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Planned => "planned",
            TaskStatus::Collected => "collected",
            TaskStatus::Analyzed => "analyzed",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub worker_id: String,
    pub role: WorkerRole,
    pub stage: Stage,
    pub input: Value,
    pub output: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A request in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub id: String,
    pub request: String,
    pub context: Value,
    pub status: TaskStatus,
    pub steps: Vec<StepResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRequest {
    fn new(id: String, request: &str, context: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            request: request.to_string(),
            context,
            status: TaskStatus::Created,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to` if the lifecycle allows it.
    pub fn advance(&mut self, to: TaskStatus) -> PipelineResult<()> {
        if !self.status.can_transition(to) {
            return Err(PipelineError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Error,
}

/// Terminal record stored in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: String,
    pub request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: TaskOutcome,
    /// Lifecycle state the request ended in.
    pub final_status: TaskStatus,
    pub steps: Vec<StepResult>,
    pub execution_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskOutcome::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Initializing,
    Ready,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub status: CoordinatorState,
    pub active_request_count: usize,
    pub completed_task_count: usize,
    pub worker_count: usize,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Removes a request from the active map however `process_request` exits.
struct ActiveEntry<'a> {
    active: &'a DashMap<String, TaskRequest>,
    id: String,
}

impl Drop for ActiveEntry<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

/// Runs requests through the pool. Construct one per process and share it.
pub struct TaskCoordinator {
    pool: WorkerPool,
    handlers: StageHandlers,
    active: DashMap<String, TaskRequest>,
    history: RwLock<Vec<TaskResult>>,
    state: RwLock<CoordinatorState>,
    history_limit: usize,
}

impl TaskCoordinator {
    pub fn new(config: &PipelineConfig) -> Self {
        let handlers = StageHandlers::simulated(Duration::from_millis(config.simulated_latency_ms), config.seed);
        Self::with_handlers(config, handlers)
    }

    pub fn with_handlers(config: &PipelineConfig, handlers: StageHandlers) -> Self {
        let coordinator = Self {
            pool: WorkerPool::from_config(config),
            handlers,
            active: DashMap::new(),
            history: RwLock::new(Vec::new()),
            state: RwLock::new(CoordinatorState::Initializing),
            history_limit: config.history_limit,
        };
        coordinator.set_state(CoordinatorState::Ready);
        log_short(
            ShortLevel::Info,
            &format!("task pipeline initialized with {} workers", coordinator.pool.len()),
        );
        coordinator
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Hold a worker of `role` outside any request, under the pool's policy.
    pub async fn try_acquire(&self, role: WorkerRole) -> PipelineResult<WorkerLease> {
        self.pool.acquire(role).await
    }

    /// Default `limit` for [`TaskCoordinator::task_history`].
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Run `request` through all five stages.
    pub async fn process_request(&self, request: &str, context: Option<Value>) -> TaskResult {
        let id = format!("req-{}", uuid::Uuid::new_v4().simple());
        let clock = Instant::now();
        let mut task = TaskRequest::new(id.clone(), request, context.unwrap_or_else(|| json!({})));
        let started_at = task.created_at;

        self.active.insert(id.clone(), task.clone());
        let _entry = ActiveEntry {
            active: &self.active,
            id: id.clone(),
        };
        info!(target: "lyra::pipeline", request_id = %id, "processing request");

        let outcome = self.run_stages(&mut task).await;

        let finished_at = Utc::now();
        let execution_time_ms = clock.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok((result, verification)) => {
                log_short(ShortLevel::Info, &format!("request {} completed", id));
                TaskResult {
                    id: id.clone(),
                    request: request.to_string(),
                    result: Some(result),
                    verification: Some(verification),
                    error: None,
                    status: TaskOutcome::Success,
                    final_status: task.status,
                    steps: std::mem::take(&mut task.steps),
                    execution_time_ms,
                    started_at,
                    finished_at,
                }
            }
            Err(e) => {
                // error is reachable from every live state
                if task.status != TaskStatus::Error {
                    task.status = TaskStatus::Error;
                    task.updated_at = finished_at;
                }
                log_short(ShortLevel::Error, &format!("request {} failed: {}", id, e));
                TaskResult {
                    id: id.clone(),
                    request: request.to_string(),
                    result: None,
                    verification: None,
                    error: Some(e.to_string()),
                    status: TaskOutcome::Error,
                    final_status: task.status,
                    steps: std::mem::take(&mut task.steps),
                    execution_time_ms,
                    started_at,
                    finished_at,
                }
            }
        };

        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(result.clone());
        drop(_entry);

        debug!(
            target: "lyra::pipeline",
            request_id = %id,
            status = ?result.status,
            steps = result.steps.len(),
            elapsed_ms = result.execution_time_ms,
            "request recorded"
        );
        result
    }

    async fn run_stages(&self, task: &mut TaskRequest) -> PipelineResult<(ExecutionOutcome, Verification)> {
        let h = &self.handlers;
        let request = task.request.clone();
        let context = task.context.clone();

        let plan = self
            .run_stage(task, Stage::Plan, json!({ "request": request, "context": context }), |w| {
                let (request, context) = (&request, &context);
                async move { h.planner.plan(&w, request, context).await }
            })
            .await?;
        self.advance(task, TaskStatus::Planned)?;

        let data = self
            .run_stage(task, Stage::Collect, json!({ "plan": plan, "context": context }), |w| {
                let (plan, context) = (&plan, &context);
                async move { h.collector.collect(&w, plan, context).await }
            })
            .await?;
        self.advance(task, TaskStatus::Collected)?;

        let analysis = self
            .run_stage(task, Stage::Analyze, json!({ "plan": plan, "data": data }), |w| {
                let (plan, data) = (&plan, &data);
                async move { h.analyzer.analyze(&w, plan, data).await }
            })
            .await?;
        self.advance(task, TaskStatus::Analyzed)?;

        let input = json!({ "plan": plan, "data": data, "analysis": analysis });
        let result = self
            .run_stage(task, Stage::Execute, input, |w| {
                let (plan, data, analysis) = (&plan, &data, &analysis);
                async move { h.executor.execute(&w, plan, data, analysis).await }
            })
            .await?;
        self.advance(task, TaskStatus::Completed)?;

        let verification = self
            .run_stage(task, Stage::Verify, json!({ "result": result, "request": request }), |w| {
                let (request, result) = (&request, &result);
                async move { h.verifier.verify(&w, request, result).await }
            })
            .await?;

        Ok((result, verification))
    }

    /// Lease a worker for `stage`, run `call`, record the step, release the worker.
    async fn run_stage<T, F, Fut>(
        &self,
        task: &mut TaskRequest,
        stage: Stage,
        input: Value,
        call: F,
    ) -> PipelineResult<T>
    where
        T: Serialize,
        F: FnOnce(Arc<Worker>) -> Fut,
        Fut: Future<Output = StageOutput<T>>,
    {
        let lease = self.pool.acquire(stage.role()).await?;
        let worker = Arc::clone(lease.worker());
        let started_at = Utc::now();
        debug!(target: "lyra::pipeline", request_id = %task.id, worker = %worker.id(), %stage, "stage started");

        let output = call(Arc::clone(&worker)).await;
        let finished_at = Utc::now();
        drop(lease);

        let step = |status, output, error| StepResult {
            worker_id: worker.id().to_string(),
            role: worker.role(),
            stage,
            input,
            output,
            started_at,
            finished_at,
            status,
            error,
        };

        match output {
            Ok(value) => {
                let recorded = serde_json::to_value(&value).unwrap_or(Value::Null);
                task.steps.push(step(StepStatus::Success, Some(recorded), None));
                self.sync_active(task);
                Ok(value)
            }
            Err(failure) => {
                warn!(target: "lyra::pipeline", request_id = %task.id, worker = %worker.id(), %stage, error = %failure, "stage failed");
                task.steps.push(step(StepStatus::Error, None, Some(failure.to_string())));
                Err(PipelineError::StageExecutionFailure {
                    stage,
                    worker: worker.id().to_string(),
                    reason: failure.0,
                })
            }
        }
    }

    fn advance(&self, task: &mut TaskRequest, to: TaskStatus) -> PipelineResult<()> {
        task.advance(to)?;
        self.sync_active(task);
        Ok(())
    }

    fn sync_active(&self, task: &TaskRequest) {
        if let Some(mut entry) = self.active.get_mut(&task.id) {
            *entry = task.clone();
        }
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Busy whenever the active map is non-empty; derived from one read of it.
    pub fn status(&self) -> CoordinatorStatus {
        let active_request_count = self.active.len();
        let status = match *self.state.read().unwrap_or_else(|e| e.into_inner()) {
            CoordinatorState::Initializing => CoordinatorState::Initializing,
            _ if active_request_count > 0 => CoordinatorState::Busy,
            _ => CoordinatorState::Ready,
        };
        CoordinatorStatus {
            status,
            active_request_count,
            completed_task_count: self.history.read().unwrap_or_else(|e| e.into_inner()).len(),
            worker_count: self.pool.len(),
        }
    }

    /// Snapshot of requests currently in flight.
    pub fn active_requests(&self) -> Vec<TaskRequest> {
        self.active.iter().map(|e| e.value().clone()).collect()
    }

    /// Most recently finished first, optionally filtered by outcome.
    pub fn task_history(&self, limit: usize, filter: Option<TaskOutcome>) -> Vec<TaskResult> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        let mut selected: Vec<TaskResult> = history
            .iter()
            .rev()
            .filter(|r| filter.map_or(true, |f| r.status == f))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        selected.truncate(limit);
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_one_step_at_a_time() {
        assert!(TaskStatus::Created.can_transition(TaskStatus::Planned));
        assert!(!TaskStatus::Created.can_transition(TaskStatus::Collected));
        assert!(!TaskStatus::Analyzed.can_transition(TaskStatus::Planned));
        assert!(!TaskStatus::Completed.can_transition(TaskStatus::Created));
    }

    #[test]
    fn error_is_reachable_from_every_live_state() {
        for status in [
            TaskStatus::Created,
            TaskStatus::Planned,
            TaskStatus::Collected,
            TaskStatus::Analyzed,
            TaskStatus::Completed,
        ] {
            assert!(status.can_transition(TaskStatus::Error), "{status}");
        }
        assert!(!TaskStatus::Error.can_transition(TaskStatus::Error));
        assert!(!TaskStatus::Error.can_transition(TaskStatus::Planned));
    }

    #[test]
    fn advance_rejects_regression() {
        let mut task = TaskRequest::new("req-1".into(), "hello", json!({}));
        task.advance(TaskStatus::Planned).unwrap();
        let err = task.advance(TaskStatus::Created).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidTransition {
                from: TaskStatus::Planned,
                to: TaskStatus::Created
            }
        );
        assert_eq!(task.status, TaskStatus::Planned);
    }

    #[test]
    fn every_stage_maps_to_a_distinct_role() {
        let stages = [Stage::Plan, Stage::Collect, Stage::Analyze, Stage::Execute, Stage::Verify];
        let roles: Vec<WorkerRole> = stages.iter().map(Stage::role).collect();
        assert_eq!(roles, WorkerRole::ALL.to_vec());
    }
}
