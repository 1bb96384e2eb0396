//! Task pipeline: stage sequencing, worker release, fail-fast acquisition and history.
//!
//! Run with: `cargo test -p lyra-core --test pipeline_test`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use lyra_core::pipeline::{
    CollectedData, Collector, ExecutionOutcome, Plan, StageFailure, StageOutput, Verification, Verifier, Worker,
};
use lyra_core::{
    CoordinatorState, PipelineConfig, Stage, StageHandlers, StepStatus, TaskCoordinator, TaskOutcome, TaskStatus,
    WorkerRole,
};

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        simulated_latency_ms: 0,
        ..PipelineConfig::default()
    }
}

fn coordinator() -> TaskCoordinator {
    TaskCoordinator::with_handlers(&fast_config(), StageHandlers::simulated(Duration::ZERO, Some(11)))
}

struct BrokenCollector;

#[async_trait]
impl Collector for BrokenCollector {
    async fn collect(&self, _worker: &Worker, _plan: &Plan, _context: &Value) -> StageOutput<CollectedData> {
        Err(StageFailure::new("upstream source unreachable"))
    }
}

struct RejectingVerifier;

#[async_trait]
impl Verifier for RejectingVerifier {
    async fn verify(&self, _worker: &Worker, _request: &str, _result: &ExecutionOutcome) -> StageOutput<Verification> {
        Err(StageFailure::new("output failed validation"))
    }
}

fn assert_all_workers_available(coordinator: &TaskCoordinator) {
    for worker in coordinator.pool().workers() {
        assert!(worker.is_available(), "{} left unavailable", worker.id());
    }
    for role in WorkerRole::ALL {
        let expected = coordinator.pool().workers().iter().filter(|w| w.role() == role).count();
        assert_eq!(coordinator.pool().available(role), expected);
    }
}

#[tokio::test]
async fn test_request_runs_all_five_stages() {
    let coordinator = coordinator();
    assert_eq!(coordinator.status().status, CoordinatorState::Ready);
    assert_eq!(coordinator.status().worker_count, 10);

    let result = coordinator
        .process_request("optimize my workflow", Some(json!({ "user": "u1" })))
        .await;

    assert!(result.is_success());
    assert_eq!(result.final_status, TaskStatus::Completed);
    let stages: Vec<Stage> = result.steps.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec![Stage::Plan, Stage::Collect, Stage::Analyze, Stage::Execute, Stage::Verify]
    );
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Success));
    assert!(result.result.as_ref().map_or(false, |r| r.success));
    assert_eq!(result.verification.as_ref().map(|v| v.quality_score), Some(0.94));
    assert!(result.error.is_none());

    // a stage never starts before the previous one finished
    for pair in result.steps.windows(2) {
        assert!(pair[0].finished_at <= pair[1].started_at);
    }

    assert_all_workers_available(&coordinator);
    let status = coordinator.status();
    assert_eq!(status.status, CoordinatorState::Ready);
    assert_eq!(status.active_request_count, 0);
    assert_eq!(status.completed_task_count, 1);
}

#[tokio::test]
async fn test_request_fails_fast_when_collectors_are_busy() {
    let coordinator = coordinator();
    let _first = coordinator.try_acquire(WorkerRole::Collector).await.expect("collector-1");
    let _second = coordinator.try_acquire(WorkerRole::Collector).await.expect("collector-2");

    let result = coordinator.process_request("summarize activity", None).await;

    assert_eq!(result.status, TaskOutcome::Error);
    assert_eq!(result.final_status, TaskStatus::Error);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].stage, Stage::Plan);
    assert!(result.error.as_deref().unwrap_or_default().contains("collector"));

    // the planner that did run was released
    assert_eq!(coordinator.pool().available(WorkerRole::Processor), 3);
}

#[tokio::test]
async fn test_failed_stage_is_recorded_and_worker_released() {
    let mut handlers = StageHandlers::simulated(Duration::ZERO, Some(3));
    handlers.collector = Arc::new(BrokenCollector);
    let coordinator = TaskCoordinator::with_handlers(&fast_config(), handlers);

    let result = coordinator.process_request("gather metrics", None).await;

    assert!(!result.is_success());
    assert_eq!(result.steps.len(), 2);
    let failed = &result.steps[1];
    assert_eq!(failed.stage, Stage::Collect);
    assert_eq!(failed.status, StepStatus::Error);
    assert_eq!(failed.error.as_deref(), Some("upstream source unreachable"));
    assert!(failed.output.is_none());
    assert!(result.error.as_deref().unwrap_or_default().contains("upstream source unreachable"));

    assert_all_workers_available(&coordinator);
}

#[tokio::test]
async fn test_verification_failure_marks_request_error() {
    let mut handlers = StageHandlers::simulated(Duration::ZERO, None);
    handlers.verifier = Arc::new(RejectingVerifier);
    let coordinator = TaskCoordinator::with_handlers(&fast_config(), handlers);

    let result = coordinator.process_request("draft a plan", None).await;

    assert_eq!(result.status, TaskOutcome::Error);
    assert_eq!(result.final_status, TaskStatus::Error);
    assert!(result.result.is_none());
    assert_eq!(result.steps.len(), 5);
    assert_eq!(result.steps[4].status, StepStatus::Error);
    assert_all_workers_available(&coordinator);
}

#[tokio::test]
async fn test_concurrent_requests_release_every_worker() {
    let coordinator = Arc::new(TaskCoordinator::with_handlers(
        &fast_config(),
        StageHandlers::simulated(Duration::from_millis(5), Some(9)),
    ));

    let runs: Vec<_> = (0..6)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.process_request(&format!("request {}", i), None).await })
        })
        .collect();
    for run in runs {
        run.await.expect("request task");
    }

    assert_all_workers_available(&coordinator);
    assert_eq!(coordinator.status().completed_task_count, 6);
    assert!(coordinator.active_requests().is_empty());
    assert_eq!(coordinator.status().status, CoordinatorState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_status_is_busy_exactly_while_requests_are_active() {
    let coordinator = Arc::new(TaskCoordinator::with_handlers(
        &fast_config(),
        StageHandlers::simulated(Duration::from_millis(3), Some(5)),
    ));

    let runs: Vec<_> = (0..24)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.process_request(&format!("request {}", i), None).await })
        })
        .collect();

    while !runs.iter().all(|r| r.is_finished()) {
        let status = coordinator.status();
        let expected = if status.active_request_count > 0 {
            CoordinatorState::Busy
        } else {
            CoordinatorState::Ready
        };
        assert_eq!(status.status, expected);
        tokio::task::yield_now().await;
    }
    for run in runs {
        run.await.expect("request task");
    }
    assert_eq!(coordinator.status().status, CoordinatorState::Ready);
}

#[tokio::test]
async fn test_status_stays_busy_while_a_request_waits_for_a_worker() {
    let config = PipelineConfig {
        acquire_timeout_ms: Some(60_000),
        ..fast_config()
    };
    let coordinator = Arc::new(TaskCoordinator::with_handlers(
        &config,
        StageHandlers::simulated(Duration::ZERO, Some(2)),
    ));
    let held = coordinator.try_acquire(WorkerRole::Monitor).await.expect("monitor lease");

    let pending = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.process_request("held request", None).await })
    };
    while coordinator.active_requests().first().map(|r| r.status) != Some(TaskStatus::Completed) {
        tokio::task::yield_now().await;
    }
    let status = coordinator.status();
    assert_eq!(status.status, CoordinatorState::Busy);
    assert_eq!(status.active_request_count, 1);

    drop(held);
    let result = pending.await.expect("request task");
    assert!(result.is_success());
    assert_eq!(coordinator.status().status, CoordinatorState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_seeded_coordinators_take_identical_time() {
    let config = PipelineConfig {
        simulated_latency_ms: 50,
        seed: Some(21),
        ..PipelineConfig::default()
    };

    let mut elapsed = Vec::new();
    for _ in 0..2 {
        let coordinator = TaskCoordinator::new(&config);
        let started = tokio::time::Instant::now();
        let result = coordinator.process_request("plan my week", None).await;
        assert!(result.is_success());
        elapsed.push(started.elapsed());
    }
    assert_eq!(elapsed[0], elapsed[1]);
}

#[tokio::test]
async fn test_history_is_newest_first_and_filterable() {
    let mut handlers = StageHandlers::simulated(Duration::ZERO, None);
    handlers.collector = Arc::new(BrokenCollector);
    let failing = TaskCoordinator::with_handlers(&fast_config(), handlers);
    failing.process_request("will fail", None).await;

    let coordinator = coordinator();
    let first = coordinator.process_request("first", None).await;
    let _busy = coordinator.try_acquire(WorkerRole::Monitor).await.expect("monitor lease");
    let second = coordinator.process_request("second", None).await;
    drop(_busy);
    let third = coordinator.process_request("third", None).await;

    let history = coordinator.task_history(10, None);
    let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

    let errors = coordinator.task_history(10, Some(TaskOutcome::Error));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].id, second.id);

    let limited = coordinator.task_history(1, Some(TaskOutcome::Success));
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, third.id);

    assert_eq!(failing.task_history(failing.history_limit(), None).len(), 1);
}
