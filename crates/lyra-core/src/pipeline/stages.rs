//! Stage capabilities: one trait per worker role, plus the simulated default workforce.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::pool::Worker;

/// Error text raised by a stage handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StageFailure(pub String);

impl StageFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub type StageOutput<T> = Result<T, StageFailure>;

// ---------------------------------------------------------------------------
// Stage records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub priority: String,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedData {
    pub collected: bool,
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<String>,
    pub items: Vec<DataItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: String,
    pub confidence: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub insights: Vec<Insight>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub kind: String,
    pub content: String,
    pub additional_resources: Vec<String>,
    pub success: bool,
}

/// Produced by the monitor after execution. Augments the result, never replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub success: bool,
    pub quality_score: f64,
    pub performance_metrics: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Role capabilities
// ---------------------------------------------------------------------------

/// Processor role: turns a request into a plan.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, worker: &Worker, request: &str, context: &Value) -> StageOutput<Plan>;
}

/// Collector role: gathers the data the plan needs.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, worker: &Worker, plan: &Plan, context: &Value) -> StageOutput<CollectedData>;
}

/// Analyzer role.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, worker: &Worker, plan: &Plan, data: &CollectedData) -> StageOutput<Analysis>;
}

/// Executor role.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        worker: &Worker,
        plan: &Plan,
        data: &CollectedData,
        analysis: &Analysis,
    ) -> StageOutput<ExecutionOutcome>;
}

/// Monitor role: checks the final execution output.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, worker: &Worker, request: &str, result: &ExecutionOutcome) -> StageOutput<Verification>;
}

/// The five stage capabilities used by a coordinator.
#[derive(Clone)]
pub struct StageHandlers {
    pub planner: Arc<dyn Planner>,
    pub collector: Arc<dyn Collector>,
    pub analyzer: Arc<dyn Analyzer>,
    pub executor: Arc<dyn Executor>,
    pub verifier: Arc<dyn Verifier>,
}

impl StageHandlers {
    /// Every stage served by one simulated workforce.
    pub fn simulated(max_latency: Duration, seed: Option<u64>) -> Self {
        let workforce = Arc::new(SimulatedWorkforce::new(max_latency, seed));
        Self {
            planner: workforce.clone(),
            collector: workforce.clone(),
            analyzer: workforce.clone(),
            executor: workforce.clone(),
            verifier: workforce,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated workforce
// ---------------------------------------------------------------------------

/// Canned stage outputs after a random delay in `[0, max_latency)`.
pub struct SimulatedWorkforce {
    max_latency: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedWorkforce {
    pub fn new(max_latency: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            max_latency,
            rng: Mutex::new(rng),
        }
    }

    async fn pause(&self, worker: &Worker) {
        worker.record_task();
        let max_ms = self.max_latency.as_millis() as u64;
        if max_ms == 0 {
            return;
        }
        let delay = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(0..max_ms)
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl Planner for SimulatedWorkforce {
    async fn plan(&self, worker: &Worker, _request: &str, _context: &Value) -> StageOutput<Plan> {
        self.pause(worker).await;
        let step = |id: &str, name: &str, description: &str| PlanStep {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        Ok(Plan {
            steps: vec![
                step("step-1", "Gather data", "Collect necessary information"),
                step("step-2", "Process data", "Analyze collected information"),
                step("step-3", "Generate solution", "Create response based on analysis"),
            ],
            priority: "normal".to_string(),
            strategy: "sequential".to_string(),
        })
    }
}

#[async_trait]
impl Collector for SimulatedWorkforce {
    async fn collect(&self, worker: &Worker, _plan: &Plan, _context: &Value) -> StageOutput<CollectedData> {
        self.pause(worker).await;
        Ok(CollectedData {
            collected: true,
            timestamp: Utc::now(),
            sources: vec!["internal-knowledge".to_string(), "user-context".to_string()],
            items: vec![
                DataItem {
                    kind: "user-preference".to_string(),
                    value: "dark-mode".to_string(),
                },
                DataItem {
                    kind: "historical-interaction".to_string(),
                    value: "frequent-user".to_string(),
                },
            ],
        })
    }
}

#[async_trait]
impl Analyzer for SimulatedWorkforce {
    async fn analyze(&self, worker: &Worker, _plan: &Plan, _data: &CollectedData) -> StageOutput<Analysis> {
        self.pause(worker).await;
        Ok(Analysis {
            insights: vec![
                Insight {
                    kind: "preference".to_string(),
                    confidence: 0.92,
                    description: "User prefers concise responses".to_string(),
                },
                Insight {
                    kind: "context".to_string(),
                    confidence: 0.85,
                    description: "Request is related to system optimization".to_string(),
                },
            ],
            recommendation: "Provide optimization suggestions with visual elements".to_string(),
        })
    }
}

#[async_trait]
impl Executor for SimulatedWorkforce {
    async fn execute(
        &self,
        worker: &Worker,
        _plan: &Plan,
        _data: &CollectedData,
        _analysis: &Analysis,
    ) -> StageOutput<ExecutionOutcome> {
        self.pause(worker).await;
        Ok(ExecutionOutcome {
            kind: "recommendation".to_string(),
            content: "Based on your usage patterns, consider optimizing your workflow by enabling quick actions."
                .to_string(),
            additional_resources: vec!["workflow-guide".to_string(), "optimization-tips".to_string()],
            success: true,
        })
    }
}

#[async_trait]
impl Verifier for SimulatedWorkforce {
    async fn verify(&self, worker: &Worker, _request: &str, _result: &ExecutionOutcome) -> StageOutput<Verification> {
        self.pause(worker).await;
        let metrics = [
            ("response_time", "127ms"),
            ("accuracy", "high"),
            ("completeness", "complete"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Ok(Verification {
            success: true,
            quality_score: 0.94,
            performance_metrics: metrics,
        })
    }
}
