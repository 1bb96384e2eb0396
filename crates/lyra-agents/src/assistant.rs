//! The `lyra` assistant: hands free-form requests to the task pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use lyra_core::{
    Agent, AgentError, AgentResult, CognitionEngine, IntelligenceMessage, QueryOutcome, TaskCoordinator, ThoughtKind,
};

pub const AGENT_NAME: &str = "lyra";

pub struct LyraAgent {
    coordinator: Arc<TaskCoordinator>,
    cognition: Arc<CognitionEngine>,
}

impl LyraAgent {
    pub fn new(coordinator: Arc<TaskCoordinator>, cognition: Arc<CognitionEngine>) -> Self {
        Self { coordinator, cognition }
    }
}

#[async_trait]
impl Agent for LyraAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Lyra: general assistant that plans, gathers, analyzes and executes user requests"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::InvalidQuery("empty request".to_string()));
        }

        if query.eq_ignore_ascii_case("status") {
            let status = self.coordinator.status();
            return Ok(QueryOutcome::answer(format!(
                "{} active requests, {} completed, {} workers",
                status.active_request_count, status.completed_task_count, status.worker_count
            ))
            .with_data(json!(status)));
        }

        let result = self.coordinator.process_request(query, None).await;
        if let (true, Some(execution)) = (result.is_success(), result.result.as_ref()) {
            self.cognition.generate_thought(
                ThoughtKind::ProblemSolving,
                format!("I worked through a request: {}", query),
                Vec::new(),
            );
            info!(target: "lyra::agents", agent = AGENT_NAME, request_id = %result.id, "request answered");
            return Ok(QueryOutcome::answer(execution.content.clone()).with_data(json!({
                "request_id": result.id,
                "result": execution,
                "verification": result.verification,
                "execution_time_ms": result.execution_time_ms,
            })));
        }

        let reason = result.error.clone().unwrap_or_else(|| "request did not complete".to_string());
        warn!(target: "lyra::agents", agent = AGENT_NAME, request_id = %result.id, error = %reason, "request failed");
        Ok(QueryOutcome::declined(reason))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        self.cognition.generate_thought(
            ThoughtKind::Analytical,
            format!("Another agent shared {} with me", message.kind),
            Vec::new(),
        );
    }
}
