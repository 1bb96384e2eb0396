//! Security agent: front end of the threat monitor.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use lyra_core::{
    Agent, AgentResult, BusHandle, IntelligenceKind, IntelligenceMessage, QueryOutcome, ScanObserver, ScanOutcome,
    ThreatMonitor,
};

pub const AGENT_NAME: &str = "security";

/// Agents told about every scan that finds something.
const THREAT_SUBSCRIBERS: &[&str] = &["intelligence", "monitor"];

pub struct SecurityAgent {
    monitor: Arc<ThreatMonitor>,
    bus: BusHandle,
}

impl SecurityAgent {
    pub fn new(monitor: Arc<ThreatMonitor>, bus: BusHandle) -> Self {
        Self { monitor, bus }
    }

    pub fn monitor(&self) -> &Arc<ThreatMonitor> {
        &self.monitor
    }

    /// Share a scan's findings. Quiet scans publish nothing.
    fn share_findings(&self, outcome: &ScanOutcome) {
        if outcome.threats().is_empty() {
            return;
        }
        let incidents: Vec<Value> = outcome
            .threats()
            .iter()
            .map(|t| json!({ "type": t.kind, "severity": t.severity, "timestamp": t.detected_at }))
            .collect();
        self.bus.publish(
            IntelligenceMessage::new(IntelligenceKind::SecurityThreats, json!({ "incidents": incidents })),
            THREAT_SUBSCRIBERS,
        );
    }
}

#[async_trait]
impl Agent for SecurityAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Security Shield: protects against threats and unauthorized usage"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let q = query.to_lowercase();
        debug!(target: "lyra::agents", agent = AGENT_NAME, query, "processing query");

        if q.contains("threat") || q.contains("security status") {
            return Ok(QueryOutcome::answer("Current security status report:").with_data(json!({
                "active_threats": self.monitor.active_threats().len(),
                "threat_summary": self.monitor.threat_summary(),
                "security_score": self.monitor.security_score(),
            })));
        }

        if q.contains("scan") || q.contains("check") {
            let outcome = self.monitor.scan().await;
            self.share_findings(&outcome);
            return Ok(QueryOutcome::answer("Security scan completed:").with_data(json!({
                "scan_results": outcome.report,
                "mitigations": outcome.mitigations,
                "recommendations": self.monitor.recommendations(),
            })));
        }

        if q.contains("team") || q.contains("agents") {
            return Ok(QueryOutcome::answer("Security defence team status:")
                .with_data(json!({ "agents": self.monitor.team().roster() })));
        }

        if q.contains("protect") || q.contains("mitigation") {
            return Ok(QueryOutcome::answer("Current protection strategies:").with_data(json!({
                "strategies": self.monitor.strategies(),
                "active_measures": self.monitor.active_measures(),
            })));
        }

        if q.contains("train") || q.contains("learn") {
            let report = self.monitor.train();
            return Ok(QueryOutcome::answer("Security model training completed:").with_data(json!(report)));
        }

        Ok(QueryOutcome::answer(
            "I protect the system against unauthorized usage and security threats. How can I assist?",
        )
        .with_suggestions([
            "Show security status",
            "Perform security scan",
            "Show defence team status",
            "Review protection strategies",
            "Train security model",
        ]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        debug!(target: "lyra::agents", agent = AGENT_NAME, kind = %message.kind, "intelligence received");
        if message.kind == IntelligenceKind::SecurityThreats {
            self.monitor.learn(&message.data);
        }
    }
}

#[async_trait]
impl ScanObserver for SecurityAgent {
    async fn on_scan(&self, outcome: &ScanOutcome) {
        info!(
            target: "lyra::agents",
            agent = AGENT_NAME,
            threats = outcome.threats().len(),
            score = self.monitor.security_score(),
            "patrol scan finished"
        );
        self.share_findings(outcome);
    }
}
