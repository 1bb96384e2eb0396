//! Monitor agent: incident log, anomaly detection and problem analysis.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use lyra_core::{Agent, AgentResult, BusHandle, IntelligenceKind, IntelligenceMessage, QueryOutcome};

pub const AGENT_NAME: &str = "monitor";

/// An observed system event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub kind: String,
    pub source: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SystemEvent {
    pub fn new(kind: impl Into<String>, source: impl Into<String>, details: Value) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            details,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn is_error(&self) -> bool {
        self.kind == "error" || self.kind == "exception"
    }

    /// Errors, HTTP-style failure statuses and resource usage over threshold.
    pub fn is_anomaly(&self) -> bool {
        if self.is_error() {
            return true;
        }
        if self.details.get("status").and_then(Value::as_f64).is_some_and(|s| s >= 400.0) {
            return true;
        }
        if self.kind == "resource" {
            let usage = self.details.get("usage").and_then(Value::as_f64);
            let threshold = self.details.get("threshold").and_then(Value::as_f64);
            if let (Some(usage), Some(threshold)) = (usage, threshold) {
                return usage > threshold;
            }
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub kind: String,
    pub source: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemCause {
    pub cause: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub error_rate: f64,
    pub response_time: String,
    pub load_level: String,
    pub last_check: DateTime<Utc>,
}

fn quick_analysis(event: &SystemEvent) -> &'static str {
    if event.kind == "error" {
        if let Some(message) = event.details.get("message").and_then(Value::as_str) {
            if message.contains("auth") {
                return "Likely authentication issue";
            }
            if message.contains("timeout") {
                return "Possible network or service timeout";
            }
        }
    }
    "Requires further investigation"
}

fn suggest_fixes(event: &SystemEvent) -> Vec<String> {
    let mut fixes = Vec::new();
    if event.kind == "error" {
        fixes.push("Check service availability".to_string());
        fixes.push("Verify authentication credentials".to_string());
    }
    if event.source == "api" {
        fixes.push("Validate API request parameters".to_string());
        fixes.push("Check API response format".to_string());
    }
    if fixes.is_empty() {
        fixes.push("Collect more diagnostic information".to_string());
    }
    fixes
}

fn anomaly_recipients(event: &SystemEvent) -> Vec<&'static str> {
    let mut agents = vec!["intelligence"];
    if event.source == "auth" || event.kind.contains("user") {
        agents.push("help");
    }
    agents
}

pub struct MonitorAgent {
    incidents: RwLock<Vec<Incident>>,
    bus: BusHandle,
}

impl MonitorAgent {
    pub fn new(bus: BusHandle) -> Self {
        Self {
            incidents: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Log `event`; anomalies are analysed and published. Returns whether it was an anomaly.
    pub fn record_event(&self, event: SystemEvent) -> bool {
        let timestamp = event.timestamp.unwrap_or_else(Utc::now);
        let incident = Incident {
            id: format!("inc-{}", uuid::Uuid::new_v4().simple()),
            kind: event.kind.clone(),
            source: event.source.clone(),
            details: event.details.clone(),
            timestamp,
        };
        self.incidents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(incident);
        debug!(target: "lyra::agents", agent = AGENT_NAME, kind = %event.kind, source = %event.source, "event recorded");

        if !event.is_anomaly() {
            return false;
        }

        let recipients = anomaly_recipients(&event);
        let data = json!({
            "analysis": quick_analysis(&event),
            "recommendations": suggest_fixes(&event),
            "event": event,
        });
        self.bus
            .publish(IntelligenceMessage::new(IntelligenceKind::AnomalyDetected, data), &recipients);
        info!(target: "lyra::agents", agent = AGENT_NAME, recipients = ?recipients, "anomaly reported");
        true
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Candidate causes for `issue`, most likely first.
    pub fn analyze_problem_causes(&self, issue: &str) -> Vec<ProblemCause> {
        let incidents = self.incidents.read().unwrap_or_else(|e| e.into_inner());
        debug!(target: "lyra::agents", agent = AGENT_NAME, issue, incidents = incidents.len(), "analyzing causes");
        let mut causes: Vec<ProblemCause> = [
            ("Network connectivity", 0.2),
            ("Authentication failure", 0.3),
            ("Resource limitation", 0.15),
            ("Input validation error", 0.25),
            ("External service failure", 0.1),
        ]
        .into_iter()
        .map(|(cause, probability)| ProblemCause {
            cause: cause.to_string(),
            probability,
        })
        .collect();
        causes.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        causes
    }

    /// Share of error events among incidents recorded in the last hour, rounded to two places.
    pub fn error_rate(&self, now: DateTime<Utc>) -> f64 {
        let incidents = self.incidents.read().unwrap_or_else(|e| e.into_inner());
        let window = ChronoDuration::hours(1);
        let recent: Vec<&Incident> = incidents
            .iter()
            .filter(|i| now.signed_duration_since(i.timestamp) < window)
            .collect();
        if recent.is_empty() {
            return 0.0;
        }
        let errors = recent
            .iter()
            .filter(|i| i.kind == "error" || i.kind == "exception")
            .count();
        ((errors as f64 / recent.len() as f64) * 100.0).round() / 100.0
    }

    pub fn health(&self) -> SystemHealth {
        let now = Utc::now();
        SystemHealth {
            status: "optimal".to_string(),
            error_rate: self.error_rate(now),
            response_time: "120ms".to_string(),
            load_level: "moderate".to_string(),
            last_check: now,
        }
    }

    fn incident_summary(&self) -> Value {
        let incidents = self.incidents.read().unwrap_or_else(|e| e.into_inner());
        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for incident in incidents.iter() {
            *by_type.entry(incident.kind.as_str()).or_insert(0) += 1;
        }
        let mut most_common: Vec<(&str, usize)> = by_type.iter().map(|(k, v)| (*k, *v)).collect();
        most_common.sort_by(|a, b| b.1.cmp(&a.1));
        most_common.truncate(3);
        json!({
            "by_type": by_type,
            "most_common": most_common
                .into_iter()
                .map(|(kind, count)| json!({ "type": kind, "count": count }))
                .collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl Agent for MonitorAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Monitor: observes system events, detects issues and assists in problem resolution"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let q = query.to_lowercase();

        if q.contains("monitor") || q.contains("watch") {
            return Ok(QueryOutcome::answer("Monitoring active. I'm watching system events and interactions.")
                .with_data(json!({
                    "active_monitoring": true,
                    "incident_count": self.incidents().len(),
                    "system_status": self.health(),
                })));
        }

        if q.contains("incident") || q.contains("issue") {
            let incidents = self.incidents();
            let recent = &incidents[incidents.len().saturating_sub(5)..];
            return Ok(QueryOutcome::answer("Recent incident log:").with_data(json!({
                "incidents": recent,
                "summary": self.incident_summary(),
            })));
        }

        if q.contains("cause") || q.contains("diagnos") {
            return Ok(QueryOutcome::answer("Likely causes, most probable first:")
                .with_data(json!({ "causes": self.analyze_problem_causes(query) })));
        }

        Ok(QueryOutcome::answer("Monitor agent ready. What would you like me to observe?").with_suggestions([
            "Show active monitoring",
            "View recent incidents",
            "Diagnose likely causes",
        ]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        if message.kind != IntelligenceKind::SecurityThreats {
            debug!(target: "lyra::agents", agent = AGENT_NAME, kind = %message.kind, "intelligence noted");
            return;
        }
        let incidents = message
            .data
            .get("incidents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for details in incidents {
            self.record_event(SystemEvent::new("security-threat", "security", details));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_rules() {
        assert!(SystemEvent::new("error", "api", Value::Null).is_anomaly());
        assert!(SystemEvent::new("request", "api", json!({ "status": 503 })).is_anomaly());
        assert!(SystemEvent::new("resource", "host", json!({ "usage": 0.95, "threshold": 0.9 })).is_anomaly());
        assert!(!SystemEvent::new("resource", "host", json!({ "usage": 0.5, "threshold": 0.9 })).is_anomaly());
        assert!(!SystemEvent::new("login", "auth", json!({ "status": 200 })).is_anomaly());
    }

    #[test]
    fn error_rate_counts_last_hour_only() {
        let agent = MonitorAgent::new(BusHandle::detached());
        let now = Utc::now();
        agent.record_event(SystemEvent::new("error", "api", Value::Null).at(now - ChronoDuration::hours(2)));
        agent.record_event(SystemEvent::new("error", "api", Value::Null).at(now));
        agent.record_event(SystemEvent::new("request", "api", Value::Null).at(now));
        agent.record_event(SystemEvent::new("request", "api", Value::Null).at(now));
        assert_eq!(agent.error_rate(now), 0.33);
    }

    #[test]
    fn fixes_depend_on_event() {
        let fixes = suggest_fixes(&SystemEvent::new("error", "api", Value::Null));
        assert_eq!(fixes.len(), 4);
        let fixes = suggest_fixes(&SystemEvent::new("slow", "db", Value::Null));
        assert_eq!(fixes, vec!["Collect more diagnostic information".to_string()]);
        assert_eq!(
            quick_analysis(&SystemEvent::new("error", "api", json!({ "message": "auth token expired" }))),
            "Likely authentication issue"
        );
    }

    #[test]
    fn causes_are_sorted() {
        let agent = MonitorAgent::new(BusHandle::detached());
        let causes = agent.analyze_problem_causes("login failures");
        assert_eq!(causes[0].cause, "Authentication failure");
        assert!(causes.windows(2).all(|w| w[0].probability >= w[1].probability));
    }
}
