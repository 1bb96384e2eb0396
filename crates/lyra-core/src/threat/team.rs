//! The defence roster: named sentinel units with fixed specialties.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ThreatKind;

const ROSTER: &[(&str, &str)] = &[
    ("Sentinel", "Perimeter monitoring and intrusion detection"),
    ("Guardian", "Authentication and access control verification"),
    ("Shield", "Request filtering and validation"),
    ("Warden", "Suspicious behavior analysis"),
    ("Vault", "Encryption and secure data handling"),
    ("Scout", "Vulnerability scanning"),
    ("Ranger", "Threat intelligence gathering"),
    ("Hunter", "Malicious pattern detection"),
    ("Medic", "System integrity restoration"),
    ("Commander", "Response coordination and reporting"),
];

const FALLBACK_RESPONDER: &str = "Commander";

/// Name of the unit that handles `kind` when a threat needs direct mitigation.
pub fn responder_for(kind: &ThreatKind) -> &'static str {
    match kind {
        ThreatKind::Authentication => "Guardian",
        ThreatKind::Injection | ThreatKind::Xss => "Shield",
        ThreatKind::MaliciousBehavior => "Warden",
        ThreatKind::DataLeak => "Vault",
        ThreatKind::Vulnerability => "Scout",
        ThreatKind::Other(_) => FALLBACK_RESPONDER,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub unit: String,
    pub task: String,
    pub status: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub name: String,
    pub specialty: String,
    pub status: String,
}

pub struct SentinelUnit {
    name: &'static str,
    specialty: &'static str,
    knowledge: RwLock<BTreeMap<String, Value>>,
    latency: Duration,
}

impl SentinelUnit {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn specialty(&self) -> &str {
        self.specialty
    }

    pub fn status(&self) -> UnitStatus {
        UnitStatus {
            name: self.name.to_string(),
            specialty: self.specialty.to_string(),
            status: "active".to_string(),
        }
    }

    /// Run a nominal task. `subject` is echoed into the report.
    pub async fn perform_task(&self, task: &str, subject: Option<&str>) -> TaskReport {
        debug!(target: "lyra::threat", unit = self.name, task, "unit task started");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        TaskReport {
            unit: self.name.to_string(),
            task: task.to_string(),
            status: "completed".to_string(),
            result: match subject {
                Some(s) => format!("Processed {}", s),
                None => "Task completed".to_string(),
            },
        }
    }

    /// Merge `updates` over the unit's knowledge.
    pub fn update_knowledge(&self, updates: &BTreeMap<String, Value>) {
        let mut knowledge = self.knowledge.write().unwrap_or_else(|e| e.into_inner());
        knowledge.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
        debug!(target: "lyra::threat", unit = self.name, keys = knowledge.len(), "unit knowledge updated");
    }

    pub fn knowledge(&self) -> BTreeMap<String, Value> {
        self.knowledge.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct DefenceTeam {
    units: Vec<SentinelUnit>,
}

impl DefenceTeam {
    /// The fixed ten-unit roster; each nominal task takes `latency`.
    pub fn new(latency: Duration) -> Self {
        let units = ROSTER
            .iter()
            .map(|&(name, specialty)| SentinelUnit {
                name,
                specialty,
                knowledge: RwLock::new(BTreeMap::new()),
                latency,
            })
            .collect();
        Self { units }
    }

    pub fn units(&self) -> &[SentinelUnit] {
        &self.units
    }

    pub fn unit(&self, name: &str) -> Option<&SentinelUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn roster(&self) -> Vec<UnitStatus> {
        self.units.iter().map(SentinelUnit::status).collect()
    }

    /// Unit assigned to `kind`, falling back to the coordinator.
    pub fn responder(&self, kind: &ThreatKind) -> Option<&SentinelUnit> {
        self.unit(responder_for(kind)).or_else(|| self.unit(FALLBACK_RESPONDER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_has_ten_named_units() {
        let team = DefenceTeam::new(Duration::ZERO);
        assert_eq!(team.units().len(), 10);
        assert_eq!(team.unit("Vault").map(|u| u.specialty()), Some("Encryption and secure data handling"));
    }

    #[test]
    fn responders_follow_the_lookup_table() {
        let team = DefenceTeam::new(Duration::ZERO);
        let name = |kind: ThreatKind| team.responder(&kind).map(|u| u.name().to_string());
        assert_eq!(name(ThreatKind::Authentication).as_deref(), Some("Guardian"));
        assert_eq!(name(ThreatKind::Xss).as_deref(), Some("Shield"));
        assert_eq!(name(ThreatKind::Injection).as_deref(), Some("Shield"));
        assert_eq!(name(ThreatKind::Other("botnet".into())).as_deref(), Some("Commander"));
    }

    #[tokio::test]
    async fn task_report_echoes_subject() {
        let team = DefenceTeam::new(Duration::ZERO);
        let unit = team.unit("Medic").unwrap();
        assert_eq!(unit.perform_task("scan", None).await.result, "Task completed");
        let report = unit.perform_task("mitigate", Some("threat-1")).await;
        assert_eq!(report.result, "Processed threat-1");
        assert_eq!(report.status, "completed");
    }
}
