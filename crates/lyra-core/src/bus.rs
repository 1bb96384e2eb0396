//! Intelligence Bus: agent registry, intelligence routing and the query boundary.
//!
//! `route` delivers a message to every named agent that exists, logs and skips names that do
//! not, and appends exactly one audit record per call. `answer` is the only place where an
//! agent's [`QueryOutcome`] is turned into the wire envelope; errors and panics inside an agent
//! become `success: false` responses.

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::envelope::{AgentResponse, QueryOutcome};
use crate::error::AgentResult;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Type tag of an [`IntelligenceMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntelligenceKind {
    MarketTrends,
    UserBehavior,
    ContentPerformance,
    SecurityThreats,
    AnomalyDetected,
    OptimizationResult,
    Custom(String),
}

impl IntelligenceKind {
    pub fn as_str(&self) -> &str {
        match self {
            IntelligenceKind::MarketTrends => "market_trends",
            IntelligenceKind::UserBehavior => "user_behavior",
            IntelligenceKind::ContentPerformance => "content_performance",
            IntelligenceKind::SecurityThreats => "security_threats",
            IntelligenceKind::AnomalyDetected => "anomaly_detected",
            IntelligenceKind::OptimizationResult => "optimization_result",
            IntelligenceKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for IntelligenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload shared between agents. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceMessage {
    pub kind: IntelligenceKind,
    pub data: Value,
}

impl IntelligenceMessage {
    pub fn new(kind: IntelligenceKind, data: Value) -> Self {
        Self { kind, data }
    }
}

// ---------------------------------------------------------------------------
// Agent trait
// ---------------------------------------------------------------------------

/// A query-answering unit registered on the bus.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry key used for routing (e.g. `"security"`).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome>;

    /// Called synchronously by [`IntelligenceBus::route`].
    fn receive_intelligence(&self, message: &IntelligenceMessage);
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// One routing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub kind: IntelligenceKind,
    pub targets: Vec<String>,
    pub delivered: Vec<String>,
    pub unknown: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Delivery summary returned by [`IntelligenceBus::route`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub delivered: Vec<String>,
    pub unknown: Vec<String>,
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

pub struct IntelligenceBus {
    agents: DashMap<String, Arc<dyn Agent>>,
    audit: RwLock<VecDeque<RouteRecord>>,
    audit_capacity: usize,
}

impl IntelligenceBus {
    pub fn new(audit_capacity: usize) -> Self {
        Self {
            agents: DashMap::new(),
            audit: RwLock::new(VecDeque::new()),
            audit_capacity: audit_capacity.max(1),
        }
    }

    /// Non-owning handle for agents that publish back onto this bus.
    pub fn handle(self: &Arc<Self>) -> BusHandle {
        BusHandle {
            bus: Arc::downgrade(self),
        }
    }

    /// Register (or replace) an agent under its own name.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        if self.agents.insert(name.clone(), agent).is_some() {
            warn!(target: "lyra::bus", agent = %name, "agent re-registered; previous instance replaced");
        } else {
            info!(target: "lyra::bus", agent = %name, "agent registered");
        }
    }

    /// Shared reference to a registered agent.
    pub fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered agent names, sorted.
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Deliver `message` to each named agent in order. Unknown names are logged and skipped.
    pub fn route(&self, message: &IntelligenceMessage, targets: &[&str]) -> RouteReport {
        let mut report = RouteReport::default();

        for &target in targets {
            // clone out of the map so re-entrant publishes never hold a shard lock
            match self.agent(target) {
                Some(agent) => {
                    agent.receive_intelligence(message);
                    report.delivered.push(target.to_string());
                }
                None => {
                    warn!(target: "lyra::bus", kind = %message.kind, agent = target, "unknown routing target skipped");
                    report.unknown.push(target.to_string());
                }
            }
        }

        debug!(
            target: "lyra::bus",
            kind = %message.kind,
            delivered = report.delivered.len(),
            unknown = report.unknown.len(),
            "intelligence routed"
        );

        self.append_audit(RouteRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind: message.kind.clone(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            delivered: report.delivered.clone(),
            unknown: report.unknown.clone(),
            timestamp: Utc::now(),
        });

        report
    }

    /// Newest audit records first.
    pub fn audit_log(&self, limit: usize) -> Vec<RouteRecord> {
        let audit = self.audit.read().unwrap_or_else(|e| e.into_inner());
        audit.iter().rev().take(limit).cloned().collect()
    }

    pub fn audit_len(&self) -> usize {
        self.audit.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Ask `agent_name` to process `query`. Always returns a well-formed envelope.
    pub async fn answer(&self, agent_name: &str, query: &str) -> AgentResponse {
        let Some(agent) = self.agent(agent_name) else {
            warn!(target: "lyra::bus", agent = agent_name, "query for unknown agent");
            return AgentResponse::failure(format!("No agent named '{}' is available.", agent_name));
        };

        match AssertUnwindSafe(agent.process_query(query)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome.into(),
            Ok(Err(e)) => {
                warn!(target: "lyra::bus", agent = agent_name, error = %e, "agent query failed");
                AgentResponse::failure(format!("{} could not process the query: {}", agent.name(), e))
            }
            Err(_) => {
                warn!(target: "lyra::bus", agent = agent_name, "agent panicked while processing query");
                AgentResponse::failure(format!(
                    "{} hit an internal fault while processing the query.",
                    agent.name()
                ))
            }
        }
    }

    fn append_audit(&self, record: RouteRecord) {
        let mut audit = self.audit.write().unwrap_or_else(|e| e.into_inner());
        audit.push_back(record);
        while audit.len() > self.audit_capacity {
            audit.pop_front();
        }
    }
}

impl Default for IntelligenceBus {
    fn default() -> Self {
        Self::new(crate::config::BusConfig::default().audit_capacity)
    }
}

/// Weak publishing handle held by agents.
#[derive(Clone)]
pub struct BusHandle {
    bus: Weak<IntelligenceBus>,
}

impl BusHandle {
    /// A handle that is never attached to a bus. Publishing through it is a no-op.
    pub fn detached() -> Self {
        Self { bus: Weak::new() }
    }

    /// Route through the bus if it is still alive.
    pub fn publish(&self, message: IntelligenceMessage, targets: &[&str]) -> Option<RouteReport> {
        match self.bus.upgrade() {
            Some(bus) => Some(bus.route(&message, targets)),
            None => {
                debug!(target: "lyra::bus", kind = %message.kind, "bus dropped; intelligence discarded");
                None
            }
        }
    }
}

impl fmt::Debug for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("attached", &(self.bus.strong_count() > 0))
            .finish()
    }
}
