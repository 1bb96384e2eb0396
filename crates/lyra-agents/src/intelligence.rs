//! Intelligence agent: keeps a small knowledge base, shares it with other agents and
//! stores whatever intelligence they send back.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use lyra_core::{Agent, AgentResult, BusHandle, IntelligenceKind, IntelligenceMessage, QueryOutcome};

pub const AGENT_NAME: &str = "intelligence";

const RECEIVED_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrends {
    pub popular_categories: Vec<String>,
    pub rising_terms: Vec<String>,
    /// Multipliers keyed by market-condition name, consumed by the optimizer.
    pub market_conditions: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBehavior {
    pub peak_times: Vec<String>,
    pub popular_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub market_trends: MarketTrends,
    pub user_behavior: UserBehavior,
    pub engaging_content: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            market_trends: MarketTrends {
                popular_categories: strings(&["Virtual Fashion", "Home Decor", "Animations"]),
                rising_terms: strings(&["cyberpunk", "fantasy garden", "pet companions"]),
                market_conditions: serde_json::Map::new(),
            },
            user_behavior: UserBehavior {
                peak_times: strings(&["18:00-22:00", "12:00-14:00"]),
                popular_locations: strings(&["Central Plaza", "Fantasy Realm", "Night District"]),
            },
            engaging_content: strings(&["Interactive experiences", "Before/After showcases", "Tutorials"]),
            last_updated: Utc::now(),
        }
    }
}

pub struct IntelligenceAgent {
    knowledge: RwLock<KnowledgeBase>,
    received: RwLock<VecDeque<IntelligenceMessage>>,
    bus: BusHandle,
}

impl IntelligenceAgent {
    pub fn new(bus: BusHandle) -> Self {
        Self {
            knowledge: RwLock::new(KnowledgeBase::default()),
            received: RwLock::new(VecDeque::new()),
            bus,
        }
    }

    pub fn knowledge(&self) -> KnowledgeBase {
        self.knowledge.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stored intelligence, newest first.
    pub fn received(&self, limit: usize) -> Vec<IntelligenceMessage> {
        let received = self.received.read().unwrap_or_else(|e| e.into_inner());
        received.iter().rev().take(limit).cloned().collect()
    }

    /// Refresh the knowledge base and share it.
    pub fn gather(&self) -> KnowledgeBase {
        let snapshot = {
            let mut kb = self.knowledge.write().unwrap_or_else(|e| e.into_inner());
            kb.market_trends.rising_terms = strings(&["neon accessories", "gothic architecture", "companion bots"]);
            kb.market_trends.market_conditions = [
                ("content-monetization-trend", 1.35),
                ("advertising-market-saturation", 0.75),
                ("subscription-market-growth", 1.25),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
            kb.last_updated = Utc::now();
            kb.clone()
        };
        info!(target: "lyra::agents", agent = AGENT_NAME, "knowledge base refreshed");

        // publish outside the lock; receivers may call back into this agent
        self.bus.publish(
            IntelligenceMessage::new(IntelligenceKind::MarketTrends, json!(snapshot.market_trends)),
            &["monetization"],
        );
        self.bus.publish(
            IntelligenceMessage::new(IntelligenceKind::UserBehavior, json!(snapshot.user_behavior)),
            &["monetization", "help"],
        );
        snapshot
    }

    pub fn competitor_analysis(&self) -> serde_json::Value {
        json!({
            "competitor_features": {
                "Platform A": ["Advanced avatar customization", "Virtual concerts"],
                "Platform B": ["Blockchain integration", "Creator marketplace"],
            },
            "user_sentiment": {
                "Platform A": "Positive but concerns about pricing",
                "Platform B": "Mixed reviews about performance",
            },
        })
    }

    pub fn predict_trends(&self) -> Vec<String> {
        strings(&[
            "AR integration will grow in popularity",
            "Virtual fashion shows will become mainstream",
            "Cross-platform avatars will be in demand",
        ])
    }
}

#[async_trait]
impl Agent for IntelligenceAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Intelligence Network: collects and analyzes information to assist other agents"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let q = query.to_lowercase();
        debug!(target: "lyra::agents", agent = AGENT_NAME, query, "processing query");

        if q.contains("update") && q.contains("knowledge") {
            let kb = self.gather();
            return Ok(QueryOutcome::answer("Knowledge base has been updated with the latest information.")
                .with_data(json!({ "last_updated": kb.last_updated })));
        }

        if q.contains("trends") || q.contains("popular") {
            return Ok(QueryOutcome::answer("Here are the current trending topics and items:")
                .with_data(json!(self.knowledge().market_trends)));
        }

        if q.contains("competitor") {
            return Ok(QueryOutcome::answer("Competitor landscape:").with_data(self.competitor_analysis()));
        }

        if q.contains("predict") {
            return Ok(QueryOutcome::answer("Predicted upcoming trends:")
                .with_data(json!({ "predictions": self.predict_trends() })));
        }

        Ok(QueryOutcome::answer("I gather and analyze information to help other agents. What would you like to know?")
            .with_suggestions([
                "Update knowledge base",
                "Show current trends",
                "Analyze competitors",
                "Predict upcoming trends",
            ]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        let mut received = self.received.write().unwrap_or_else(|e| e.into_inner());
        received.push_back(message.clone());
        while received.len() > RECEIVED_CAPACITY {
            received.pop_front();
        }
        debug!(target: "lyra::agents", agent = AGENT_NAME, kind = %message.kind, stored = received.len(), "intelligence stored");
    }
}
