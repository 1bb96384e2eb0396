//! Intelligence bus: shared agent references, re-entrant forwarding and the query boundary.
//!
//! Run with: `cargo test -p lyra-core --test bus_test`

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use lyra_core::{
    Agent, AgentResult, BusHandle, IntelligenceBus, IntelligenceKind, IntelligenceMessage, QueryOutcome,
};

/// Forwards every message it receives to `forward_to`, then records it.
struct Relay {
    name: &'static str,
    forward_to: Option<&'static str>,
    bus: BusHandle,
    received: Mutex<Vec<IntelligenceMessage>>,
}

impl Relay {
    fn new(name: &'static str, forward_to: Option<&'static str>, bus: BusHandle) -> Arc<Self> {
        Arc::new(Self {
            name,
            forward_to,
            bus,
            received: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Agent for Relay {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "forwards intelligence"
    }

    async fn process_query(&self, _query: &str) -> AgentResult<QueryOutcome> {
        let seen = self.received.lock().unwrap().len();
        Ok(QueryOutcome::answer(format!("{} messages seen", seen))
            .with_data(json!({ "seen": seen }))
            .with_suggestions(vec!["Send more".to_string()]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        self.received.lock().unwrap().push(message.clone());
        if let Some(next) = self.forward_to {
            self.bus.publish(message.clone(), &[next]);
        }
    }
}

#[test]
fn test_agent_accessor_returns_shared_instance() {
    let bus = Arc::new(IntelligenceBus::default());
    let relay = Relay::new("relay", None, bus.handle());
    bus.register(relay.clone());

    let fetched = bus.agent("relay").expect("registered");
    bus.route(
        &IntelligenceMessage::new(IntelligenceKind::UserBehavior, json!({ "active": 12 })),
        &["relay"],
    );

    // state mutated through the bus is visible through every reference
    assert_eq!(relay.received.lock().unwrap().len(), 1);
    assert!(Arc::ptr_eq(&fetched, &(relay.clone() as Arc<dyn Agent>)));
    assert_eq!(bus.agent_names(), vec!["relay".to_string()]);
}

#[test]
fn test_reentrant_forwarding_is_audited_per_route() {
    let bus = Arc::new(IntelligenceBus::new(10));
    let first = Relay::new("first", Some("second"), bus.handle());
    let second = Relay::new("second", Some("missing"), bus.handle());
    bus.register(first.clone());
    bus.register(second.clone());

    let report = bus.route(
        &IntelligenceMessage::new(IntelligenceKind::AnomalyDetected, json!({ "type": "error" })),
        &["first"],
    );

    assert_eq!(report.delivered, vec!["first".to_string()]);
    assert_eq!(second.received.lock().unwrap().len(), 1);
    // first -> second, second -> missing, and the outer call
    assert_eq!(bus.audit_len(), 3);
    let newest = &bus.audit_log(1)[0];
    assert_eq!(newest.targets, vec!["first".to_string()]);
}

#[tokio::test]
async fn test_answer_serializes_outcome_envelope() {
    let bus = Arc::new(IntelligenceBus::default());
    bus.register(Relay::new("relay", None, BusHandle::detached()));

    let response = bus.answer("relay", "how many?").await;
    assert!(response.success);
    assert_eq!(response.message, "0 messages seen");

    let wire = serde_json::to_value(&response).expect("serialize");
    assert_eq!(wire["data"]["seen"], 0);
    assert_eq!(wire["suggestions"][0], "Send more");
}
