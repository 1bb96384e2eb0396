//! Composition root: agent registration and the intelligence paths between agents.
//!
//! Run with: `cargo test -p lyra-agents --test services_test`

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use lyra_agents::{names, Services, SystemEvent};
use lyra_core::{CoreConfig, IntelligenceKind, LogSink};

fn quick_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.pipeline.simulated_latency_ms = 5;
    config.threat.seed = Some(11);
    config.cognition.seed = Some(11);
    config
}

#[test]
fn test_every_agent_is_registered() {
    let services = Services::build(&quick_config());
    let mut registered = services.bus.agent_names();
    registered.sort();
    assert_eq!(
        registered,
        vec![
            names::HELP.to_string(),
            names::INTELLIGENCE.to_string(),
            names::LYRA.to_string(),
            names::MONETIZATION.to_string(),
            names::MONITOR.to_string(),
            names::SECURITY.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_agent_gets_failure_envelope() {
    let services = Services::build(&quick_config());
    let response = services.answer("marketplace", "list items").await;
    assert!(!response.success);
    assert!(response.message.contains("marketplace"));
}

#[tokio::test]
async fn test_gather_feeds_optimizer_market() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::INTELLIGENCE, "Please update your knowledge base").await;
    assert!(response.success);

    let market = services.optimizer.market_conditions();
    assert_eq!(market["content"], 1.35);
    assert_eq!(market["advertising"], 0.75);
    assert_eq!(market["subscription"], 1.25);
    // help receives user behaviour alongside monetization
    assert_eq!(services.help.alerts(10)[0].kind, IntelligenceKind::UserBehavior);
}

#[tokio::test]
async fn test_scan_findings_reach_intelligence_and_monitor() {
    let mut config = quick_config();
    config.threat.detection_probability = 1.0;
    let services = Services::build(&config);

    let response = services.answer(names::SECURITY, "run a security scan").await;
    assert!(response.success);
    assert_eq!(services.threats.active_threats().len(), 1);

    let received = services.intelligence.received(10);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind, IntelligenceKind::SecurityThreats);

    let incidents = services.monitor.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].kind, "security-threat");
}

#[tokio::test]
async fn test_auth_anomaly_alerts_help() {
    let services = Services::build(&quick_config());

    let anomaly = services.monitor.record_event(SystemEvent::new(
        "error",
        "auth",
        json!({ "message": "auth token expired" }),
    ));
    assert!(anomaly);

    let alert = &services.help.alerts(1)[0];
    assert_eq!(alert.kind, IntelligenceKind::AnomalyDetected);
    assert_eq!(alert.data["analysis"], "Likely authentication issue");
    assert_eq!(services.intelligence.received(1)[0].kind, IntelligenceKind::AnomalyDetected);

    assert!(!services.monitor.record_event(SystemEvent::new("login", "auth", json!({ "status": 200 }))));
    assert_eq!(services.help.alerts(10).len(), 1);
}

#[tokio::test]
async fn test_optimize_query_publishes_result() {
    let services = Services::build(&quick_config());
    let response = services.answer(names::MONETIZATION, "optimize my plan").await;
    assert!(response.success);
    assert_eq!(services.optimizer.run_count(), 1);
    assert_eq!(services.intelligence.received(1)[0].kind, IntelligenceKind::OptimizationResult);
}

#[tokio::test]
async fn test_lyra_runs_request_through_pipeline() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::LYRA, "find me a quiet beach house").await;
    assert!(response.success, "{}", response.message);
    let data = response.data.expect("pipeline data");
    assert!(data["request_id"].is_string());
    assert_eq!(services.coordinator.task_history(10, None).len(), 1);
    assert_eq!(services.cognition.recent_thoughts(1)[0].kind.as_str(), "problem-solving");

    let empty = services.answer(names::LYRA, "   ").await;
    assert!(!empty.success);

    let status = services.answer(names::LYRA, "status").await;
    assert!(status.success);
    assert_eq!(status.data.expect("status")["completed_task_count"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_patrol_shares_findings() {
    let mut config = quick_config();
    config.threat.detection_probability = 1.0;
    config.threat.scan_interval_secs = 10;
    let services = Services::build(&config);

    let tasks = services.start_background(Arc::new(LogSink));
    tokio::time::sleep(Duration::from_secs(21)).await;
    tasks.abort();

    assert_eq!(services.monitor.incidents().len(), 2);
}

#[tokio::test]
async fn test_help_escalation_is_recorded() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::HELP, "I need to talk to a human about my refund").await;
    assert!(response.success);
    let escalations = services.help.escalations(10);
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].user_id, "anonymous");
    assert!(escalations[0].issue.contains("refund"));
    assert!(response.message.contains(&escalations[0].id));

    services.answer(names::HELP, "how do I reset password").await;
    assert_eq!(services.help.escalations(10).len(), 1);
}

#[tokio::test]
async fn test_help_article_answers_by_topic() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::HELP, "Show me the article about password reset").await;
    assert!(response.success);
    let data = response.data.expect("article");
    assert_eq!(data["topic"], "password reset");
    assert_eq!(data["sections"].as_array().map(Vec::len), Some(1));

    let missing = services.answer(names::HELP, "article").await;
    assert!(!missing.success);
}

#[tokio::test]
async fn test_advertisers_filtered_by_requested_demographic() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::MONETIZATION, "Find sponsors for land owners").await;
    assert!(response.success);
    let data = response.data.expect("advertisers");
    assert_eq!(data["demographic"], "land owners");
    let advertisers = data["potential_advertisers"].as_array().expect("list");
    assert_eq!(advertisers.len(), 1);
    assert_eq!(advertisers[0]["name"], "Builders Guild");

    let unmatched = services.answer(names::MONETIZATION, "find advertisers for retirees").await;
    let data = unmatched.data.expect("advertisers");
    assert_eq!(data["potential_advertisers"].as_array().map(Vec::len), Some(5));
    assert!(unmatched.message.starts_with("No advertisers target retirees"));

    let all = services.answer(names::MONETIZATION, "show advertisers").await;
    assert_eq!(all.data.expect("advertisers")["demographic"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_keyword_inside_other_words_does_not_optimize() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::MONETIZATION, "give me an explanation of the planet").await;
    assert!(response.success);
    assert_eq!(services.optimizer.run_count(), 0);
    assert!(response.message.starts_with("I can help you maximize revenue"));
}

#[tokio::test]
async fn test_currency_query_answers_with_exchange_strategy() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::MONETIZATION, "How should we handle Linden dollars and crypto?").await;
    assert!(response.success);
    let data = response.data.expect("currency");
    assert_eq!(data["currency_integration"]["exchange_rate"], "L$250 = $1 USD");
    assert_eq!(data["implementation_steps"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_forecast_reads_thousands_separators() {
    let services = Services::build(&quick_config());

    let response = services.answer(names::MONETIZATION, "forecast 5,000 users at 20% active").await;
    assert!(response.success, "{}", response.message);
    let data = response.data.expect("projection");
    assert_eq!(data["user_count"], 5000.0);
    assert_eq!(data["active_users"], 1000.0);
}
