//! Threat monitor: scans, scoring, training and the patrol loop.
//!
//! Run with: `cargo test -p lyra-core --test threat_test`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use lyra_core::threat::responder_for;
use lyra_core::{spawn_patrol, ScanObserver, ScanOutcome, Severity, ThreatConfig, ThreatLevel, ThreatMonitor};

fn monitor(probability: f64, seed: u64) -> ThreatMonitor {
    let config = ThreatConfig {
        detection_probability: probability,
        history_capacity: 5,
        seed: Some(seed),
        ..ThreatConfig::default()
    };
    ThreatMonitor::with_unit_latency(&config, Duration::ZERO)
}

#[tokio::test]
async fn test_quiet_scan_is_an_empty_result() {
    let monitor = monitor(0.0, 1);
    let outcome = monitor.scan().await;

    assert!(outcome.threats().is_empty());
    assert!(outcome.strategies.is_empty());
    assert!(outcome.mitigations.is_empty());
    assert_eq!(monitor.security_score(), 100);
    assert_eq!(monitor.threat_summary().status, ThreatLevel::Secure);
    assert!(monitor.latest_scan().is_some());
}

#[tokio::test]
async fn test_detections_replace_active_set() {
    let monitor = monitor(1.0, 2);

    for _ in 0..8 {
        let outcome = monitor.scan().await;
        assert_eq!(outcome.threats().len(), 1);
        let threat = &outcome.threats()[0];

        assert_eq!(monitor.active_threats(), outcome.threats().to_vec());
        assert_eq!(monitor.security_score(), 100 - threat.severity.deduction());
        assert!(outcome.strategies.contains_key(threat.kind.as_str()));
        assert!((50..250).contains(&outcome.report.scan_duration_ms));

        if threat.severity == Severity::Critical {
            assert_eq!(outcome.mitigations.len(), 1);
            assert_eq!(outcome.mitigations[0].unit, responder_for(&threat.kind));
        } else {
            assert!(outcome.mitigations.is_empty());
        }
    }

    // history keeps only the configured number of threats
    assert_eq!(monitor.threat_history().len(), 5);
}

#[tokio::test]
async fn test_strategies_survive_a_quiet_scan() {
    let config = ThreatConfig {
        detection_probability: 1.0,
        seed: Some(3),
        ..ThreatConfig::default()
    };
    let monitor = ThreatMonitor::with_unit_latency(&config, Duration::ZERO);
    monitor.scan().await;
    let strategies = monitor.strategies();
    assert!(!strategies.is_empty());
    assert!(!monitor.active_threats().is_empty());

    monitor.set_detection_probability(0.0);
    let quiet = monitor.scan().await;

    assert!(quiet.threats().is_empty());
    assert!(quiet.strategies.is_empty());
    assert!(monitor.active_threats().is_empty());
    assert_eq!(monitor.security_score(), 100);
    assert_eq!(monitor.strategies(), strategies);
}

#[tokio::test]
async fn test_nan_probability_disables_detector() {
    let monitor = monitor(f64::NAN, 5);
    assert_eq!(monitor.detection_probability(), 0.0);
    for _ in 0..3 {
        assert!(monitor.scan().await.threats().is_empty());
    }

    monitor.set_detection_probability(f64::NAN);
    assert_eq!(monitor.detection_probability(), 0.0);
    monitor.set_detection_probability(7.5);
    assert_eq!(monitor.detection_probability(), 1.0);
}

#[test]
fn test_training_is_capped_and_shared_with_units() {
    let monitor = monitor(0.0, 4);
    monitor.learn(&json!({ "incidents": [] }));

    let first = monitor.train();
    assert!(first.accuracy >= 85.0 && first.accuracy < 87.0);
    assert_eq!(first.intel_observations, 1);

    let mut last = first.accuracy;
    for _ in 0..20 {
        let report = monitor.train();
        assert!(report.accuracy >= last);
        assert!(report.accuracy <= 98.0);
        last = report.accuracy;
    }

    for unit in monitor.team().units() {
        assert!(unit.knowledge().contains_key("time_based"), "{} missing patterns", unit.name());
    }
}

#[test]
fn test_canned_lists_are_available() {
    let monitor = monitor(0.0, 5);
    assert_eq!(monitor.recommendations().len(), 5);
    assert_eq!(monitor.active_measures().len(), 6);
    assert_eq!(monitor.team().roster().len(), 10);
}

struct CountingObserver {
    scans: AtomicUsize,
}

#[async_trait]
impl ScanObserver for CountingObserver {
    async fn on_scan(&self, _outcome: &ScanOutcome) {
        self.scans.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_patrol_reports_every_scan() {
    let monitor = Arc::new(monitor(0.5, 6));
    let observer = Arc::new(CountingObserver {
        scans: AtomicUsize::new(0),
    });

    let patrol = spawn_patrol(Arc::clone(&monitor), Duration::from_secs(60), observer.clone());
    tokio::time::sleep(Duration::from_secs(181)).await;
    patrol.abort();

    assert_eq!(observer.scans.load(Ordering::SeqCst), 3);
}
