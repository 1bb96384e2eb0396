//! Threat Detection Loop.
//!
//! A scan dispatches a nominal task to every defence unit concurrently and rolls the
//! probabilistic detector once. Findings replace the active threat set, get grouped into
//! mitigation strategies, and critical ones go straight to the unit responsible for their kind.
//! A quiet scan is an ordinary empty result.

mod team;

pub use team::{responder_for, DefenceTeam, SentinelUnit, TaskReport, UnitStatus};

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ThreatConfig;
use crate::shorthand::{log_short, ShortLevel};

const UNIT_LATENCY: Duration = Duration::from_millis(50);
const BASE_SCORE: u32 = 100;
const INITIAL_ACCURACY: f64 = 85.0;
const MAX_ACCURACY: f64 = 98.0;

const SOURCES: &[&str] = &["external-ip", "unknown-user", "suspicious-request", "bot-network"];
const TARGETS: &[&str] = &["auth-api", "database", "user-profile", "payment-system", "content-storage"];

// ---------------------------------------------------------------------------
// Threat records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

    /// Points removed from the security score per active threat.
    pub fn deduction(&self) -> u32 {
        match self {
            Severity::Critical => 20,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds the detector synthesizes, plus whatever other agents report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatKind {
    Authentication,
    Injection,
    Xss,
    MaliciousBehavior,
    DataLeak,
    Vulnerability,
    Other(String),
}

impl ThreatKind {
    pub const DETECTABLE: [ThreatKind; 6] = [
        ThreatKind::Authentication,
        ThreatKind::Injection,
        ThreatKind::Xss,
        ThreatKind::MaliciousBehavior,
        ThreatKind::DataLeak,
        ThreatKind::Vulnerability,
    ];

    pub fn parse(s: &str) -> Self {
        match s {
            "authentication" => ThreatKind::Authentication,
            "injection" => ThreatKind::Injection,
            "xss" => ThreatKind::Xss,
            "malicious-behavior" => ThreatKind::MaliciousBehavior,
            "data-leak" => ThreatKind::DataLeak,
            "vulnerability" => ThreatKind::Vulnerability,
            other => ThreatKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ThreatKind::Authentication => "authentication",
            ThreatKind::Injection => "injection",
            ThreatKind::Xss => "xss",
            ThreatKind::MaliciousBehavior => "malicious-behavior",
            ThreatKind::DataLeak => "data-leak",
            ThreatKind::Vulnerability => "vulnerability",
            ThreatKind::Other(s) => s,
        }
    }
}

impl fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: String,
    pub kind: ThreatKind,
    pub source: String,
    pub target: String,
    pub severity: Severity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

impl Threat {
    pub fn new(kind: ThreatKind, severity: Severity, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: format!("threat-{}", uuid::Uuid::new_v4().simple()),
            kind,
            source: source.into(),
            target: target.into(),
            severity,
            description: "Potential security issue detected".to_string(),
            detected_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub timestamp: DateTime<Utc>,
    pub detected_threats: Vec<Threat>,
    pub scan_duration_ms: u64,
}

/// Everything one scan produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub report: ScanReport,
    /// Strategies keyed by threat kind; empty when the scan was quiet.
    pub strategies: BTreeMap<String, Vec<String>>,
    /// Reports from units dispatched against critical threats.
    pub mitigations: Vec<TaskReport>,
}

impl ScanOutcome {
    pub fn threats(&self) -> &[Threat] {
        &self.report.detected_threats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Secure,
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSummary {
    pub status: ThreatLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_recent: Option<Threat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUpdates {
    pub new_patterns: BTreeMap<String, Value>,
    pub improvement_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,
    pub training_samples: usize,
    pub intel_observations: u64,
    pub model_updates: ModelUpdates,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// `100 - min(100, sum of deductions)`.
pub fn security_score(threats: &[Threat]) -> u32 {
    let deduction: u32 = threats.iter().map(|t| t.severity.deduction()).sum();
    BASE_SCORE - deduction.min(BASE_SCORE)
}

fn strategies_for(kind: &ThreatKind) -> &'static [&'static str] {
    match kind {
        ThreatKind::Authentication => &[
            "Enforce multi-factor authentication",
            "Implement account lockout after failed attempts",
            "Review authentication logs for patterns",
        ],
        ThreatKind::Injection | ThreatKind::Xss => &[
            "Validate and sanitize all user inputs",
            "Implement content security policy",
            "Use prepared statements for database queries",
        ],
        ThreatKind::DataLeak => &[
            "Encrypt sensitive data at rest and in transit",
            "Implement data access controls",
            "Review data access logs",
        ],
        _ => &[
            "Monitor system for suspicious activity",
            "Update security rules",
            "Review affected components",
        ],
    }
}

/// Group `threats` by kind and attach that kind's strategy list.
pub fn mitigation_strategies(threats: &[Threat]) -> BTreeMap<String, Vec<String>> {
    threats
        .iter()
        .map(|t| {
            let list = strategies_for(&t.kind).iter().map(|s| s.to_string()).collect();
            (t.kind.to_string(), list)
        })
        .collect()
}

pub fn summarize(threats: &[Threat]) -> ThreatSummary {
    if threats.is_empty() {
        return ThreatSummary {
            status: ThreatLevel::Secure,
            message: Some("No active threats detected".to_string()),
            counts: BTreeMap::new(),
            most_recent: None,
        };
    }

    let mut counts = BTreeMap::new();
    for threat in threats {
        *counts.entry(threat.severity.to_string()).or_insert(0) += 1;
    }
    let status = match threats.iter().map(|t| t.severity).max() {
        Some(Severity::Critical) => ThreatLevel::Critical,
        Some(Severity::High) => ThreatLevel::High,
        Some(Severity::Medium) => ThreatLevel::Moderate,
        _ => ThreatLevel::Low,
    };
    ThreatSummary {
        status,
        message: None,
        counts,
        most_recent: threats.first().cloned(),
    }
}

// ---------------------------------------------------------------------------
// Detector and model
// ---------------------------------------------------------------------------

struct ThreatDetector {
    probability: f64,
    capacity: usize,
    history: VecDeque<Threat>,
    latest: Option<ScanReport>,
    rng: StdRng,
}

/// Clamp to `[0, 1]`; NaN disables detection.
fn detection_chance(probability: f64) -> f64 {
    if probability.is_nan() {
        warn!(target: "lyra::threat", "detection probability is NaN; detector disabled");
        return 0.0;
    }
    probability.clamp(0.0, 1.0)
}

impl ThreatDetector {
    fn scan(&mut self) -> ScanReport {
        let mut detected = Vec::new();
        if self.rng.gen_bool(self.probability) {
            let rng = &mut self.rng;
            let kind = ThreatKind::DETECTABLE[rng.gen_range(0..ThreatKind::DETECTABLE.len())].clone();
            let severity = Severity::ALL[rng.gen_range(0..Severity::ALL.len())];
            let source = SOURCES.choose(rng).copied().unwrap_or("unknown");
            let target = TARGETS.choose(rng).copied().unwrap_or("unknown");
            let threat = Threat::new(kind, severity, source, target);

            self.history.push_back(threat.clone());
            while self.history.len() > self.capacity {
                self.history.pop_front();
            }
            detected.push(threat);
        }

        let report = ScanReport {
            timestamp: Utc::now(),
            detected_threats: detected,
            scan_duration_ms: self.rng.gen_range(50..250),
        };
        self.latest = Some(report.clone());
        report
    }
}

struct SecurityModel {
    accuracy: f64,
    patterns: BTreeMap<String, Value>,
    observations: u64,
}

impl SecurityModel {
    fn extract_patterns(&mut self) -> &BTreeMap<String, Value> {
        self.patterns = BTreeMap::from([
            (
                "time_based".to_string(),
                json!({
                    "peak_activity_hours": ["02:00-04:00", "14:00-16:00"],
                    "weekday_distribution": { "Mon": 12, "Wed": 15, "Fri": 18, "Sun": 8 }
                }),
            ),
            (
                "source_based".to_string(),
                json!({
                    "top_countries": ["Unknown", "Multiple"],
                    "network_patterns": ["Distributed requests", "VPN usage"]
                }),
            ),
        ]);
        &self.patterns
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct ThreatMonitor {
    team: DefenceTeam,
    detector: Mutex<ThreatDetector>,
    model: Mutex<SecurityModel>,
    active: RwLock<Vec<Threat>>,
    strategies: RwLock<BTreeMap<String, Vec<String>>>,
}

impl ThreatMonitor {
    pub fn new(config: &ThreatConfig) -> Self {
        Self::with_unit_latency(config, UNIT_LATENCY)
    }

    pub fn with_unit_latency(config: &ThreatConfig, latency: Duration) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let team = DefenceTeam::new(latency);
        log_short(
            ShortLevel::Info,
            &format!("security agent initialized with {} defence units", team.units().len()),
        );
        Self {
            team,
            detector: Mutex::new(ThreatDetector {
                probability: detection_chance(config.detection_probability),
                capacity: config.history_capacity,
                history: VecDeque::new(),
                latest: None,
                rng,
            }),
            model: Mutex::new(SecurityModel {
                accuracy: INITIAL_ACCURACY,
                patterns: BTreeMap::new(),
                observations: 0,
            }),
            active: RwLock::new(Vec::new()),
            strategies: RwLock::new(BTreeMap::new()),
        }
    }

    fn detector(&self) -> MutexGuard<'_, ThreatDetector> {
        self.detector.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn model(&self) -> MutexGuard<'_, SecurityModel> {
        self.model.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn team(&self) -> &DefenceTeam {
        &self.team
    }

    /// Run one full scan cycle.
    pub async fn scan(&self) -> ScanOutcome {
        log_short(ShortLevel::Info, "starting security scanning");
        join_all(self.team.units().iter().map(|u| u.perform_task("scan", None))).await;

        let report = self.detector().scan();
        let threats = report.detected_threats.clone();
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = threats.clone();

        let mut strategies = BTreeMap::new();
        let mut mitigations = Vec::new();
        if !threats.is_empty() {
            strategies = mitigation_strategies(&threats);
            *self.strategies.write().unwrap_or_else(|e| e.into_inner()) = strategies.clone();

            for threat in threats.iter().filter(|t| t.severity == Severity::Critical) {
                if let Some(unit) = self.team.responder(&threat.kind) {
                    warn!(target: "lyra::threat", threat = %threat.id, kind = %threat.kind, unit = unit.name(), "auto-mitigating critical threat");
                    mitigations.push(unit.perform_task("mitigate", Some(&threat.id)).await);
                }
            }
        }

        log_short(
            ShortLevel::Info,
            &format!("security scanning completed, {} threat detected", threats.len()),
        );
        ScanOutcome {
            report,
            strategies,
            mitigations,
        }
    }

    pub fn active_threats(&self) -> Vec<Threat> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn security_score(&self) -> u32 {
        security_score(&self.active.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn threat_summary(&self) -> ThreatSummary {
        summarize(&self.active.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn detection_probability(&self) -> f64 {
        self.detector().probability
    }

    /// Retune the detector; takes effect on the next scan.
    pub fn set_detection_probability(&self, probability: f64) {
        self.detector().probability = detection_chance(probability);
    }

    /// Strategies from the most recent scan that found anything.
    pub fn strategies(&self) -> BTreeMap<String, Vec<String>> {
        self.strategies.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn latest_scan(&self) -> Option<ScanReport> {
        self.detector().latest.clone()
    }

    /// Oldest first, bounded by the configured capacity.
    pub fn threat_history(&self) -> Vec<Threat> {
        self.detector().history.iter().cloned().collect()
    }

    pub fn model_accuracy(&self) -> f64 {
        self.model().accuracy
    }

    /// Improve the model from history and received intel, then share its patterns with every unit.
    pub fn train(&self) -> TrainingReport {
        let (gain, improvement, samples) = {
            let mut detector = self.detector();
            let samples = detector.history.len();
            (
                detector.rng.gen_range(0.0..2.0),
                detector.rng.gen_range(0.0f64..5.0),
                samples,
            )
        };

        let report = {
            let mut model = self.model();
            model.accuracy = (model.accuracy + gain).min(MAX_ACCURACY);
            let patterns = model.extract_patterns().clone();
            TrainingReport {
                timestamp: Utc::now(),
                accuracy: model.accuracy,
                training_samples: samples,
                intel_observations: model.observations,
                model_updates: ModelUpdates {
                    new_patterns: patterns,
                    improvement_percent: (improvement * 100.0).round() / 100.0,
                },
            }
        };

        for unit in self.team.units() {
            unit.update_knowledge(&report.model_updates.new_patterns);
        }
        log_short(
            ShortLevel::Info,
            &format!("security model training completed with {:.1}% accuracy", report.accuracy),
        );
        report
    }

    /// Record intel reported by another component.
    pub fn learn(&self, intel: &Value) {
        let mut model = self.model();
        model.observations += 1;
        debug!(target: "lyra::threat", observations = model.observations, keys = intel.as_object().map_or(0, |o| o.len()), "intel observed");
    }

    pub fn recommendations(&self) -> Vec<String> {
        [
            "Keep all dependencies updated",
            "Implement rate limiting for APIs",
            "Use HTTPS for all communications",
            "Review authentication mechanisms periodically",
            "Implement comprehensive logging and monitoring",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn active_measures(&self) -> Vec<String> {
        [
            "Request validation",
            "Authentication enforcement",
            "Input sanitization",
            "Session monitoring",
            "Rate limiting",
            "Anomaly detection",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Patrol loop
// ---------------------------------------------------------------------------

/// Receives every periodic scan outcome.
#[async_trait]
pub trait ScanObserver: Send + Sync {
    async fn on_scan(&self, outcome: &ScanOutcome);
}

/// Scan every `every` (clamped to at least one second) and hand each outcome to `observer`.
pub fn spawn_patrol(monitor: Arc<ThreatMonitor>, every: Duration, observer: Arc<dyn ScanObserver>) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    info!(target: "lyra::threat", interval_secs = every.as_secs(), "starting threat patrol");
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = monitor.scan().await;
            observer.on_scan(&outcome).await;
        }
    })
}
