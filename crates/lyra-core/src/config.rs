//! Layered configuration for every Lyra service.
//!
//! Precedence (highest first): environment `LYRA__<SECTION>__<KEY>` > TOML file at `LYRA_CONFIG`
//! (default `config/lyra.toml`, only if it exists) > built-in defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default config file stem; `config` resolves the `.toml` extension.
const DEFAULT_CONFIG_PATH: &str = "config/lyra";

/// Floor applied to every periodic interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Defaults for `RevenueOptimizer::run_optimization` when a parameter is omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    pub risk_tolerance: f64,
    pub time_horizon_days: f64,
    pub initial_budget: f64,
    /// Implementation cost per point of complexity.
    pub cost_per_complexity: f64,
    /// Revenue boost per accepted synergy partner.
    pub synergy_boost: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            risk_tolerance: 5.0,
            time_horizon_days: 90.0,
            initial_budget: 5000.0,
            cost_per_complexity: 500.0,
            synergy_boost: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub processors: usize,
    pub collectors: usize,
    pub analyzers: usize,
    pub executors: usize,
    pub monitors: usize,
    /// When set, stages wait up to this long for a worker instead of failing immediately.
    pub acquire_timeout_ms: Option<u64>,
    /// Upper bound of the random delay each default stage handler sleeps for.
    pub simulated_latency_ms: u64,
    /// Default `limit` for history queries.
    pub history_limit: usize,
    /// Seed for the simulated stage handlers' random delays.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processors: 3,
            collectors: 2,
            analyzers: 2,
            executors: 2,
            monitors: 1,
            acquire_timeout_ms: None,
            simulated_latency_ms: 100,
            history_limit: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CognitionConfig {
    pub thoughts_per_day: u32,
    pub dreams_per_day: u32,
    /// Length of one simulated day. Shorten it to speed the generators up.
    pub simulated_day_secs: u64,
    pub sync_interval_secs: u64,
    pub strong_retention_days: i64,
    pub normal_retention_days: i64,
    /// Thoughts strictly above this strength use the strong retention window.
    pub strong_threshold: f64,
    pub seed: Option<u64>,
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self {
            thoughts_per_day: 6000,
            dreams_per_day: 3,
            simulated_day_secs: 86_400,
            sync_interval_secs: 300,
            strong_retention_days: 7,
            normal_retention_days: 2,
            strong_threshold: 0.8,
            seed: None,
        }
    }
}

impl CognitionConfig {
    pub fn thought_interval(&self) -> Duration {
        per_day_interval(self.simulated_day_secs, self.thoughts_per_day)
    }

    pub fn dream_interval(&self) -> Duration {
        per_day_interval(self.simulated_day_secs, self.dreams_per_day)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs).max(MIN_INTERVAL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThreatConfig {
    pub scan_interval_secs: u64,
    pub detection_probability: f64,
    pub history_capacity: usize,
    pub seed: Option<u64>,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60,
            detection_probability: 0.2,
            history_capacity: 100,
            seed: None,
        }
    }
}

impl ThreatConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs).max(MIN_INTERVAL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    pub audit_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { audit_capacity: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    pub tick_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { tick_secs: 30 }
    }
}

impl DaemonConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs).max(MIN_INTERVAL)
    }
}

// ---------------------------------------------------------------------------
// CoreConfig
// ---------------------------------------------------------------------------

/// Root configuration shared by the composition root and the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub optimizer: OptimizerConfig,
    pub pipeline: PipelineConfig,
    pub cognition: CognitionConfig,
    pub threat: ThreatConfig,
    pub bus: BusConfig,
    pub daemon: DaemonConfig,
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `LYRA__*` > `LYRA_CONFIG` path > `config/lyra.toml` > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("LYRA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same layering as [`CoreConfig::load`] with an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder();

        let with_toml = path.with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if with_toml.is_file() {
            builder.add_source(config::File::from(with_toml.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("LYRA").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}

fn per_day_interval(day_secs: u64, per_day: u32) -> Duration {
    let per_day = per_day.max(1);
    Duration::from_secs_f64(day_secs as f64 / per_day as f64).max(MIN_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.optimizer.risk_tolerance, 5.0);
        assert_eq!(cfg.optimizer.time_horizon_days, 90.0);
        assert_eq!(cfg.optimizer.initial_budget, 5000.0);
        assert_eq!(cfg.pipeline.processors, 3);
        assert_eq!(cfg.pipeline.monitors, 1);
        assert!(cfg.pipeline.acquire_timeout_ms.is_none());
        assert_eq!(cfg.threat.history_capacity, 100);
    }

    #[test]
    fn intervals_are_clamped_to_one_second() {
        let cognition = CognitionConfig::default();
        // 86400 / 6000 = 14.4s
        assert_eq!(cognition.thought_interval(), Duration::from_secs_f64(14.4));
        assert_eq!(cognition.dream_interval(), Duration::from_secs(28_800));

        let fast = CognitionConfig {
            simulated_day_secs: 10,
            ..CognitionConfig::default()
        };
        assert_eq!(fast.thought_interval(), MIN_INTERVAL);

        let threat = ThreatConfig {
            scan_interval_secs: 0,
            ..ThreatConfig::default()
        };
        assert_eq!(threat.scan_interval(), MIN_INTERVAL);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[pipeline]\ncollectors = 4\nacquire_timeout_ms = 250\n\n[optimizer]\ninitial_budget = 12000.0"
        )
        .unwrap();

        let cfg = CoreConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.pipeline.collectors, 4);
        assert_eq!(cfg.pipeline.acquire_timeout_ms, Some(250));
        assert_eq!(cfg.optimizer.initial_budget, 12000.0);
        // untouched sections keep their defaults
        assert_eq!(cfg.pipeline.processors, 3);
        assert_eq!(cfg.cognition, CognitionConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CoreConfig::load_from(&dir.path().join("absent")).unwrap();
        assert_eq!(cfg.bus, BusConfig::default());
    }
}
