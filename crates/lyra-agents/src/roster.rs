//! Composition root: builds every service once and registers the agents on the bus.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use lyra_core::{
    cognition, spawn_patrol, AgentResponse, CognitionEngine, CognitionSink, CognitionTasks, CoreConfig,
    IntelligenceBus, RevenueOptimizer, TaskCoordinator, ThreatMonitor,
};

use crate::{HelpAgent, IntelligenceAgent, LyraAgent, MonetizationAgent, MonitorAgent, SecurityAgent};

/// Handles of the loops started by [`Services::start_background`].
pub struct BackgroundTasks {
    pub cognition: CognitionTasks,
    pub patrol: JoinHandle<()>,
}

impl BackgroundTasks {
    pub fn abort(&self) {
        self.cognition.abort();
        self.patrol.abort();
    }
}

/// Every long-lived service and agent of one Lyra process.
pub struct Services {
    pub config: CoreConfig,
    pub bus: Arc<IntelligenceBus>,
    pub optimizer: Arc<RevenueOptimizer>,
    pub coordinator: Arc<TaskCoordinator>,
    pub cognition: Arc<CognitionEngine>,
    pub threats: Arc<ThreatMonitor>,

    pub monetization: Arc<MonetizationAgent>,
    pub security: Arc<SecurityAgent>,
    pub intelligence: Arc<IntelligenceAgent>,
    pub monitor: Arc<MonitorAgent>,
    pub help: Arc<HelpAgent>,
    pub lyra: Arc<LyraAgent>,
}

impl Services {
    pub fn build(config: &CoreConfig) -> Self {
        let bus = Arc::new(IntelligenceBus::new(config.bus.audit_capacity));
        let optimizer = Arc::new(RevenueOptimizer::new(config.optimizer.clone()));
        let coordinator = Arc::new(TaskCoordinator::new(&config.pipeline));
        let cognition = Arc::new(CognitionEngine::new(config.cognition.clone()));
        let threats = Arc::new(ThreatMonitor::new(&config.threat));

        let monetization = Arc::new(MonetizationAgent::new(Arc::clone(&optimizer), bus.handle()));
        let security = Arc::new(SecurityAgent::new(Arc::clone(&threats), bus.handle()));
        let intelligence = Arc::new(IntelligenceAgent::new(bus.handle()));
        let monitor = Arc::new(MonitorAgent::new(bus.handle()));
        let help = Arc::new(HelpAgent::new());
        let lyra = Arc::new(LyraAgent::new(Arc::clone(&coordinator), Arc::clone(&cognition)));

        bus.register(monetization.clone());
        bus.register(security.clone());
        bus.register(intelligence.clone());
        bus.register(monitor.clone());
        bus.register(help.clone());
        bus.register(lyra.clone());
        info!(target: "lyra::agents", agents = ?bus.agent_names(), "services built");

        Self {
            config: config.clone(),
            bus,
            optimizer,
            coordinator,
            cognition,
            threats,
            monetization,
            security,
            intelligence,
            monitor,
            help,
            lyra,
        }
    }

    /// Start the cognition loops and the threat patrol. Must be called inside a tokio runtime.
    pub fn start_background(&self, sink: Arc<dyn CognitionSink>) -> BackgroundTasks {
        BackgroundTasks {
            cognition: cognition::spawn(Arc::clone(&self.cognition), sink),
            patrol: spawn_patrol(Arc::clone(&self.threats), self.config.threat.scan_interval(), self.security.clone()),
        }
    }

    pub async fn answer(&self, agent: &str, query: &str) -> AgentResponse {
        self.bus.answer(agent, query).await
    }
}
