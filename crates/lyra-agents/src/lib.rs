//! lyra-agents: the specialized agents and the composition root that wires them to the
//! core services.
//!
//! Agents talk to each other only through the intelligence bus; each holds a non-owning
//! [`lyra_core::BusHandle`] for publishing.

mod assistant;
mod help;
mod intelligence;
mod monetization;
mod monitor;
mod roster;
mod security;

pub use assistant::LyraAgent;
pub use help::{faq_answer, Escalation, HelpAgent, HelpArticle};
pub use intelligence::{IntelligenceAgent, KnowledgeBase, MarketTrends, UserBehavior};
pub use monetization::{
    match_advertisers, revenue_projection, Advertiser, MonetizationAgent, RevenueBreakdown, RevenueProjection,
    Strategy,
};
pub use monitor::{Incident, MonitorAgent, ProblemCause, SystemEvent, SystemHealth};
pub use roster::{BackgroundTasks, Services};
pub use security::SecurityAgent;

/// Routing keys of the agents registered by [`Services::build`].
pub mod names {
    pub use crate::assistant::AGENT_NAME as LYRA;
    pub use crate::help::AGENT_NAME as HELP;
    pub use crate::intelligence::AGENT_NAME as INTELLIGENCE;
    pub use crate::monetization::AGENT_NAME as MONETIZATION;
    pub use crate::monitor::AGENT_NAME as MONITOR;
    pub use crate::security::AGENT_NAME as SECURITY;
}
