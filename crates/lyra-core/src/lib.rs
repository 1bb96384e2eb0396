//! lyra-core: services behind the Lyra agent platform.
//!
//! Intelligence routing between agents, the revenue optimizer, the worker-pool task pipeline,
//! the background cognition process and the threat detection loop. Every service is an
//! explicitly constructed value; nothing here is a process-wide singleton except the
//! shorthand logging dictionary.

pub mod bus;
pub mod cognition;
mod config;
mod envelope;
mod error;
pub mod optimizer;
pub mod pipeline;
pub mod shorthand;
pub mod threat;

// Configuration
pub use config::{
    BusConfig, CognitionConfig, CoreConfig, DaemonConfig, OptimizerConfig, PipelineConfig, ThreatConfig,
};

// Errors
pub use error::{AgentError, AgentResult, LyraError, LyraResult, PipelineError, PipelineResult};

// Query envelope
pub use envelope::{AgentResponse, QueryOutcome};

// Intelligence Bus
pub use bus::{Agent, BusHandle, IntelligenceBus, IntelligenceKind, IntelligenceMessage, RouteRecord, RouteReport};

// Revenue Optimization Engine
pub use optimizer::{
    OpportunityAnalysis, OptimizationParams, OptimizationResult, ResolvedParams, RevenueOpportunity,
    RevenueOptimizer,
};

// Worker-Pool Task Pipeline
pub use pipeline::{
    AcquirePolicy, CoordinatorState, CoordinatorStatus, Stage, StageHandlers, StepResult, StepStatus,
    TaskCoordinator, TaskOutcome, TaskRequest, TaskResult, TaskStatus, WorkerLease, WorkerPool, WorkerRole,
};

// Continuous Cognition Process
pub use cognition::{
    CognitionBatch, CognitionEngine, CognitionSink, CognitionTasks, Dream, DreamKind, EmotionalState,
    Interaction, LogSink, SinkError, Thought, ThoughtKind, UserImprint,
};

// Threat Detection Loop
pub use threat::{
    spawn_patrol, ScanObserver, ScanOutcome, ScanReport, Severity, Threat, ThreatKind, ThreatLevel,
    ThreatMonitor, ThreatSummary, TrainingReport,
};

// Shorthand logging
pub use shorthand::{log_short, ShortLevel};
