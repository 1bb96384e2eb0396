//! Error taxonomy for the Lyra core.
//!
//! Empty optimizer selections and quiet threat scans are *not* errors; they come back as
//! ordinary empty results. Intelligence addressed to an unknown agent is logged and skipped.

use thiserror::Error;

use crate::pipeline::{Stage, TaskStatus, WorkerRole};

/// Failures that abort a pipeline request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// No worker of the required role could be acquired under the active acquire policy.
    #[error("no {role} workers available")]
    NoWorkerAvailable { role: WorkerRole },

    /// A worker's stage function returned an error.
    #[error("{stage} stage failed on {worker}: {reason}")]
    StageExecutionFailure {
        stage: Stage,
        worker: String,
        reason: String,
    },

    /// Attempted to move a request backwards through the status sequence.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// Failures raised while an agent answers a query.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("internal agent fault: {0}")]
    Internal(String),
}

/// Top-level error for callers that mix configuration, serialization and agent work.
#[derive(Debug, Error)]
pub enum LyraError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type AgentResult<T> = Result<T, AgentError>;
pub type LyraResult<T> = Result<T, LyraError>;
