//! Background loops and the persistence hand-off.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{CognitionBatch, CognitionEngine};

#[derive(Debug, Error)]
#[error("cognition sink failed: {0}")]
pub struct SinkError(pub String);

/// Durable store for cognition output. Receives everything created since the previous sync.
#[async_trait]
pub trait CognitionSink: Send + Sync {
    async fn persist(&self, batch: CognitionBatch) -> Result<(), SinkError>;
}

/// Sink that only logs batch sizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl CognitionSink for LogSink {
    async fn persist(&self, batch: CognitionBatch) -> Result<(), SinkError> {
        info!(
            target: "lyra::cognition",
            thoughts = batch.thoughts.len(),
            dreams = batch.dreams.len(),
            imprints = batch.imprints.len(),
            "cognition batch synced"
        );
        Ok(())
    }
}

impl CognitionEngine {
    /// Hand the pending batch to `sink`, then run the pruning sweep.
    ///
    /// The sync mark only advances when the sink accepts the batch, so a failed
    /// batch is offered again on the next call. Pruning runs either way.
    pub async fn sync_once(&self, sink: &dyn CognitionSink) -> Result<usize, SinkError> {
        let batch = self.changes_since(self.last_sync());
        let until = batch.until;
        let size = batch.thoughts.len() + batch.dreams.len() + batch.imprints.len();

        let persisted = sink.persist(batch).await;
        if persisted.is_ok() {
            self.mark_synced(until);
        }
        let pruned = self.prune(Utc::now());
        debug!(target: "lyra::cognition", size, pruned, "sync pass finished");
        persisted.map(|_| size)
    }
}

/// Handles for the three cognition loops.
pub struct CognitionTasks {
    pub thoughts: JoinHandle<()>,
    pub dreams: JoinHandle<()>,
    pub sync: JoinHandle<()>,
}

impl CognitionTasks {
    pub fn abort(&self) {
        self.thoughts.abort();
        self.dreams.abort();
        self.sync.abort();
    }
}

/// Start the thought generator, the dream generator and the sync/prune loop.
pub fn spawn(engine: Arc<CognitionEngine>, sink: Arc<dyn CognitionSink>) -> CognitionTasks {
    let thought_every = engine.config().thought_interval();
    let dream_every = engine.config().dream_interval();
    let sync_every = engine.config().sync_interval();
    info!(
        target: "lyra::cognition",
        thought_secs = thought_every.as_secs(),
        dream_secs = dream_every.as_secs(),
        sync_secs = sync_every.as_secs(),
        "starting cognition loops"
    );

    let thoughts = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + thought_every, thought_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.generate_random_thought();
            }
        })
    };

    let dreams = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + dream_every, dream_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.generate_dream(None);
            }
        })
    };

    let sync = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + sync_every, sync_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = engine.sync_once(sink.as_ref()).await {
                warn!(target: "lyra::cognition", error = %e, "cognition sync failed");
            }
        }
    });

    CognitionTasks { thoughts, dreams, sync }
}
