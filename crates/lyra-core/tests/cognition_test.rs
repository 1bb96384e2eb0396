//! Cognition process: retention guarantees, sync hand-off and background loops.
//!
//! Run with: `cargo test -p lyra-core --test cognition_test`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use lyra_core::cognition::{self, SinkError};
use lyra_core::{CognitionBatch, CognitionConfig, CognitionEngine, CognitionSink, Interaction, ThoughtKind};

fn seeded(seed: u64) -> CognitionEngine {
    CognitionEngine::new(CognitionConfig {
        seed: Some(seed),
        ..CognitionConfig::default()
    })
}

#[derive(Default)]
struct MemorySink {
    batches: Mutex<Vec<CognitionBatch>>,
    fail: bool,
}

#[async_trait]
impl CognitionSink for MemorySink {
    async fn persist(&self, batch: CognitionBatch) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError("store offline".into()));
        }
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

#[test]
fn test_young_or_strong_thoughts_survive_pruning() {
    for seed in 0..5 {
        let engine = seeded(seed);
        for _ in 0..60 {
            engine.generate_random_thought();
        }
        let before = engine.recent_thoughts(100);
        let now = Utc::now();

        for offset_hours in [1, 24, 47, 60, 100, 167, 200] {
            let at = now + ChronoDuration::hours(offset_hours);
            let expected: Vec<String> = engine
                .recent_thoughts(100)
                .into_iter()
                .filter(|t| {
                    let age = at.signed_duration_since(t.timestamp);
                    age <= ChronoDuration::days(2) || (t.strength > 0.8 && age <= ChronoDuration::days(7))
                })
                .map(|t| t.id)
                .collect();
            engine.prune(at);
            let kept: Vec<String> = engine.recent_thoughts(100).into_iter().map(|t| t.id).collect();
            assert_eq!(kept, expected, "seed {} at +{}h", seed, offset_hours);
        }
        assert!(before.len() >= engine.thought_count());
    }
}

#[test]
fn test_dreams_and_imprints_are_not_pruned() {
    let engine = seeded(42);
    engine.update_user_imprint(
        "u7",
        Interaction {
            kind: "chat".into(),
            content: "hello".into(),
            ..Interaction::default()
        },
    );
    let dream = engine.generate_dream(Some("u7"));
    assert!(dream.participants.len() == 1);
    assert_eq!(dream.user_id.as_deref(), Some("u7"));

    engine.prune(Utc::now() + ChronoDuration::days(30));
    assert_eq!(engine.thought_count(), 0);
    assert_eq!(engine.dream_count(), 1);
    assert!(engine.user_imprint("u7").is_some());
}

#[test]
fn test_recent_accessors_are_newest_first() {
    let engine = seeded(1);
    for i in 0..4 {
        engine.generate_thought(ThoughtKind::Planning, format!("step {}", i), vec![]);
        std::thread::sleep(Duration::from_millis(2));
    }
    let recent = engine.recent_thoughts(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].content, "step 3");
    assert_eq!(recent[1].content, "step 2");
}

#[tokio::test]
async fn test_sync_hands_off_only_new_work() {
    let engine = seeded(5);
    let sink = MemorySink::default();

    engine.generate_thought(ThoughtKind::Memory, "first batch", vec![]);
    engine.generate_dream(None);
    let sent = engine.sync_once(&sink).await.expect("first sync");
    assert_eq!(sent, 2);

    engine.generate_thought(ThoughtKind::Memory, "second batch", vec![]);
    let sent = engine.sync_once(&sink).await.expect("second sync");
    assert_eq!(sent, 1);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches[1].thoughts[0].content, "second batch");
    assert!(batches[1].dreams.is_empty());
}

#[tokio::test]
async fn test_failed_sync_is_retried() {
    let engine = seeded(6);
    engine.generate_thought(ThoughtKind::Memory, "pending", vec![]);

    let broken = MemorySink {
        fail: true,
        ..MemorySink::default()
    };
    assert!(engine.sync_once(&broken).await.is_err());

    let working = MemorySink::default();
    assert_eq!(engine.sync_once(&working).await.expect("retry"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_loops_generate_and_sync() {
    let engine = Arc::new(CognitionEngine::new(CognitionConfig {
        thoughts_per_day: 10,
        dreams_per_day: 2,
        simulated_day_secs: 100,
        sync_interval_secs: 25,
        seed: Some(9),
        ..CognitionConfig::default()
    }));
    let sink = Arc::new(MemorySink::default());

    let tasks = cognition::spawn(Arc::clone(&engine), sink.clone());
    tokio::time::sleep(Duration::from_secs(101)).await;
    tasks.abort();

    // one thought every 10s, one dream every 50s
    assert_eq!(engine.thought_count(), 10);
    assert_eq!(engine.dream_count(), 2);
    assert_eq!(sink.batches.lock().unwrap().len(), 4);
}
