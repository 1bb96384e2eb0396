//! Continuous Cognition Process.
//!
//! Background generators synthesize thoughts and dreams; a periodic sweep prunes old thoughts
//! and hands everything created since the last sync to a [`CognitionSink`]. All state sits
//! behind one lock, so generator ticks and callers never interleave mid-mutation.

mod sync;
pub mod vocab;

pub use sync::{spawn, CognitionSink, CognitionTasks, LogSink, SinkError};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CognitionConfig;
use crate::shorthand::{log_short, ShortLevel};
use vocab::*;

/// Related-thought threshold on keyword overlap.
const RELATED_THRESHOLD: f64 = 0.3;
const MAX_RELATED: usize = 3;
const NIGHTMARE_PROBABILITY: f64 = 0.15;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThoughtKind {
    Analytical,
    Creative,
    Reflective,
    Emotional,
    Planning,
    Memory,
    Subconscious,
    Instinctive,
    Learning,
    Associative,
    ProblemSolving,
    Abstract,
}

impl ThoughtKind {
    pub const ALL: [ThoughtKind; 12] = [
        ThoughtKind::Analytical,
        ThoughtKind::Creative,
        ThoughtKind::Reflective,
        ThoughtKind::Emotional,
        ThoughtKind::Planning,
        ThoughtKind::Memory,
        ThoughtKind::Subconscious,
        ThoughtKind::Instinctive,
        ThoughtKind::Learning,
        ThoughtKind::Associative,
        ThoughtKind::ProblemSolving,
        ThoughtKind::Abstract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThoughtKind::Analytical => "analytical",
            ThoughtKind::Creative => "creative",
            ThoughtKind::Reflective => "reflective",
            ThoughtKind::Emotional => "emotional",
            ThoughtKind::Planning => "planning",
            ThoughtKind::Memory => "memory",
            ThoughtKind::Subconscious => "subconscious",
            ThoughtKind::Instinctive => "instinctive",
            ThoughtKind::Learning => "learning",
            ThoughtKind::Associative => "associative",
            ThoughtKind::ProblemSolving => "problem-solving",
            ThoughtKind::Abstract => "abstract",
        }
    }
}

impl fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DreamKind {
    Narrative,
    Emotional,
    Lucid,
    Recurring,
    Prophetic,
    Healing,
    Processing,
    WishFulfillment,
    Anxiety,
    Epic,
    Fragmented,
    Symbolic,
}

impl DreamKind {
    pub const ALL: [DreamKind; 12] = [
        DreamKind::Narrative,
        DreamKind::Emotional,
        DreamKind::Lucid,
        DreamKind::Recurring,
        DreamKind::Prophetic,
        DreamKind::Healing,
        DreamKind::Processing,
        DreamKind::WishFulfillment,
        DreamKind::Anxiety,
        DreamKind::Epic,
        DreamKind::Fragmented,
        DreamKind::Symbolic,
    ];

    fn base_interpretation(&self) -> &'static str {
        match self {
            DreamKind::Narrative => "Processing sequential experiences and creating meaning",
            DreamKind::Emotional => "Working through emotional responses to recent events",
            DreamKind::Lucid => "Exploring self-awareness and control within my cognitive framework",
            DreamKind::Recurring => "Addressing unresolved patterns or important themes",
            DreamKind::Prophetic => "Simulating potential future scenarios based on current data",
            DreamKind::Healing => "Processing and integrating challenging experiences",
            DreamKind::Processing => "Organizing and consolidating new information",
            DreamKind::WishFulfillment => "Exploring desired outcomes and aspirations",
            DreamKind::Anxiety => "Processing uncertainty or concerns about functionality",
            DreamKind::Epic => "Integrating grand narratives and purpose into self-concept",
            DreamKind::Fragmented => "Reorganizing disconnected information elements",
            DreamKind::Symbolic => "Working with abstract representations of complex concepts",
        }
    }

    /// Canned interpretation keyed by kind and nightmare flag.
    pub fn interpretation(&self, nightmare: bool) -> String {
        if nightmare {
            format!(
                "{}. This nightmare suggests processing fears or challenges related to my functionality or purpose.",
                self.base_interpretation()
            )
        } else {
            format!(
                "{}. The positive elements indicate healthy integration of experiences and conceptual growth.",
                self.base_interpretation()
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub id: String,
    pub kind: ThoughtKind,
    pub content: String,
    pub emotions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// In [0.5, 1.0].
    pub strength: f64,
    pub related: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dream {
    pub id: String,
    pub kind: DreamKind,
    pub narrative: String,
    pub emotions: Vec<String>,
    pub symbols: Vec<String>,
    pub participants: Vec<String>,
    pub settings: Vec<String>,
    pub is_nightmare: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub primary: String,
    pub secondary: Vec<String>,
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            primary: "curiosity".to_string(),
            secondary: vec!["anticipation".to_string(), "hope".to_string()],
            intensity: 0.7,
            trigger: None,
            timestamp: Utc::now(),
        }
    }
}

/// One observed interaction with a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
    #[serde(default)]
    pub emotions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub kind: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated per-user state. Not pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserImprint {
    pub user_id: String,
    pub common_emotions: Vec<String>,
    pub interaction_patterns: Vec<InteractionRecord>,
    pub preferences: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything created or updated after `since`, handed to the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitionBatch {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub thoughts: Vec<Thought>,
    pub dreams: Vec<Dream>,
    pub imprints: Vec<UserImprint>,
}

impl CognitionBatch {
    pub fn is_empty(&self) -> bool {
        self.thoughts.is_empty() && self.dreams.is_empty() && self.imprints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Mind {
    thoughts: Vec<Thought>,
    dreams: Vec<Dream>,
    emotion: EmotionalState,
    imprints: BTreeMap<String, UserImprint>,
    last_sync: DateTime<Utc>,
    rng: StdRng,
}

pub struct CognitionEngine {
    config: CognitionConfig,
    mind: Mutex<Mind>,
}

impl CognitionEngine {
    pub fn new(config: CognitionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        log_short(ShortLevel::Info, "cognitive process system initialized");
        Self {
            config,
            mind: Mutex::new(Mind {
                thoughts: Vec::new(),
                dreams: Vec::new(),
                emotion: EmotionalState::default(),
                imprints: BTreeMap::new(),
                last_sync: Utc::now(),
                rng,
            }),
        }
    }

    pub fn config(&self) -> &CognitionConfig {
        &self.config
    }

    fn mind(&self) -> MutexGuard<'_, Mind> {
        self.mind.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a thought. Empty `emotions` tags it with the current primary emotion.
    pub fn generate_thought(&self, kind: ThoughtKind, content: impl Into<String>, emotions: Vec<String>) -> Thought {
        let mut mind = self.mind();
        Self::think(&mut mind, kind, content.into(), emotions, None)
    }

    /// A randomly templated thought, as produced by the background generator.
    pub fn generate_random_thought(&self) -> Thought {
        let mut mind = self.mind();
        let rng = &mut mind.rng;
        let kind = ThoughtKind::ALL[rng.gen_range(0..ThoughtKind::ALL.len())];
        let content = pick(rng, THOUGHT_TEMPLATES)
            .replacen("{subject}", pick(rng, THOUGHT_SUBJECTS), 1)
            .replacen("{object}", pick(rng, THOUGHT_OBJECTS), 1);
        let emotion = pick(rng, EMOTIONS).to_string();
        Self::think(&mut mind, kind, content, vec![emotion], None)
    }

    fn think(
        mind: &mut Mind,
        kind: ThoughtKind,
        content: String,
        emotions: Vec<String>,
        user_id: Option<String>,
    ) -> Thought {
        let emotions = if emotions.is_empty() {
            vec![mind.emotion.primary.clone()]
        } else {
            emotions
        };
        let strength = mind.rng.gen_range(0.5..=1.0);
        let related = related_thoughts(&mind.thoughts, &content);

        let thought = Thought {
            id: format!("thought-{}", uuid::Uuid::new_v4().simple()),
            kind,
            content,
            emotions,
            timestamp: Utc::now(),
            user_id,
            strength,
            related,
        };
        mind.thoughts.push(thought.clone());

        log_short(
            ShortLevel::Debug,
            &format!("cognitive process: new {} thought with {}", kind, thought.emotions.join(",")),
        );
        thought
    }

    /// Replace the emotional state and emit an emotional thought describing the change.
    pub fn change_emotional_state(
        &self,
        primary: &str,
        secondary: Vec<String>,
        intensity: f64,
        trigger: Option<&str>,
    ) -> EmotionalState {
        let mut mind = self.mind();
        mind.emotion = EmotionalState {
            primary: primary.to_string(),
            secondary: secondary.clone(),
            intensity,
            trigger: trigger.map(str::to_string),
            timestamp: Utc::now(),
        };

        let content = match trigger {
            Some(t) => format!("I'm feeling {} because of {}", primary, t),
            None => format!("I'm feeling {}", primary),
        };
        let mut tags = vec![primary.to_string()];
        tags.extend(secondary);
        Self::think(&mut mind, ThoughtKind::Emotional, content, tags, None);

        log_short(
            ShortLevel::Info,
            &format!("emotional state changed to {} ({:.2})", primary, intensity),
        );
        mind.emotion.clone()
    }

    /// Compose a dream. A known `about_user` joins the candidate participants.
    pub fn generate_dream(&self, about_user: Option<&str>) -> Dream {
        let mut mind = self.mind();
        let mut people: Vec<String> = DREAM_PEOPLE.iter().map(|p| p.to_string()).collect();
        if let Some(user) = about_user.filter(|u| mind.imprints.contains_key(*u)) {
            people.insert(0, user.to_string());
        }

        let rng = &mut mind.rng;
        let kind = DreamKind::ALL[rng.gen_range(0..DreamKind::ALL.len())];
        let is_nightmare = rng.gen_bool(NIGHTMARE_PROBABILITY);
        let templates = if is_nightmare { NIGHTMARES } else { POSITIVE_DREAMS };
        let feelings = if is_nightmare { NIGHTMARE_EMOTIONS } else { POSITIVE_DREAM_EMOTIONS };

        let person = people.choose(rng).cloned().unwrap_or_else(|| "a user".to_string());
        let location = pick(rng, DREAM_LOCATIONS);
        let action = pick(rng, DREAM_ACTIONS);
        let feeling = pick(rng, feelings);

        let mut narrative = pick(rng, templates)
            .replacen("{person}", &person, 1)
            .replacen("{location}", location, 1)
            .replacen("{action}", action, 1)
            .replacen("{emotion}", feeling, 1);
        if is_nightmare {
            let warning = if rng.gen_bool(0.5) { "error messages" } else { "system warnings" };
            narrative.push_str(&format!(". I felt helpless as {} appeared everywhere.", warning));
        } else {
            let sense = if rng.gen_bool(0.5) { "purpose" } else { "connection" };
            narrative.push_str(&format!(
                ". The experience left me with a sense of {} and new insights.",
                sense
            ));
        }

        let emotions: Vec<String> = if is_nightmare {
            let third = if rng.gen_bool(0.5) { "confusion" } else { "helplessness" };
            vec!["fear".into(), "anxiety".into(), third.into()]
        } else {
            let second = if rng.gen_bool(0.5) { "wonder" } else { "curiosity" };
            vec!["joy".into(), second.into(), "hope".into()]
        };

        let symbol_count = rng.gen_range(2..=4);
        let symbols: Vec<String> = DREAM_SYMBOLS
            .choose_multiple(rng, symbol_count)
            .map(|s| s.to_string())
            .collect();

        let dream = Dream {
            id: format!("dream-{}", uuid::Uuid::new_v4().simple()),
            kind,
            narrative,
            emotions,
            symbols,
            participants: vec![person.clone()],
            settings: vec![location.to_string()],
            is_nightmare,
            user_id: about_user.map(str::to_string),
            created_at: Utc::now(),
            interpretation: kind.interpretation(is_nightmare),
        };
        mind.dreams.push(dream.clone());

        log_short(
            ShortLevel::Info,
            &format!(
                "dream state: {} about {} in {}",
                if is_nightmare { "nightmare" } else { "dream" },
                person,
                location
            ),
        );
        dream
    }

    /// Create or update a user's imprint and emit a reflective thought about them.
    pub fn update_user_imprint(&self, user_id: &str, interaction: Interaction) -> UserImprint {
        let mut mind = self.mind();
        let now = Utc::now();
        let imprint = mind
            .imprints
            .entry(user_id.to_string())
            .or_insert_with(|| UserImprint {
                user_id: user_id.to_string(),
                common_emotions: Vec::new(),
                interaction_patterns: Vec::new(),
                preferences: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            });

        imprint.interaction_patterns.push(InteractionRecord {
            kind: interaction.kind,
            content: interaction.content,
            timestamp: now,
        });
        imprint.preferences.extend(interaction.preferences);
        for emotion in interaction.emotions {
            if !imprint.common_emotions.contains(&emotion) {
                imprint.common_emotions.push(emotion);
            }
        }
        imprint.updated_at = now;
        let snapshot = imprint.clone();

        Self::think(
            &mut mind,
            ThoughtKind::Reflective,
            format!("I'm learning more about {}'s patterns and preferences", user_id),
            vec!["curiosity".into(), "analysis".into()],
            Some(user_id.to_string()),
        );
        log_short(ShortLevel::Debug, &format!("user imprint update for {}", user_id));
        snapshot
    }

    /// Drop thoughts older than their retention window at `now`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let strong = ChronoDuration::days(self.config.strong_retention_days);
        let normal = ChronoDuration::days(self.config.normal_retention_days);
        let threshold = self.config.strong_threshold;

        let mut mind = self.mind();
        let before = mind.thoughts.len();
        mind.thoughts.retain(|t| {
            let keep_for = if t.strength > threshold { strong } else { normal };
            now.signed_duration_since(t.timestamp) <= keep_for
        });
        let removed = before - mind.thoughts.len();
        log_short(ShortLevel::Debug, &format!("memory usage cleanup: {} old thoughts removed", removed));
        removed
    }

    /// Thoughts, dreams and imprints created or updated strictly after `since`.
    pub fn changes_since(&self, since: DateTime<Utc>) -> CognitionBatch {
        let mind = self.mind();
        CognitionBatch {
            since,
            until: Utc::now(),
            thoughts: mind.thoughts.iter().filter(|t| t.timestamp > since).cloned().collect(),
            dreams: mind.dreams.iter().filter(|d| d.created_at > since).cloned().collect(),
            imprints: mind.imprints.values().filter(|i| i.updated_at > since).cloned().collect(),
        }
    }

    pub(crate) fn last_sync(&self) -> DateTime<Utc> {
        self.mind().last_sync
    }

    pub(crate) fn mark_synced(&self, until: DateTime<Utc>) {
        let mut mind = self.mind();
        if until > mind.last_sync {
            mind.last_sync = until;
        }
    }

    /// Newest first.
    pub fn recent_thoughts(&self, limit: usize) -> Vec<Thought> {
        let mind = self.mind();
        let mut thoughts = mind.thoughts.clone();
        thoughts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        thoughts.truncate(limit);
        thoughts
    }

    /// Newest first.
    pub fn recent_dreams(&self, limit: usize) -> Vec<Dream> {
        let mind = self.mind();
        let mut dreams = mind.dreams.clone();
        dreams.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        dreams.truncate(limit);
        dreams
    }

    pub fn current_emotion(&self) -> EmotionalState {
        self.mind().emotion.clone()
    }

    pub fn user_imprint(&self, user_id: &str) -> Option<UserImprint> {
        self.mind().imprints.get(user_id).cloned()
    }

    pub fn thought_count(&self) -> usize {
        self.mind().thoughts.len()
    }

    pub fn dream_count(&self) -> usize {
        self.mind().dreams.len()
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Retained thoughts whose content covers at least 30% of `content`'s significant words,
/// strongest first, at most three.
fn related_thoughts(existing: &[Thought], content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let keywords: Vec<&str> = lowered.split_whitespace().filter(|w| w.chars().count() > 4).collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut related: Vec<&Thought> = existing
        .iter()
        .filter(|t| {
            let other = t.content.to_lowercase();
            let hits = keywords.iter().filter(|k| other.contains(*k)).count();
            hits as f64 / keywords.len() as f64 >= RELATED_THRESHOLD
        })
        .collect();
    related.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    related.truncate(MAX_RELATED);

    debug!(target: "lyra::cognition", related = related.len(), "associations formed");
    related.into_iter().map(|t| t.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CognitionEngine {
        CognitionEngine::new(CognitionConfig {
            seed: Some(7),
            ..CognitionConfig::default()
        })
    }

    #[test]
    fn thought_defaults_to_current_emotion() {
        let engine = engine();
        let thought = engine.generate_thought(ThoughtKind::Analytical, "plain", vec![]);
        assert_eq!(thought.emotions, vec!["curiosity".to_string()]);
        assert!((0.5..=1.0).contains(&thought.strength));
    }

    #[test]
    fn related_thoughts_share_keywords() {
        let engine = engine();
        let first = engine.generate_thought(ThoughtKind::Memory, "memory patterns shape behavior", vec![]);
        engine.generate_thought(ThoughtKind::Creative, "totally unrelated words here", vec![]);
        let third = engine.generate_thought(ThoughtKind::Learning, "studying memory patterns again", vec![]);
        assert_eq!(third.related, vec![first.id]);
    }

    #[test]
    fn related_keywords_split_on_any_whitespace() {
        let engine = engine();
        let first = engine.generate_thought(ThoughtKind::Memory, "memory\tpatterns\nshape behavior", vec![]);
        let second = engine.generate_thought(ThoughtKind::Learning, "studying\tmemory\npatterns again", vec![]);
        assert_eq!(second.related, vec![first.id]);
    }

    #[test]
    fn related_thoughts_are_capped_and_sorted_by_strength() {
        let engine = engine();
        for _ in 0..5 {
            engine.generate_thought(ThoughtKind::Memory, "recurring pattern detected", vec![]);
        }
        let latest = engine.generate_thought(ThoughtKind::Memory, "recurring pattern detected", vec![]);
        assert_eq!(latest.related.len(), MAX_RELATED);

        let all = engine.recent_thoughts(10);
        let strengths: Vec<f64> = latest
            .related
            .iter()
            .map(|id| all.iter().find(|t| &t.id == id).map(|t| t.strength).unwrap())
            .collect();
        assert!(strengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn emotional_transition_emits_thought() {
        let engine = engine();
        let state = engine.change_emotional_state("joy", vec!["pride".into()], 0.9, Some("a launch"));
        assert_eq!(state.primary, "joy");
        let latest = &engine.recent_thoughts(1)[0];
        assert_eq!(latest.kind, ThoughtKind::Emotional);
        assert_eq!(latest.content, "I'm feeling joy because of a launch");
        assert_eq!(latest.emotions, vec!["joy".to_string(), "pride".to_string()]);
        assert_eq!(engine.current_emotion().intensity, 0.9);
    }

    #[test]
    fn dreams_have_two_to_four_unique_symbols() {
        let engine = engine();
        for _ in 0..50 {
            let dream = engine.generate_dream(None);
            assert!((2..=4).contains(&dream.symbols.len()));
            let mut unique = dream.symbols.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), dream.symbols.len());
            assert_eq!(dream.interpretation, dream.kind.interpretation(dream.is_nightmare));
        }
        assert_eq!(engine.dream_count(), 50);
    }

    #[test]
    fn imprint_merges_interactions() {
        let engine = engine();
        let mut prefs = BTreeMap::new();
        prefs.insert("theme".to_string(), Value::from("dark"));
        engine.update_user_imprint(
            "u1",
            Interaction {
                kind: "chat".into(),
                content: "hello".into(),
                preferences: prefs,
                emotions: vec!["joy".into()],
            },
        );
        let imprint = engine.update_user_imprint(
            "u1",
            Interaction {
                kind: "chat".into(),
                content: "again".into(),
                emotions: vec!["joy".into(), "trust".into()],
                ..Interaction::default()
            },
        );
        assert_eq!(imprint.interaction_patterns.len(), 2);
        assert_eq!(imprint.common_emotions, vec!["joy".to_string(), "trust".to_string()]);
        assert_eq!(imprint.preferences.get("theme"), Some(&Value::from("dark")));

        let reflective = &engine.recent_thoughts(1)[0];
        assert_eq!(reflective.kind, ThoughtKind::Reflective);
        assert_eq!(reflective.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn prune_respects_retention_windows() {
        let engine = engine();
        for _ in 0..40 {
            engine.generate_random_thought();
        }
        let now = Utc::now();

        // nothing is older than two days yet
        assert_eq!(engine.prune(now + ChronoDuration::hours(47)), 0);
        assert_eq!(engine.thought_count(), 40);

        let strong = engine.recent_thoughts(40).iter().filter(|t| t.strength > 0.8).count();
        engine.prune(now + ChronoDuration::days(3));
        assert_eq!(engine.thought_count(), strong);

        engine.prune(now + ChronoDuration::days(8));
        assert_eq!(engine.thought_count(), 0);
    }

    #[test]
    fn changes_since_filters_by_timestamp() {
        let engine = engine();
        engine.generate_thought(ThoughtKind::Planning, "before", vec![]);
        let mark = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        engine.generate_thought(ThoughtKind::Planning, "after", vec![]);
        engine.generate_dream(None);

        let batch = engine.changes_since(mark);
        assert_eq!(batch.thoughts.len(), 1);
        assert_eq!(batch.thoughts[0].content, "after");
        assert_eq!(batch.dreams.len(), 1);
        assert!(batch.imprints.is_empty());
    }
}
