//! Shorthand logging: a compact abbreviation dictionary applied to log lines.
//!
//! `encode` swaps whole-word phrases for their codes ("system" → `SYS`), `decode` reverses it.
//! The dictionary is process-wide and can be extended at runtime.

use std::collections::BTreeMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;

/// Built-in code → phrase entries.
const BUILTIN: &[(&str, &str)] = &[
    // system operations
    ("SYS", "system"),
    ("INIT", "initialized"),
    ("CFG", "configuration"),
    ("PROC", "processing"),
    ("COMP", "completed"),
    ("ERR", "error"),
    ("WARN", "warning"),
    ("INFO", "information"),
    ("DBG", "debug"),
    // agents
    ("AI", "artificial intelligence"),
    ("AGT", "agent"),
    ("ML", "machine learning"),
    ("NLP", "natural language processing"),
    ("PRED", "prediction"),
    ("ANLZ", "analyze"),
    ("INTEL", "intelligence"),
    ("RESP", "response"),
    ("QRY", "query"),
    // users
    ("USR", "user"),
    ("AUTH", "authentication"),
    ("REQ", "request"),
    ("SESS", "session"),
    ("UI", "user interface"),
    ("ACT", "action"),
    // communication
    ("COMM", "communication"),
    ("MSG", "message"),
    ("NTFY", "notify"),
    ("BCAST", "broadcast"),
    ("RECV", "received"),
    ("SENT", "sent"),
    // security
    ("SEC", "security"),
    ("PROT", "protection"),
    ("VULN", "vulnerability"),
    ("THRT", "threat"),
    ("DET", "detected"),
    ("BLOCK", "blocked"),
    ("SCAN", "scanning"),
    // performance
    ("PERF", "performance"),
    ("OPT", "optimize"),
    ("LOAD", "loading"),
    ("CPU", "processor usage"),
    ("MEM", "memory usage"),
    ("BW", "bandwidth"),
    // status
    ("OK", "successful"),
    ("NOK", "unsuccessful"),
    ("UP", "online"),
    ("DOWN", "offline"),
    ("PROG", "in progress"),
    ("WAIT", "waiting"),
    // time
    ("NOW", "current time"),
    ("PREV", "previous"),
    ("NEXT", "next"),
    ("DUR", "duration"),
    // data
    ("DB", "database"),
    ("STOR", "storage"),
    ("SYNC", "synchronize"),
    ("UPDT", "update"),
    ("DEL", "delete"),
    ("INS", "insert"),
    // network
    ("NET", "network"),
    ("API", "api call"),
    ("HTTP", "http request"),
    ("WS", "websocket"),
    ("CONN", "connection"),
    ("DISC", "disconnection"),
    // cognition
    ("COG", "cognitive process"),
    ("EMO", "emotional state"),
    ("MEMR", "memory retrieval"),
    ("DREAM", "dream state"),
    ("SUBC", "subconscious"),
    ("CONS", "conscious thought"),
    ("PRCPT", "perception"),
    ("INTNT", "intention"),
    ("DECSN", "decision making"),
    ("FOCUS", "attention focus"),
    ("CREAT", "creative process"),
    ("LEARN", "learning process"),
    ("RECAL", "recall information"),
    ("ASSOC", "association formation"),
    ("EVAL", "evaluation"),
    ("REACT", "reaction"),
    ("EMPTH", "empathy response"),
    ("MOOD", "mood state"),
    // lifecycle
    ("BOOT", "bootup process"),
    ("STRT", "starting system"),
    ("HALT", "halting system"),
    ("RSTR", "restart system"),
];

/// Severity passed to [`log_short`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl ShortLevel {
    pub fn code(&self) -> &'static str {
        match self {
            ShortLevel::Debug => "DBG",
            ShortLevel::Info => "INFO",
            ShortLevel::Warn => "WARN",
            ShortLevel::Error => "ERR",
        }
    }
}

struct Entry {
    code: String,
    phrase: String,
    encoder: Regex,
    decoder: Regex,
}

impl Entry {
    fn new(code: &str, phrase: &str) -> Option<Self> {
        let encoder = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase))).ok()?;
        let decoder = Regex::new(&format!(r"\b{}\b", regex::escape(code))).ok()?;
        Some(Self {
            code: code.to_string(),
            phrase: phrase.to_string(),
            encoder,
            decoder,
        })
    }
}

/// Abbreviation dictionary with precompiled whole-word matchers.
pub struct ShorthandDictionary {
    entries: RwLock<Vec<Entry>>,
}

impl ShorthandDictionary {
    pub fn builtin() -> Self {
        let dict = Self {
            entries: RwLock::new(Vec::new()),
        };
        dict.extend(BUILTIN.iter().copied());
        dict
    }

    /// Add or override entries. Longer phrases are kept first so they encode before their prefixes.
    pub fn extend<'a, I>(&self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for (code, phrase) in entries {
            let Some(entry) = Entry::new(code, phrase) else {
                tracing::warn!(target: "lyra::shorthand", code, "rejected shorthand entry");
                continue;
            };
            guard.retain(|e| e.code != entry.code);
            guard.push(entry);
        }
        guard.sort_by(|a, b| b.phrase.len().cmp(&a.phrase.len()));
    }

    pub fn encode(&self, message: &str) -> String {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().fold(message.to_string(), |acc, entry| {
            entry.encoder.replace_all(&acc, entry.code.as_str()).into_owned()
        })
    }

    pub fn decode(&self, message: &str) -> String {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().fold(message.to_string(), |acc, entry| {
            entry.decoder.replace_all(&acc, entry.phrase.as_str()).into_owned()
        })
    }

    /// Snapshot of code → phrase.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard
            .iter()
            .map(|e| (e.code.clone(), e.phrase.clone()))
            .collect()
    }
}

static DICTIONARY: Lazy<ShorthandDictionary> = Lazy::new(ShorthandDictionary::builtin);

pub fn encode(message: &str) -> String {
    DICTIONARY.encode(message)
}

pub fn decode(message: &str) -> String {
    DICTIONARY.decode(message)
}

pub fn dictionary() -> BTreeMap<String, String> {
    DICTIONARY.snapshot()
}

pub fn extend<'a, I>(entries: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    DICTIONARY.extend(entries)
}

/// Emit `message` in shorthand form on the `lyra::shorthand` target.
pub fn log_short(level: ShortLevel, message: &str) {
    let encoded = encode(message);
    match level {
        ShortLevel::Debug => tracing::debug!(target: "lyra::shorthand", level = level.code(), "{}", encoded),
        ShortLevel::Info => tracing::info!(target: "lyra::shorthand", level = level.code(), "{}", encoded),
        ShortLevel::Warn => tracing::warn!(target: "lyra::shorthand", level = level.code(), "{}", encoded),
        ShortLevel::Error => tracing::error!(target: "lyra::shorthand", level = level.code(), "{}", encoded),
    }
}
