// lx - core/classifier.rs
//
// Heuristic classification of raw log lines into `Entry` values.
// Core layer: pure functions over strings, never fails.
//
// JSON lines (a trimmed line that starts with `{` and ends with `}` and
// decodes as an object) take their message, level and timestamp from well
// known field names. Everything else goes through the plain-text heuristics:
// keyword level detection, anchored timestamp patterns, stack-trace patterns.

use crate::core::model::{Entry, Level};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// JSON fields probed for the message, in priority order.
const MESSAGE_FIELDS: &[&str] = &["msg", "message", "log", "error"];

/// JSON fields probed for the level, in priority order.
const LEVEL_FIELDS: &[&str] = &["level", "severity", "lvl", "log_level"];

/// JSON fields probed for the timestamp, in priority order.
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "time", "ts", "@timestamp", "datetime", "date"];

/// Plain-text level keywords, checked against the upper-cased text.
/// Categories are tried in order; the first category with any hit wins.
const TEXT_LEVEL_KEYWORDS: &[(Level, &[&str])] = &[
    (
        Level::Error,
        &["ERROR", "ERR]", "[ERR", "FATAL", "PANIC", "CRITICAL"],
    ),
    (Level::Warn, &["WARN", "WARNING"]),
    (Level::Info, &["[INFO", "INFO]", " INFO "]),
    (Level::Debug, &["DEBUG", "[DBG", "DBG]"]),
    (Level::Trace, &["TRACE", "VERBOSE"]),
];

/// Compile a regex from the static tables below.
/// Patterns are exercised by the unit tests, so a mistake shows up as a
/// failing test rather than a runtime panic.
fn re(pat: &str) -> Regex {
    Regex::new(pat).expect("classifier: invalid regex")
}

/// Timestamp patterns, anchored at the start of the trimmed line.
fn timestamp_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // ISO 8601 with optional fraction and zone: 2024-01-15T10:30:45.123+02:00
            re(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:?[0-9]{2})?"),
            // SQL style: 2024-01-15 10:30:45[.123]
            re(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?"),
            // Apache common log: 15/Jan/2024:10:30:45
            re(r"^[0-9]{2}/[A-Za-z]{3}/[0-9]{4}:[0-9]{2}:[0-9]{2}:[0-9]{2}"),
            // Syslog: Jan 15 10:30:45
            re(r"^[A-Za-z]{3}[ \t\n\f\r]+[0-9]{1,2} [0-9]{2}:[0-9]{2}:[0-9]{2}"),
        ]
    })
}

/// Stack-trace line patterns (Java, Go, Python, generic indented frames).
fn stack_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            re(r"^[ \t\n\f\r]*at[ \t\n\f\r]+[A-Za-z0-9_.$]+\("),
            re(r"^[ \t\n\f\r]*\tat[ \t\n\f\r]+"),
            re(r"goroutine[ \t\n\f\r]+[0-9]+"),
            re(r"\.go:[0-9]+"),
            re(r#"^[ \t\n\f\r]*File[ \t\n\f\r]+"[^"]+\.py",[ \t\n\f\r]+line[ \t\n\f\r]+[0-9]+"#),
            re(r"^[ \t\n\f\r]+at[ \t\n\f\r]+"),
        ]
    })
}

/// Classify one raw line. Total: never panics, never fails.
///
/// `raw` is preserved byte-for-byte in the returned entry.
pub fn classify(raw: &str, index: usize) -> Entry {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(fields) = serde_json::from_str::<Map<String, Value>>(trimmed) {
            let message = extract_message(&fields, trimmed);
            let mut level = extract_level_json(&fields);
            if level == Level::Unknown {
                level = detect_level_text(&message);
            }
            let timestamp = extract_timestamp_json(&fields);
            return Entry {
                index,
                raw: raw.to_string(),
                message,
                timestamp,
                level,
                fields: Some(fields),
                is_json: true,
                is_stack: false,
                deleted: false,
            };
        }
    }

    Entry {
        index,
        raw: raw.to_string(),
        message: trimmed.to_string(),
        timestamp: extract_timestamp_text(trimmed),
        level: detect_level_text(trimmed),
        fields: None,
        is_json: false,
        is_stack: is_stack_trace(raw),
        deleted: false,
    }
}

/// Classify a batch of lines. Empty lines are skipped and do not consume an
/// index: the k-th non-empty line receives `index_start + k`.
pub fn classify_lines<S: AsRef<str>>(lines: &[S], index_start: usize) -> Vec<Entry> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(offset, line)| classify(line, index_start + offset))
        .collect()
}

/// Detect a level from free text by keyword, case-insensitively.
pub fn detect_level_text(text: &str) -> Level {
    let upper = text.to_uppercase();
    TEXT_LEVEL_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(level, _)| *level)
        .unwrap_or(Level::Unknown)
}

/// Map a JSON level value to a `Level`.
///
/// Strings go through a fixed lexicon; numbers follow the common structured
/// logger scale (10 trace, 20 debug, 30 info, 40 warn, 50 and above error).
pub fn normalize_level(value: &Value) -> Level {
    match value {
        Value::String(s) => match s.to_lowercase().as_str() {
            "error" | "err" | "fatal" | "panic" | "critical" | "crit" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "info" | "information" => Level::Info,
            "debug" => Level::Debug,
            "trace" | "verbose" => Level::Trace,
            _ => Level::Unknown,
        },
        Value::Number(n) => match n.as_f64() {
            Some(v) if v >= 50.0 => Level::Error,
            Some(v) => match v.trunc() as i64 {
                40 => Level::Warn,
                30 => Level::Info,
                20 => Level::Debug,
                10 => Level::Trace,
                _ => Level::Unknown,
            },
            None => Level::Unknown,
        },
        _ => Level::Unknown,
    }
}

/// First timestamp pattern matching at the start of `text`, or empty.
pub fn extract_timestamp_text(text: &str) -> String {
    timestamp_patterns()
        .iter()
        .find_map(|p| p.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Whether `text` matches any stack-trace pattern.
pub fn is_stack_trace(text: &str) -> bool {
    stack_patterns().iter().any(|p| p.is_match(text))
}

fn extract_message(fields: &Map<String, Value>, trimmed: &str) -> String {
    for key in MESSAGE_FIELDS {
        if let Some(Value::String(s)) = fields.get(*key) {
            if !s.is_empty() {
                return s.clone();
            }
        }
    }
    serde_json::to_string(fields).unwrap_or_else(|_| trimmed.to_string())
}

/// The first level field present decides; a present but unrecognised value
/// yields `Unknown` without probing later fields.
fn extract_level_json(fields: &Map<String, Value>) -> Level {
    LEVEL_FIELDS
        .iter()
        .find_map(|key| fields.get(*key))
        .map(normalize_level)
        .unwrap_or(Level::Unknown)
}

fn extract_timestamp_json(fields: &Map<String, Value>) -> String {
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}
