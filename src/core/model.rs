// lx - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

// =============================================================================
// Entry (classified output of one raw line)
// =============================================================================

/// A single classified log line.
///
/// `index` is assigned once and never changes: every other engine refers to
/// entries by index, never by their position in a filtered view. Entries are
/// never removed, only soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Position in the global entry sequence.
    pub index: usize,

    /// Original line text, byte-for-byte.
    pub raw: String,

    /// Human-readable text: the JSON message field, or the trimmed raw line.
    pub message: String,

    /// Best-effort timestamp substring. Empty when none was found.
    pub timestamp: String,

    /// Detected severity level.
    pub level: Level,

    /// Decoded JSON object. `Some` only when `is_json` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,

    /// Whether the line decoded as a JSON object.
    pub is_json: bool,

    /// Whether the line looks like part of a stack trace.
    pub is_stack: bool,

    /// Soft-delete flag.
    pub deleted: bool,
}

impl Entry {
    /// One-based line number used in exports and status messages.
    pub fn line_number(&self) -> usize {
        self.index + 1
    }
}

// =============================================================================
// Level
// =============================================================================

/// Severity levels, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Unknown,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Upper-case label used in list views and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Unknown => "UNKNOWN",
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Parse a user-supplied level name (CLI flag, config value).
    /// Case-insensitive; accepts the common aliases.
    pub fn from_name(name: &str) -> Option<Level> {
        match name.trim().to_lowercase().as_str() {
            "error" | "err" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            "trace" => Some(Level::Trace),
            "unknown" => Some(Level::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Notes
// =============================================================================

/// Importance marker of a note, selected by a leading `!` or `?` in the
/// user's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NoteLevel {
    #[default]
    Normal,
    Critical,
    Unsure,
}

impl NoteLevel {
    /// Input marker that selects this level (empty for Normal).
    pub fn marker(&self) -> &'static str {
        match self {
            NoteLevel::Normal => "",
            NoteLevel::Critical => "!",
            NoteLevel::Unsure => "?",
        }
    }

    /// Header label used when rendering a note box.
    pub fn label(&self) -> &'static str {
        match self {
            NoteLevel::Normal => "NOTE",
            NoteLevel::Critical => "! CRIT",
            NoteLevel::Unsure => "? UNSURE",
        }
    }
}

/// A user annotation attached to one entry index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    /// Note text with the level marker stripped.
    pub text: String,
    pub level: NoteLevel,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Build a note from raw user input, routing a leading `!`/`?` to the
    /// Critical/Unsure level. Returns `None` when no text remains.
    pub fn parse(input: &str) -> Option<Note> {
        let (level, text) = parse_note_level(input);
        if text.is_empty() {
            return None;
        }
        Some(Note {
            text: text.to_string(),
            level,
            created_at: Utc::now(),
        })
    }

    /// The note as the user would type it again: marker followed by text.
    pub fn display_text(&self) -> String {
        format!("{}{}", self.level.marker(), self.text)
    }
}

/// Split a leading level marker off note input. The remaining text is trimmed.
pub fn parse_note_level(input: &str) -> (NoteLevel, &str) {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix('!') {
        (NoteLevel::Critical, rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix('?') {
        (NoteLevel::Unsure, rest.trim())
    } else {
        (NoteLevel::Normal, trimmed)
    }
}

// =============================================================================
// Input origin
// =============================================================================

/// Where a workspace's entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputOrigin {
    /// Clipboard paste, or an empty session waiting for one.
    #[default]
    Clipboard,
    /// A file named on the command line or opened in Open-file mode.
    File,
    /// Live piped stdin.
    Pipe,
}

impl InputOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            InputOrigin::Clipboard => "CLIPBOARD",
            InputOrigin::File => "FILE",
            InputOrigin::Pipe => "PIPE",
        }
    }
}

// =============================================================================
// Ingestion progress (for the command loop)
// =============================================================================

/// Messages sent from ingestion background threads to the command loop.
///
/// Bounded input produces `Started`, one or more `Batch`, then `Complete`.
/// Live input produces `Started`, any number of `LiveBatch`, then
/// `StreamEnded`. `Failed` may precede `StreamEnded` when the reader errors.
#[derive(Debug, Clone)]
pub enum IngestProgress {
    /// Ingestion started. `total_lines` is `None` for live streams.
    Started { total_lines: Option<usize> },

    /// A classified chunk of bounded input.
    Batch {
        entries: Vec<Entry>,
        lines_done: usize,
        total_lines: usize,
    },

    /// All bounded input has been delivered.
    Complete {
        total_entries: usize,
        duration: Duration,
    },

    /// A classified micro-batch of live input.
    LiveBatch { entries: Vec<Entry> },

    /// The live stream reached end-of-file (or the pipe closed).
    StreamEnded { total_lines: usize },

    /// A non-fatal read error; ingestion stops after this message.
    Failed { error: String },
}
