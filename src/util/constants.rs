// lx - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every growing collection and every tunable has a named bound here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name. Also used in the clipboard export headers.
pub const APP_NAME: &str = "lx";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "lx";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Ingestion: bounded batch (file / clipboard)
// =============================================================================

/// Line count above which bounded input is classified and delivered in
/// chunks so the consumer can show progress instead of waiting for the whole
/// input.
pub const DEFAULT_CHUNK_THRESHOLD_LINES: usize = 5_000;

/// Lines classified per chunk in bounded-batch mode.
pub const DEFAULT_CHUNK_SIZE_LINES: usize = 10_000;

/// Minimum / maximum user-configurable chunk size.
pub const MIN_CHUNK_SIZE_LINES: usize = 100;
pub const MAX_CHUNK_SIZE_LINES: usize = 1_000_000;

/// File size in bytes above which the file is memory-mapped rather than
/// read into a heap buffer.
pub const LARGE_FILE_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024; // 64 MB

// =============================================================================
// Ingestion: live stream (piped stdin)
// =============================================================================

/// A live micro-batch is flushed as soon as it holds this many lines.
pub const DEFAULT_LIVE_BATCH_LINES: usize = 100;

/// A non-empty live micro-batch is flushed at least this often (ms).
pub const DEFAULT_LIVE_FLUSH_MS: u64 = 100;

/// Capacity of the bounded reader -> batcher line queue. When the batcher
/// falls behind, the reader blocks on send (the only backpressure).
pub const DEFAULT_LIVE_QUEUE_CAPACITY: usize = 1_000;

/// Minimum / maximum user-configurable live batch size.
pub const MIN_LIVE_BATCH_LINES: usize = 1;
pub const MAX_LIVE_BATCH_LINES: usize = 10_000;

/// Minimum / maximum user-configurable live flush interval (ms).
pub const MIN_LIVE_FLUSH_MS: u64 = 10;
pub const MAX_LIVE_FLUSH_MS: u64 = 5_000;

/// Minimum / maximum user-configurable live queue capacity.
pub const MIN_LIVE_QUEUE_CAPACITY: usize = 1;
pub const MAX_LIVE_QUEUE_CAPACITY: usize = 100_000;

/// Maximum number of ingestion messages applied per drain of the command
/// loop. Remaining messages stay queued for the next drain so a burst cannot
/// starve user input.
pub const MAX_INGEST_MESSAGES_PER_DRAIN: usize = 500;

// =============================================================================
// Selection / clipboard
// =============================================================================

/// Maximum number of lines that select-all and copy operations accept.
/// Prevents multi-second clipboard operations on huge visible sets.
pub const DEFAULT_MAX_SELECTION_LINES: usize = 10_000;

/// Minimum / maximum user-configurable selection ceiling.
pub const MIN_MAX_SELECTION_LINES: usize = 1;
pub const ABSOLUTE_MAX_SELECTION_LINES: usize = 1_000_000;

// =============================================================================
// Notes
// =============================================================================

/// Maximum characters accepted in a note draft.
pub const MAX_NOTE_CHARS: usize = 255;

// =============================================================================
// Signal analytics
// =============================================================================

/// Default number of rows returned by the frequency analysis.
pub const DEFAULT_FREQUENCY_TOP_N: usize = 10;

/// Hard upper bound on the frequency row count.
pub const MAX_FREQUENCY_TOP_N: usize = 1_000;

/// Burst windows as (window seconds, occurrence threshold), tightest first.
pub const BURST_WINDOWS: &[(i64, usize)] = &[(10, 5), (30, 8), (60, 15)];

/// Maximum characters of a target message shown in burst/lifetime results.
pub const SIGNAL_MESSAGE_PREVIEW_CHARS: usize = 50;

// =============================================================================
// Workspaces
// =============================================================================

/// Maximum number of concurrently open workspaces in one session.
pub const MAX_WORKSPACES: usize = 9;

// =============================================================================
// Export
// =============================================================================

/// Maximum number of entries written by a single CSV/JSON export.
pub const MAX_EXPORT_ENTRIES: usize = 5_000_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
