// lx - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Resolved platform paths for lx configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/lx/ or %APPDATA%\lx\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub ingest: IngestSection,
    pub selection: SelectionSection,
    pub signal: SignalSection,
    pub logging: LoggingSection,
}

/// `[ingest]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Bounded input above this many lines is delivered in chunks.
    pub chunk_threshold_lines: Option<usize>,
    /// Lines per chunk.
    pub chunk_size_lines: Option<usize>,
    /// Live micro-batch size cap.
    pub live_batch_lines: Option<usize>,
    /// Live micro-batch flush interval in ms.
    pub live_flush_ms: Option<u64>,
    /// Capacity of the reader -> batcher line queue.
    pub live_queue_capacity: Option<usize>,
}

/// `[selection]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    /// Ceiling for select-all and copy operations.
    pub max_lines: Option<usize>,
}

/// `[signal]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SignalSection {
    pub frequency_top_n: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Ingest --
    pub chunk_threshold_lines: usize,
    pub chunk_size_lines: usize,
    pub live_batch_lines: usize,
    pub live_flush_ms: u64,
    pub live_queue_capacity: usize,

    // -- Selection --
    pub max_selection_lines: usize,

    // -- Signal --
    pub frequency_top_n: usize,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_lines: constants::DEFAULT_CHUNK_THRESHOLD_LINES,
            chunk_size_lines: constants::DEFAULT_CHUNK_SIZE_LINES,
            live_batch_lines: constants::DEFAULT_LIVE_BATCH_LINES,
            live_flush_ms: constants::DEFAULT_LIVE_FLUSH_MS,
            live_queue_capacity: constants::DEFAULT_LIVE_QUEUE_CAPACITY,
            max_selection_lines: constants::DEFAULT_MAX_SELECTION_LINES,
            frequency_top_n: constants::DEFAULT_FREQUENCY_TOP_N,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unreadable or unparseable, returns defaults with a warning;
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.clone(),
                source: e,
            };
            tracing::warn!(error = %err, "Config file unreadable");
            return (AppConfig::default(), vec![format!("{err}. Using defaults.")]);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.clone(),
                source: e,
            };
            tracing::warn!(error = %err, "Config file unparseable");
            return (AppConfig::default(), vec![format!("{err}. Using defaults.")]);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    validate(raw)
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let defaults = AppConfig::default();

    let config = AppConfig {
        chunk_threshold_lines: in_range(
            "ingest.chunk_threshold_lines",
            raw.ingest.chunk_threshold_lines,
            0,
            usize::MAX,
            defaults.chunk_threshold_lines,
            &mut warnings,
        ),
        chunk_size_lines: in_range(
            "ingest.chunk_size_lines",
            raw.ingest.chunk_size_lines,
            constants::MIN_CHUNK_SIZE_LINES,
            constants::MAX_CHUNK_SIZE_LINES,
            defaults.chunk_size_lines,
            &mut warnings,
        ),
        live_batch_lines: in_range(
            "ingest.live_batch_lines",
            raw.ingest.live_batch_lines,
            constants::MIN_LIVE_BATCH_LINES,
            constants::MAX_LIVE_BATCH_LINES,
            defaults.live_batch_lines,
            &mut warnings,
        ),
        live_flush_ms: in_range(
            "ingest.live_flush_ms",
            raw.ingest.live_flush_ms,
            constants::MIN_LIVE_FLUSH_MS,
            constants::MAX_LIVE_FLUSH_MS,
            defaults.live_flush_ms,
            &mut warnings,
        ),
        live_queue_capacity: in_range(
            "ingest.live_queue_capacity",
            raw.ingest.live_queue_capacity,
            constants::MIN_LIVE_QUEUE_CAPACITY,
            constants::MAX_LIVE_QUEUE_CAPACITY,
            defaults.live_queue_capacity,
            &mut warnings,
        ),
        max_selection_lines: in_range(
            "selection.max_lines",
            raw.selection.max_lines,
            constants::MIN_MAX_SELECTION_LINES,
            constants::ABSOLUTE_MAX_SELECTION_LINES,
            defaults.max_selection_lines,
            &mut warnings,
        ),
        frequency_top_n: in_range(
            "signal.frequency_top_n",
            raw.signal.frequency_top_n,
            1,
            constants::MAX_FREQUENCY_TOP_N,
            defaults.frequency_top_n,
            &mut warnings,
        ),
        log_level: validate_log_level(raw.logging.level, &mut warnings),
        log_file: raw.logging.file.filter(|f| !f.is_empty()),
    };

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Accept `value` when it lies in `min..=max`, otherwise warn and use `default`.
fn in_range<T>(
    field: &str,
    value: Option<T>,
    min: T,
    max: T,
    default: T,
    warnings: &mut Vec<String>,
) -> T
where
    T: PartialOrd + Display + Copy,
{
    match value {
        None => default,
        Some(v) if v >= min && v <= max => v,
        Some(v) => {
            let err = ConfigError::ValueOutOfRange {
                field: field.to_string(),
                value: v.to_string(),
                expected: format!("{min}-{max}"),
            };
            warnings.push(format!("{err}. Using default ({default})."));
            default
        }
    }
}

fn validate_log_level(level: Option<String>, warnings: &mut Vec<String>) -> Option<String> {
    let level = level?;
    let valid = ["error", "warn", "info", "debug", "trace"];
    if valid.contains(&level.to_lowercase().as_str()) {
        Some(level)
    } else {
        warnings.push(format!(
            "[logging] level = \"{level}\" is not recognised. \
             Valid values: error, warn, info, debug, trace. Using default (info).",
        ));
        None
    }
}
