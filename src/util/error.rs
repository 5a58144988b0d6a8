// lx - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Only the I/O boundary (input reading, clipboard, export, config) produces
// errors; classification, filtering, analytics and state mutation are total.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all lx operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LxError {
    /// Reading log input (file, stdin) failed.
    Input(InputError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// System clipboard access failed.
    Clipboard(ClipboardError),
}

impl fmt::Display for LxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "Input error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Clipboard(e) => write!(f, "Clipboard error: {e}"),
        }
    }
}

impl std::error::Error for LxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Clipboard(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Errors raised while reading log input.
#[derive(Debug)]
pub enum InputError {
    /// The input file does not exist.
    NotFound { path: PathBuf },

    /// The path exists but is not a regular file.
    NotAFile { path: PathBuf },

    /// I/O error while reading the input.
    Read { path: PathBuf, source: io::Error },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "'{}' does not exist", path.display())
            }
            Self::NotAFile { path } => {
                write!(f, "'{}' is not a regular file", path.display())
            }
            Self::Read { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<InputError> for LxError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Export would exceed maximum entry count.
    TooManyEntries { count: usize, max: usize },

    /// The export path has no recognised extension.
    UnsupportedFormat { path: PathBuf },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::TooManyEntries { count, max } => write!(
                f,
                "Export of {count} entries exceeds maximum of {max}. \
                 Apply filters to reduce the result set."
            ),
            Self::UnsupportedFormat { path } => write!(
                f,
                "Cannot export to '{}': expected a .csv or .json extension",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for LxError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LxError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Clipboard errors
// ---------------------------------------------------------------------------

/// Errors related to system clipboard access. Always transient: reported as
/// a status message, never fatal to the session.
#[derive(Debug)]
pub enum ClipboardError {
    /// No clipboard provider could be opened (headless session, no display).
    Unavailable { reason: String },

    /// Reading the clipboard failed.
    Read { reason: String },

    /// Writing the clipboard failed.
    Write { reason: String },
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "clipboard unavailable: {reason}"),
            Self::Read { reason } => write!(f, "cannot read clipboard: {reason}"),
            Self::Write { reason } => write!(f, "cannot write clipboard: {reason}"),
        }
    }
}

impl std::error::Error for ClipboardError {}

impl From<ClipboardError> for LxError {
    fn from(e: ClipboardError) -> Self {
        Self::Clipboard(e)
    }
}

/// Convenience type alias for lx results.
pub type Result<T> = std::result::Result<T, LxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_input_error_display_includes_path() {
        let err = InputError::NotFound {
            path: PathBuf::from("missing.log"),
        };
        assert_eq!(err.to_string(), "'missing.log' does not exist");
    }

    #[test]
    fn test_lx_error_preserves_source_chain() {
        let err: LxError = InputError::Read {
            path: PathBuf::from("a.log"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        let input = err.source().expect("LxError::Input must expose its source");
        assert!(input.source().is_some(), "Read must expose the io::Error");
        assert!(err.to_string().starts_with("Input error: cannot read 'a.log'"));
    }

    #[test]
    fn test_clipboard_error_display() {
        let err: LxError = ClipboardError::Write {
            reason: "no display".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Clipboard error: cannot write clipboard: no display"
        );
    }
}
