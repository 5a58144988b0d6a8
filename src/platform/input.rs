// lx - platform/input.rs
//
// Input origin detection: explicit file path, piped stdin, or clipboard.

use crate::core::model::InputOrigin;
use std::path::Path;

/// Decide where log input comes from.
///
/// A path always wins. Otherwise stdin is treated as a live pipe unless it
/// is an interactive terminal, in which case the clipboard is read.
pub fn detect_origin(path: Option<&Path>, stdin_is_terminal: bool) -> InputOrigin {
    let origin = match path {
        Some(_) => InputOrigin::File,
        None if !stdin_is_terminal => InputOrigin::Pipe,
        None => InputOrigin::Clipboard,
    };
    tracing::debug!(origin = origin.label(), "Input origin detected");
    origin
}

/// Whether the process's stdin is attached to a terminal.
pub fn stdin_is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdin().is_terminal()
}

/// Name shown for a source in workspace labels and status messages.
pub fn source_name(origin: InputOrigin, path: Option<&Path>) -> String {
    match (origin, path) {
        (InputOrigin::File, Some(p)) => p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| p.display().to_string()),
        (InputOrigin::Pipe, _) => "stdin".to_string(),
        _ => "clipboard".to_string(),
    }
}
