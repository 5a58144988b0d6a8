// lx - driver.rs
//
// Outer command loop. Owns the session and a clipboard, feeds key names
// through the keymap, and executes the `Effect`s the app layer returns
// against the platform layer. I/O failures during a session become status
// messages; only a file named at startup is a hard error.

use crate::app::command::Effect;
use crate::app::workspace::Session;
use crate::core::model::InputOrigin;
use crate::platform::clipboard::ClipboardProvider;
use crate::platform::{fs, input};
use crate::util::error::LxError;
use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

/// How long a scripted key waits for the ingestion it triggered.
pub const KEY_INGEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives a `Session` headlessly.
pub struct Driver<C: ClipboardProvider> {
    pub session: Session,
    pub clipboard: C,
}

impl<C: ClipboardProvider> Driver<C> {
    pub fn new(session: Session, clipboard: C) -> Self {
        Self { session, clipboard }
    }

    /// Load a file into the active workspace.
    pub fn open_file(&mut self, path: &Path) -> Result<(), LxError> {
        let lines = fs::read_lines(path)?;
        let name = input::source_name(InputOrigin::File, Some(path));
        tracing::info!(path = %path.display(), lines = lines.len(), "Opening file");
        self.session.load_lines(lines, InputOrigin::File, &name);
        Ok(())
    }

    /// Load the clipboard into the active workspace. Failure leaves the
    /// workspace untouched and reports through the status line.
    pub fn paste(&mut self) {
        match self.clipboard.read_text() {
            Ok(text) => {
                let lines = fs::split_text(&text);
                tracing::info!(lines = lines.len(), "Loading clipboard");
                self.session
                    .load_lines(lines, InputOrigin::Clipboard, "clipboard");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Paste failed");
                self.session.active_mut().state.status_message = format!("Clipboard error: {e}");
            }
        }
    }

    /// Stream `reader` into the active workspace as live input.
    pub fn follow<R>(&mut self, reader: R)
    where
        R: BufRead + Send + 'static,
    {
        let name = input::source_name(InputOrigin::Pipe, None);
        self.session.start_live(reader, &name);
    }

    /// Execute one effect. Returns false when the session should end.
    pub fn execute(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Quit => return false,
            Effect::WriteClipboard { text, status } => {
                let message = match self.clipboard.write_text(&text) {
                    Ok(()) => status,
                    Err(e) => {
                        tracing::warn!(error = %e, "Clipboard write failed");
                        format!("Clipboard error: {e}")
                    }
                };
                self.session.active_mut().state.status_message = message;
            }
            Effect::ReadClipboard => self.paste(),
            Effect::OpenFile(path) => {
                if let Err(e) = self.open_file(&path) {
                    tracing::warn!(error = %e, "Open file failed");
                    self.session.active_mut().state.status_message = e.to_string();
                }
            }
        }
        true
    }

    /// Feed whitespace-separated key names through the keymap.
    ///
    /// Ingestion started by a key is awaited before the next key so scripts
    /// behave the same regardless of input size. Returns false if a key
    /// quit the session.
    pub fn run_keys(&mut self, script: &str) -> bool {
        for key in script.split_whitespace() {
            self.session.poll_ingest();
            if let Some(effect) = self.session.dispatch_key(key) {
                if !self.execute(effect) {
                    tracing::debug!(key, "Key script quit");
                    return false;
                }
                self.session.wait_idle(KEY_INGEST_TIMEOUT);
            }
        }
        self.session.poll_ingest();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ingest::IngestSettings;
    use crate::app::state::StateLimits;
    use crate::platform::clipboard::MemoryClipboard;
    use crate::util::error::ClipboardError;

    fn driver(clip: MemoryClipboard) -> Driver<MemoryClipboard> {
        Driver::new(
            Session::new(StateLimits::default(), IngestSettings::default()),
            clip,
        )
    }

    struct BrokenClipboard;

    impl ClipboardProvider for BrokenClipboard {
        fn read_text(&mut self) -> Result<String, ClipboardError> {
            Err(ClipboardError::Unavailable {
                reason: "no display".to_string(),
            })
        }
        fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable {
                reason: "no display".to_string(),
            })
        }
    }

    #[test]
    fn test_paste_then_copy_line() {
        let mut d = driver(MemoryClipboard::with_text("ERROR boom\nINFO ok\n"));
        assert!(d.run_keys("p j c"));
        let state = &d.session.active().state;
        assert_eq!(state.entries.len(), 2);
        assert_eq!(state.status_message, "Copied line 2");
        assert_eq!(d.clipboard.contents.as_deref(), Some("line 2: INFO ok"));
    }

    #[test]
    fn test_quit_stops_script() {
        let mut d = driver(MemoryClipboard::with_text("a"));
        assert!(!d.run_keys("q p"));
        assert!(d.session.active().state.entries.is_empty());
    }

    #[test]
    fn test_clipboard_failure_is_status() {
        let mut d = Driver::new(
            Session::new(StateLimits::default(), IngestSettings::default()),
            BrokenClipboard,
        );
        assert!(d.run_keys("p"));
        assert_eq!(
            d.session.active().state.status_message,
            "Clipboard error: clipboard unavailable: no display"
        );
    }

    #[test]
    fn test_open_missing_file_is_status() {
        let mut d = driver(MemoryClipboard::default());
        let missing = std::env::temp_dir().join("lx-definitely-missing.log");
        assert!(d.execute(Effect::OpenFile(missing)));
        assert!(d
            .session
            .active()
            .state
            .status_message
            .contains("does not exist"));
    }
}
