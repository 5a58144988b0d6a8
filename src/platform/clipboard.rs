// lx - platform/clipboard.rs
//
// System clipboard access behind a small trait so the command loop can be
// driven by an in-memory clipboard in tests and headless runs.

use crate::util::error::ClipboardError;

/// Read/write access to a text clipboard.
pub trait ClipboardProvider {
    fn read_text(&mut self) -> Result<String, ClipboardError>;
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard via `arboard`. Opened lazily on first use so a
/// session without a display only fails when the clipboard is touched.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { inner: None }
    }

    fn ensure(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| {
                tracing::warn!(error = %e, "System clipboard unavailable");
                ClipboardError::Unavailable {
                    reason: e.to_string(),
                }
            })?;
            self.inner = Some(clipboard);
        }
        self.inner.as_mut().ok_or_else(|| ClipboardError::Unavailable {
            reason: "not initialised".to_string(),
        })
    }
}

impl ClipboardProvider for SystemClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        self.ensure()?
            .get_text()
            .map_err(|e| ClipboardError::Read {
                reason: e.to_string(),
            })
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.ensure()?
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write {
                reason: e.to_string(),
            })
    }
}

/// In-process clipboard for tests and scripted sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            contents: Some(text.to_string()),
        }
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        self.contents.clone().ok_or_else(|| ClipboardError::Read {
            reason: "clipboard is empty".to_string(),
        })
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
