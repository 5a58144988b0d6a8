// lx - platform/fs.rs
//
// Reading log input from the filesystem and splitting raw text into lines.
// Large files are memory-mapped; everything is decoded lossily so a stray
// invalid byte never rejects a whole log.

use crate::util::constants::LARGE_FILE_THRESHOLD_BYTES;
use crate::util::error::InputError;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Maximum read attempts for transient I/O errors.
const MAX_RETRIES: usize = 3;

/// Delay before each retry (ms).
const RETRY_DELAYS_MS: [u64; MAX_RETRIES] = [10, 50, 200];

/// Read a log file into lines.
///
/// The path must exist and be a regular file. Lines are split on `\n` with
/// a trailing `\r` removed; invalid UTF-8 is replaced rather than rejected.
pub fn read_lines(path: &Path) -> Result<Vec<String>, InputError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InputError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(InputError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    if !meta.is_file() {
        return Err(InputError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let is_large = meta.len() > LARGE_FILE_THRESHOLD_BYTES;
    let text = if is_large {
        read_large_file(path)
    } else {
        read_small_file_with_retry(path)
    }
    .map_err(|e| InputError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let lines = split_text(&text);
    tracing::debug!(
        path = %path.display(),
        bytes = meta.len(),
        mmap = is_large,
        lines = lines.len(),
        "Input file read"
    );
    Ok(lines)
}

/// Split raw text (file content, clipboard) into lines.
///
/// A trailing newline does not produce an extra empty line.
pub fn split_text(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Read using `memmap2` for large files.
fn read_large_file(path: &Path) -> io::Result<String> {
    let file = std::fs::File::open(path)?;
    // SAFETY: the map is read-only. A file truncated by another process
    // while mapped can fault; lx only reads already-written logs.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Read a small file with transient-error retries.
fn read_small_file_with_retry(path: &Path) -> io::Result<String> {
    let mut last_err: Option<io::Error> = None;

    for (attempt, delay) in RETRY_DELAYS_MS.iter().enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error, retrying"
                );
                std::thread::sleep(Duration::from_millis(*delay));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown read error")))
}

fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}
