// lx - app/ingest.rs
//
// Ingestion lifecycle management. Classifies input on background threads
// and delivers `IngestProgress` messages to the command loop over an mpsc
// channel.
//
// Architecture:
//   - `IngestManager` lives on the command-loop thread and is polled with
//     `poll_progress`; it never blocks.
//   - Bounded input (file, clipboard) is classified on one worker thread.
//     Above the chunk threshold it is delivered as fixed-size `Batch`
//     chunks, classified in parallel with rayon, then `Complete`.
//   - Live input (piped stdin) uses two threads: a reader pushing raw lines
//     into a bounded `sync_channel`, and a batcher that flushes a
//     micro-batch when it reaches `live_batch_lines` or when `live_flush`
//     elapses, whichever comes first. End of input flushes the partial
//     batch and sends `StreamEnded`.
//
// The bounded line queue is the only backpressure: when the batcher falls
// behind, the reader blocks on send. There is no mid-stream abort; a worker
// exits early only when its receiver has been dropped.

use crate::core::classifier::{classify, classify_lines};
use crate::core::model::{Entry, IngestProgress};
use crate::util::constants::{
    DEFAULT_CHUNK_SIZE_LINES, DEFAULT_CHUNK_THRESHOLD_LINES, DEFAULT_LIVE_BATCH_LINES,
    DEFAULT_LIVE_FLUSH_MS, DEFAULT_LIVE_QUEUE_CAPACITY, MAX_INGEST_MESSAGES_PER_DRAIN,
};
use crate::util::logging::preview;
use rayon::prelude::*;
use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

// =============================================================================
// Settings
// =============================================================================

/// Batching parameters, resolved from config.toml by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Bounded input with more lines than this is delivered in chunks.
    pub chunk_threshold_lines: usize,
    pub chunk_size_lines: usize,
    pub live_batch_lines: usize,
    pub live_flush: Duration,
    pub live_queue_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_threshold_lines: DEFAULT_CHUNK_THRESHOLD_LINES,
            chunk_size_lines: DEFAULT_CHUNK_SIZE_LINES,
            live_batch_lines: DEFAULT_LIVE_BATCH_LINES,
            live_flush: Duration::from_millis(DEFAULT_LIVE_FLUSH_MS),
            live_queue_capacity: DEFAULT_LIVE_QUEUE_CAPACITY,
        }
    }
}

// =============================================================================
// IngestManager
// =============================================================================

/// Manages one ingestion at a time for one workspace.
pub struct IngestManager {
    /// Channel receiver polled by the command loop.
    progress_rx: Option<mpsc::Receiver<IngestProgress>>,
    settings: IngestSettings,
}

impl IngestManager {
    pub fn new(settings: IngestSettings) -> Self {
        Self {
            progress_rx: None,
            settings,
        }
    }

    /// Classify already-read lines on a background thread.
    ///
    /// Any ingestion still running is detached first: its receiver is
    /// dropped, so its worker stops at the next send.
    pub fn start_batch(&mut self, lines: Vec<String>) {
        let (tx, rx) = mpsc::channel();
        self.progress_rx = Some(rx);

        let settings = self.settings;
        let total = lines.len();
        std::thread::spawn(move || {
            run_batch(lines, settings, tx);
        });

        tracing::info!(lines = total, "Batch ingestion started");
    }

    /// Stream lines from `reader` until end of input.
    pub fn start_live<R>(&mut self, reader: R)
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.progress_rx = Some(rx);

        let settings = self.settings;
        let (line_tx, line_rx) = mpsc::sync_channel::<String>(settings.live_queue_capacity);

        let reader_tx = tx.clone();
        std::thread::spawn(move || {
            run_reader(reader, line_tx, reader_tx);
        });
        std::thread::spawn(move || {
            run_batcher(line_rx, settings, tx);
        });

        tracing::info!(
            batch_lines = settings.live_batch_lines,
            flush_ms = settings.live_flush.as_millis() as u64,
            queue = settings.live_queue_capacity,
            "Live ingestion started"
        );
    }

    /// True while an ingestion has undelivered messages or is still running.
    pub fn is_active(&self) -> bool {
        self.progress_rx.is_some()
    }

    /// Drain pending messages without blocking, at most
    /// `MAX_INGEST_MESSAGES_PER_DRAIN` per call.
    ///
    /// The manager becomes inactive once the worker has finished and every
    /// message has been handed out.
    pub fn poll_progress(&mut self) -> Vec<IngestProgress> {
        let mut messages = Vec::new();
        let Some(rx) = &self.progress_rx else {
            return messages;
        };

        let mut finished = false;
        while messages.len() < MAX_INGEST_MESSAGES_PER_DRAIN {
            match rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }
        if finished {
            tracing::debug!("Ingestion channel closed");
            self.progress_rx = None;
        }
        messages
    }
}

impl Default for IngestManager {
    fn default() -> Self {
        Self::new(IngestSettings::default())
    }
}

// =============================================================================
// Bounded batch worker
// =============================================================================

fn run_batch(lines: Vec<String>, settings: IngestSettings, tx: mpsc::Sender<IngestProgress>) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                return; // Receiver dropped (workspace replaced or closed).
            }
        };
    }

    let start = Instant::now();
    let total_lines = lines.len();
    send!(IngestProgress::Started {
        total_lines: Some(total_lines),
    });

    let mut total_entries = 0;

    if total_lines <= settings.chunk_threshold_lines {
        let entries = classify_lines(&lines, 0);
        total_entries = entries.len();
        send!(IngestProgress::Batch {
            entries,
            lines_done: total_lines,
            total_lines,
        });
    } else {
        let mut lines_done = 0;
        for chunk in lines.chunks(settings.chunk_size_lines.max(1)) {
            let entries = classify_chunk_parallel(chunk, total_entries);
            lines_done += chunk.len();
            total_entries += entries.len();
            tracing::debug!(
                entries = entries.len(),
                lines_done,
                total_lines,
                "Chunk classified"
            );
            send!(IngestProgress::Batch {
                entries,
                lines_done,
                total_lines,
            });
        }
    }

    let duration = start.elapsed();
    send!(IngestProgress::Complete {
        total_entries,
        duration,
    });

    tracing::info!(
        lines = total_lines,
        entries = total_entries,
        duration_ms = duration.as_millis() as u64,
        "Batch ingestion complete"
    );
}

/// Parallel counterpart of `classify_lines`: empty lines are skipped and
/// indices are consecutive from `index_start`.
fn classify_chunk_parallel(chunk: &[String], index_start: usize) -> Vec<Entry> {
    let non_empty: Vec<&str> = chunk
        .iter()
        .map(String::as_str)
        .filter(|l| !l.is_empty())
        .collect();
    non_empty
        .par_iter()
        .enumerate()
        .map(|(offset, line)| classify(line, index_start + offset))
        .collect()
}

// =============================================================================
// Live stream workers
// =============================================================================

/// Read lines until end of input. Invalid UTF-8 is replaced, not fatal.
fn run_reader<R: BufRead>(
    mut reader: R,
    line_tx: mpsc::SyncSender<String>,
    progress_tx: mpsc::Sender<IngestProgress>,
) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                tracing::trace!(line = preview(&line), "Live line");
                // Blocks while the queue is full.
                if line_tx.send(line).is_err() {
                    return; // Batcher gone.
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Live input read failed");
                let _ = progress_tx.send(IngestProgress::Failed {
                    error: format!("Input read error: {e}"),
                });
                break;
            }
        }
    }
    tracing::debug!("Live reader reached end of input");
    // Dropping `line_tx` tells the batcher the stream has ended.
}

fn run_batcher(
    line_rx: mpsc::Receiver<String>,
    settings: IngestSettings,
    tx: mpsc::Sender<IngestProgress>,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                return;
            }
        };
    }

    send!(IngestProgress::Started { total_lines: None });

    let batch_cap = settings.live_batch_lines.max(1);
    let mut batch: Vec<String> = Vec::with_capacity(batch_cap);
    let mut next_index = 0;
    let mut total_lines = 0;
    let mut deadline = Instant::now() + settings.live_flush;

    macro_rules! flush {
        () => {
            if !batch.is_empty() {
                let entries = classify_lines(&batch, next_index);
                next_index += entries.len();
                tracing::trace!(lines = batch.len(), entries = entries.len(), "Live flush");
                batch.clear();
                if !entries.is_empty() {
                    send!(IngestProgress::LiveBatch { entries });
                }
            }
        };
    }

    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match line_rx.recv_timeout(timeout) {
            Ok(line) => {
                total_lines += 1;
                batch.push(line);
                if batch.len() >= batch_cap {
                    flush!();
                    deadline = Instant::now() + settings.live_flush;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                flush!();
                deadline = Instant::now() + settings.live_flush;
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush!();
                break;
            }
        }
    }

    send!(IngestProgress::StreamEnded { total_lines });
    tracing::info!(lines = total_lines, entries = next_index, "Live stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Poll until the manager goes idle, collecting every message.
    fn drain(manager: &mut IngestManager) -> Vec<IngestProgress> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut all = Vec::new();
        while manager.is_active() {
            assert!(Instant::now() < deadline, "ingestion did not finish");
            all.extend(manager.poll_progress());
            std::thread::sleep(Duration::from_millis(2));
        }
        all
    }

    fn batch_entries(messages: &[IngestProgress]) -> Vec<&Entry> {
        messages
            .iter()
            .flat_map(|m| match m {
                IngestProgress::Batch { entries, .. } | IngestProgress::LiveBatch { entries } => {
                    entries.iter().collect::<Vec<_>>()
                }
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_small_batch_single_chunk() {
        let mut manager = IngestManager::default();
        manager.start_batch(vec!["ERROR a".into(), String::new(), "info b".into()]);
        let messages = drain(&mut manager);

        assert!(matches!(
            messages.first(),
            Some(IngestProgress::Started {
                total_lines: Some(3)
            })
        ));
        let batches = messages
            .iter()
            .filter(|m| matches!(m, IngestProgress::Batch { .. }))
            .count();
        assert_eq!(batches, 1);
        assert!(matches!(
            messages.last(),
            Some(IngestProgress::Complete {
                total_entries: 2,
                ..
            })
        ));
        let indices: Vec<usize> = batch_entries(&messages).iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1], "empty line skipped");
    }

    #[test]
    fn test_large_batch_is_chunked_in_order() {
        let settings = IngestSettings {
            chunk_threshold_lines: 10,
            chunk_size_lines: 7,
            ..Default::default()
        };
        let mut manager = IngestManager::new(settings);
        let lines: Vec<String> = (0..30).map(|i| format!("line {i}")).collect();
        manager.start_batch(lines);
        let messages = drain(&mut manager);

        let progress: Vec<usize> = messages
            .iter()
            .filter_map(|m| match m {
                IngestProgress::Batch { lines_done, .. } => Some(*lines_done),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![7, 14, 21, 28, 30]);

        let entries = batch_entries(&messages);
        assert_eq!(entries.len(), 30);
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.index, i);
            assert_eq!(e.raw, format!("line {i}"));
        }
    }

    #[test]
    fn test_live_stream_flushes_and_ends() {
        let settings = IngestSettings {
            live_batch_lines: 4,
            live_flush: Duration::from_millis(20),
            live_queue_capacity: 2,
            ..Default::default()
        };
        let mut manager = IngestManager::new(settings);
        let input: String = (0..10).map(|i| format!("line {i}\r\n")).collect();
        manager.start_live(Cursor::new(input.into_bytes()));
        let messages = drain(&mut manager);

        let entries = batch_entries(&messages);
        let raws: Vec<&str> = entries.iter().map(|e| e.raw.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        assert_eq!(raws, expected, "order preserved, CRLF stripped");

        for m in &messages {
            if let IngestProgress::LiveBatch { entries } = m {
                assert!(entries.len() <= 4, "batch exceeds size cap");
            }
        }
        assert!(matches!(
            messages.last(),
            Some(IngestProgress::StreamEnded { total_lines: 10 })
        ));
    }

    /// Reader fed from a channel: blocks until a chunk arrives, reports
    /// end of input once the sender is dropped.
    struct ChannelReader {
        rx: mpsc::Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl std::io::Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending.is_empty() {
                match self.rx.recv() {
                    Ok(chunk) => self.pending = chunk,
                    Err(_) => return Ok(0),
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    #[test]
    fn test_live_partial_batch_flushed_by_timer() {
        let settings = IngestSettings {
            live_batch_lines: 100,
            live_flush: Duration::from_millis(30),
            ..Default::default()
        };
        let mut manager = IngestManager::new(settings);
        let (tx, rx) = mpsc::channel();
        tx.send(b"ERROR a\nINFO b\n".to_vec()).unwrap();

        let started = Instant::now();
        manager.start_live(std::io::BufReader::new(ChannelReader {
            rx,
            pending: Vec::new(),
        }));

        // The reader now blocks with 2 lines buffered, well under the cap.
        let deadline = started + Duration::from_secs(10);
        let mut messages = Vec::new();
        while !messages
            .iter()
            .any(|m| matches!(m, IngestProgress::LiveBatch { .. }))
        {
            assert!(Instant::now() < deadline, "partial batch never flushed");
            messages.extend(manager.poll_progress());
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(started.elapsed() >= settings.live_flush);
        assert_eq!(batch_entries(&messages).len(), 2);
        assert!(
            !messages
                .iter()
                .any(|m| matches!(m, IngestProgress::StreamEnded { .. })),
            "flushed before the stream ended"
        );
        assert!(manager.is_active());

        drop(tx);
        let rest = drain(&mut manager);
        assert!(matches!(
            rest.last(),
            Some(IngestProgress::StreamEnded { total_lines: 2 })
        ));
    }

    #[test]
    fn test_live_stream_lossy_utf8_and_no_trailing_newline() {
        let mut manager = IngestManager::default();
        let bytes = b"ok\n\xff\xfebad\nlast".to_vec();
        manager.start_live(Cursor::new(bytes));
        let messages = drain(&mut manager);

        let raws: Vec<String> = batch_entries(&messages).iter().map(|e| e.raw.clone()).collect();
        assert_eq!(raws.len(), 3);
        assert_eq!(raws[0], "ok");
        assert!(raws[1].ends_with("bad"));
        assert!(raws[1].contains('\u{FFFD}'));
        assert_eq!(raws[2], "last");
    }

    #[test]
    fn test_restart_detaches_previous_ingestion() {
        let mut manager = IngestManager::default();
        manager.start_batch(vec!["first".into()]);
        manager.start_batch(vec!["second".into()]);
        let messages = drain(&mut manager);
        let raws: Vec<&str> = batch_entries(&messages).iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["second"]);
    }

    #[test]
    fn test_idle_manager_polls_empty() {
        let mut manager = IngestManager::default();
        assert!(!manager.is_active());
        assert!(manager.poll_progress().is_empty());
    }
}
