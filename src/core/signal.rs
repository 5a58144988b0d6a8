// lx - core/signal.rs
//
// Signal analytics over the visible entry set: error frequency, message
// lifetime, burst detection, and error diversity.
// Core layer: pure functions. Callers pass the currently visible entries;
// soft-deleted entries are skipped defensively regardless.

use crate::core::model::{Entry, Level};
use crate::util::constants::{
    BURST_WINDOWS, DEFAULT_FREQUENCY_TOP_N, SIGNAL_MESSAGE_PREVIEW_CHARS,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Result types
// =============================================================================

/// Which analysis to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Frequency,
    Lifetime,
    Burst,
    Diversity,
}

impl SignalKind {
    /// Whether the analysis needs a target message (the entry at the cursor).
    pub fn needs_target(&self) -> bool {
        matches!(self, SignalKind::Lifetime | SignalKind::Burst)
    }

    pub fn from_name(name: &str) -> Option<SignalKind> {
        match name.trim().to_lowercase().as_str() {
            "frequency" | "freq" | "1" => Some(SignalKind::Frequency),
            "lifetime" | "life" | "2" => Some(SignalKind::Lifetime),
            "burst" | "3" => Some(SignalKind::Burst),
            "diversity" | "div" | "4" => Some(SignalKind::Diversity),
            _ => None,
        }
    }
}

/// One row of the frequency table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyRow {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifetimeResult {
    pub message: String,
    /// First timestamp in encounter order, or "no timestamp".
    pub first_seen: String,
    /// Last timestamp in encounter order, or "no timestamp".
    pub last_seen: String,
    /// All occurrences of the message, with or without a timestamp.
    pub occurrences: usize,
    /// True when at most one occurrence carried a timestamp.
    pub is_single: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstResult {
    pub message: String,
    pub detected: bool,
    pub count: usize,
    /// Window that triggered detection (0 when nothing was detected).
    pub window_secs: i64,
    pub description: String,
}

/// Signal quality band of the diversity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::High => "HIGH",
            Quality::Medium => "MEDIUM",
            Quality::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiversityResult {
    pub total_errors: usize,
    pub unique_errors: usize,
    pub ratio: f64,
    pub quality: Quality,
    pub reason: &'static str,
}

/// Output of one analysis, consumed by the renderer and clipboard export.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalResult {
    Frequency(Vec<FrequencyRow>),
    Lifetime(LifetimeResult),
    Burst(BurstResult),
    Diversity(DiversityResult),
}

impl SignalResult {
    /// Plain-text rendering copied to the clipboard.
    pub fn format_for_clipboard(&self) -> String {
        match self {
            SignalResult::Frequency(rows) => {
                if rows.is_empty() {
                    return "No errors found".to_string();
                }
                let mut s = String::from("TOP ERROR SIGNALS\n\n");
                for row in rows {
                    s.push_str(&format!("{} x{}\n", row.message, row.count));
                }
                s
            }
            SignalResult::Lifetime(r) => {
                let mut s = format!("SIGNAL LIFETIME\n\nMessage: {}\n", r.message);
                if r.is_single {
                    s.push_str("Single occurrence\n");
                } else {
                    s.push_str(&format!("First seen: {}\n", r.first_seen));
                    s.push_str(&format!("Last seen:  {}\n", r.last_seen));
                }
                s.push_str(&format!("Occurrences: {}\n", r.occurrences));
                s
            }
            SignalResult::Burst(r) => {
                let mut s = format!("BURST ANALYSIS\n\nMessage: {}\n", r.message);
                if r.detected {
                    s.push_str("BURST DETECTED\n");
                    s.push_str(&r.description);
                    s.push('\n');
                } else {
                    s.push_str("No abnormal burst detected\n");
                }
                s
            }
            SignalResult::Diversity(r) => {
                let mut s = String::from("ERROR DIVERSITY\n\n");
                s.push_str(&format!("Total ERROR lines:     {}\n", r.total_errors));
                s.push_str(&format!("Unique ERROR messages: {}\n", r.unique_errors));
                s.push_str(&format!("\nSignal quality: {}\n", r.quality.label()));
                if !r.reason.is_empty() {
                    s.push_str(r.reason);
                    s.push('\n');
                }
                s
            }
        }
    }
}

// =============================================================================
// Frequency
// =============================================================================

/// Count Error-level messages and return the `limit` most frequent,
/// descending by count. Ties keep first-seen order. `limit == 0` means the
/// default of 10.
pub fn frequency<'a, I>(entries: I, limit: usize) -> Vec<FrequencyRow>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let limit = if limit == 0 {
        DEFAULT_FREQUENCY_TOP_N
    } else {
        limit
    };

    let mut rows: Vec<FrequencyRow> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for entry in entries {
        if entry.deleted || entry.level != Level::Error {
            continue;
        }
        match positions.get(entry.message.as_str()) {
            Some(&pos) => rows[pos].count += 1,
            None => {
                positions.insert(entry.message.as_str(), rows.len());
                rows.push(FrequencyRow {
                    message: entry.message.clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort: equal counts stay in first-seen order.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(limit);
    rows
}

// =============================================================================
// Lifetime
// =============================================================================

/// First/last timestamp and occurrence count of `target`.
///
/// First and last follow encounter order, not chronological order.
pub fn lifetime<'a, I>(entries: I, target: &str) -> LifetimeResult
where
    I: IntoIterator<Item = &'a Entry>,
{
    if target.is_empty() {
        return LifetimeResult {
            message: String::new(),
            first_seen: String::new(),
            last_seen: String::new(),
            occurrences: 0,
            is_single: true,
        };
    }

    let mut occurrences = 0;
    let mut first: Option<&str> = None;
    let mut last: Option<&str> = None;
    let mut stamped = 0;

    for entry in entries {
        if entry.deleted || entry.message != target {
            continue;
        }
        occurrences += 1;
        if !entry.timestamp.is_empty() {
            stamped += 1;
            first.get_or_insert(entry.timestamp.as_str());
            last = Some(entry.timestamp.as_str());
        }
    }

    const NO_TIMESTAMP: &str = "no timestamp";
    LifetimeResult {
        message: truncate_message(target, SIGNAL_MESSAGE_PREVIEW_CHARS),
        first_seen: first.unwrap_or(NO_TIMESTAMP).to_string(),
        last_seen: last.unwrap_or(NO_TIMESTAMP).to_string(),
        occurrences,
        is_single: stamped <= 1,
    }
}

// =============================================================================
// Burst
// =============================================================================

/// Detect abnormal temporal clustering of `target`.
///
/// For each configured (window, threshold), tightest first, finds the
/// largest number of parsed timestamps inside any `[t, t + window]` interval
/// anchored on an occurrence. The first window whose maximum reaches its
/// threshold is reported. Quadratic in the occurrence count of one message.
pub fn burst<'a, I>(entries: I, target: &str) -> BurstResult
where
    I: IntoIterator<Item = &'a Entry>,
{
    if target.is_empty() {
        return BurstResult {
            message: String::new(),
            detected: false,
            count: 0,
            window_secs: 0,
            description: "No message selected".to_string(),
        };
    }

    let times: Vec<NaiveDateTime> = entries
        .into_iter()
        .filter(|e| !e.deleted && e.message == target)
        .filter_map(|e| parse_signal_timestamp(&e.timestamp))
        .collect();

    let message = truncate_message(target, SIGNAL_MESSAGE_PREVIEW_CHARS);

    if times.len() < 2 {
        return BurstResult {
            message,
            detected: false,
            count: times.len(),
            window_secs: 0,
            description: "Not enough data points with timestamps".to_string(),
        };
    }

    for &(window_secs, threshold) in BURST_WINDOWS {
        let max_count = max_in_window(&times, chrono::Duration::seconds(window_secs));
        if max_count >= threshold {
            tracing::debug!(window_secs, max_count, "Burst detected");
            return BurstResult {
                message,
                detected: true,
                count: max_count,
                window_secs,
                description: format!("{max_count} occurrences in {window_secs}s window"),
            };
        }
    }

    BurstResult {
        message,
        detected: false,
        count: times.len(),
        window_secs: 0,
        description: "No abnormal burst pattern detected".to_string(),
    }
}

/// Largest count of timestamps within `[t_i, t_i + window]` over all `i`.
fn max_in_window(times: &[NaiveDateTime], window: chrono::Duration) -> usize {
    times
        .iter()
        .map(|&start| {
            times
                .iter()
                .filter(|&&t| t >= start && t.signed_duration_since(start) <= window)
                .count()
        })
        .max()
        .unwrap_or(0)
}

/// Year-less syslog stamps are placed in a leap reference year so that
/// "Feb 29" parses; only relative spacing matters for burst windows.
const SYSLOG_REFERENCE_YEAR: i32 = 2000;

/// Parse a timestamp string for burst analysis, trying each supported
/// format in order. Zoned timestamps are normalised to UTC; bare times of
/// day are placed on 1970-01-01. Returns `None` when nothing matches.
pub fn parse_signal_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.naive_utc());
    }

    const DATE_TIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%d/%b/%Y:%H:%M:%S",
    ];
    for format in DATE_TIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(ts, format) {
            return Some(ndt);
        }
    }

    let with_year = format!("{SYSLOG_REFERENCE_YEAR} {ts}");
    if let Ok(ndt) = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S") {
        return Some(ndt);
    }

    const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S"];
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    for format in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(ts, format) {
            return Some(epoch.and_time(t));
        }
    }

    None
}

/// Shorten a message to `max_chars`, marking the cut with an ellipsis.
fn truncate_message(msg: &str, max_chars: usize) -> String {
    if msg.chars().count() <= max_chars {
        return msg.to_string();
    }
    let mut s: String = msg.chars().take(max_chars.saturating_sub(1)).collect();
    s.push('…');
    s
}

// =============================================================================
// Diversity
// =============================================================================

/// Ratio of unique to total Error messages, banded into a quality signal.
pub fn diversity<'a, I>(entries: I) -> DiversityResult
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut unique: HashSet<&'a str> = HashSet::new();
    let mut total_errors = 0;

    for entry in entries {
        if entry.deleted || entry.level != Level::Error {
            continue;
        }
        total_errors += 1;
        unique.insert(entry.message.as_str());
    }

    let unique_errors = unique.len();
    let ratio = if total_errors > 0 {
        unique_errors as f64 / total_errors as f64
    } else {
        0.0
    };
    let (quality, reason) = classify_diversity(total_errors, unique_errors, ratio);

    DiversityResult {
        total_errors,
        unique_errors,
        ratio,
        quality,
        reason,
    }
}

/// Band boundaries are inclusive; a ratio on a boundary takes the better band.
fn classify_diversity(total: usize, unique: usize, ratio: f64) -> (Quality, &'static str) {
    if total == 0 {
        (Quality::High, "No errors - clean logs!")
    } else if unique == 1 {
        (Quality::High, "Single error type - easy to focus")
    } else if ratio <= 0.1 {
        (Quality::High, "Repetitive errors - clear pattern")
    } else if ratio <= 0.3 {
        (Quality::Medium, "Moderate variety - some patterns visible")
    } else if ratio <= 0.5 {
        (Quality::Medium, "Mixed errors - multiple issues")
    } else {
        (Quality::Low, "High diversity - many different errors")
    }
}
