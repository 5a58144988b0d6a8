// lx - core/export.rs
//
// Text renderings of entries for the clipboard, plus CSV and JSON export
// of the visible set.
// Core layer: builds strings or writes to any Write trait object.

use crate::core::model::{Entry, Note};
use crate::util::constants::{APP_NAME, MAX_EXPORT_ENTRIES};
use crate::util::error::ExportError;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

// =============================================================================
// Clipboard text
// =============================================================================

/// Raw text of the given entries, newline-joined.
pub fn export_logs(entries: &[&Entry]) -> String {
    entries
        .iter()
        .map(|e| e.raw.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Visible entries prefixed with a block listing every note, sorted by line.
///
/// The notes block is omitted entirely when there are no notes. Each log
/// line carries its one-based line number so notes can be matched up.
pub fn export_logs_with_notes(entries: &[&Entry], notes: &BTreeMap<usize, Note>) -> String {
    let mut out = String::new();

    if !notes.is_empty() {
        out.push_str(&format!("=== NOTES ({APP_NAME}) ===\n"));
        for (index, note) in notes {
            out.push_str(&format!("• [line {}] {}\n", index + 1, note.display_text()));
        }
        out.push('\n');
    }

    out.push_str("=== LOGS (filtered) ===\n");
    for entry in entries {
        out.push_str(&format!("line {}: {}\n", entry.line_number(), entry.raw));
    }
    out
}

/// One entry, JSON pretty-printed when it decoded as an object.
pub fn export_entry(entry: &Entry, note: Option<&Note>) -> String {
    let body = entry_body(entry);
    let line = entry.line_number();
    match note {
        Some(note) => format!(
            "=== NOTE ({APP_NAME}) ===\n• [line {line}] {}\n\n=== LOG ===\nline {line}: {body}",
            note.display_text()
        ),
        None => format!("line {line}: {body}"),
    }
}

fn entry_body(entry: &Entry) -> String {
    match (&entry.fields, entry.is_json) {
        (Some(fields), true) => {
            serde_json::to_string_pretty(fields).unwrap_or_else(|_| entry.raw.clone())
        }
        _ => entry.raw.clone(),
    }
}

/// Status line for a copy operation: "Copied 1 line", "Copied 3 lines".
pub fn count_export(count: usize, what: &str) -> String {
    if count == 1 {
        format!("Copied 1 {what}")
    } else {
        format!("Copied {count} {what}s")
    }
}

// =============================================================================
// File export
// =============================================================================

/// File export format, chosen from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<ExportFormat, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn check_export_size(count: usize) -> Result<(), ExportError> {
    if count > MAX_EXPORT_ENTRIES {
        return Err(ExportError::TooManyEntries {
            count,
            max: MAX_EXPORT_ENTRIES,
        });
    }
    Ok(())
}

/// Export entries to CSV format.
///
/// Writes: line, level, timestamp, json, stack, message
pub fn export_csv<W: Write>(
    entries: &[&Entry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_export_size(entries.len())?;
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(["line", "level", "timestamp", "json", "stack", "message"])
        .map_err(csv_err)?;

    let mut count = 0;
    for entry in entries {
        csv_writer
            .write_record([
                entry.line_number().to_string().as_str(),
                entry.level.label(),
                entry.timestamp.as_str(),
                if entry.is_json { "true" } else { "false" },
                if entry.is_stack { "true" } else { "false" },
                entry.message.as_str(),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(entries = count, path = %export_path.display(), "CSV export written");
    Ok(count)
}

/// Export entries to JSON format (array of objects).
pub fn export_json<W: Write>(
    entries: &[&Entry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_export_size(entries.len())?;
    serde_json::to_writer_pretty(writer, entries).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(entries = entries.len(), path = %export_path.display(), "JSON export written");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use std::path::PathBuf;

    fn entries(raws: &[&str]) -> Vec<Entry> {
        raws.iter().enumerate().map(|(i, r)| classify(r, i)).collect()
    }

    #[test]
    fn test_export_logs_joins_raw() {
        let all = entries(&["a", "  b  ", "c"]);
        let refs: Vec<&Entry> = all.iter().collect();
        assert_eq!(export_logs(&refs), "a\n  b  \nc");
        assert_eq!(export_logs(&[]), "");
    }

    #[test]
    fn test_export_logs_with_notes_layout() {
        let all = entries(&["first", "second", "third"]);
        let refs: Vec<&Entry> = vec![&all[0], &all[2]];
        let mut notes = BTreeMap::new();
        notes.insert(2, Note::parse("!later").unwrap());
        notes.insert(0, Note::parse("earlier").unwrap());

        assert_eq!(
            export_logs_with_notes(&refs, &notes),
            "=== NOTES (lx) ===\n\
             • [line 1] earlier\n\
             • [line 3] !later\n\
             \n\
             === LOGS (filtered) ===\n\
             line 1: first\n\
             line 3: third\n"
        );
    }

    #[test]
    fn test_export_logs_with_notes_no_notes() {
        let all = entries(&["only"]);
        let refs: Vec<&Entry> = all.iter().collect();
        assert_eq!(
            export_logs_with_notes(&refs, &BTreeMap::new()),
            "=== LOGS (filtered) ===\nline 1: only\n"
        );
    }

    #[test]
    fn test_export_entry_plain_and_note() {
        let all = entries(&["x", "ERROR boom"]);
        assert_eq!(export_entry(&all[1], None), "line 2: ERROR boom");

        let note = Note::parse("?check this").unwrap();
        assert_eq!(
            export_entry(&all[1], Some(&note)),
            "=== NOTE (lx) ===\n• [line 2] ?check this\n\n=== LOG ===\nline 2: ERROR boom"
        );
    }

    #[test]
    fn test_export_entry_pretty_json() {
        let all = entries(&[r#"{"msg":"x","level":"warn"}"#]);
        // Object keys come out sorted.
        assert_eq!(
            export_entry(&all[0], None),
            "line 1: {\n  \"level\": \"warn\",\n  \"msg\": \"x\"\n}"
        );
    }

    #[test]
    fn test_count_export() {
        assert_eq!(count_export(1, "line"), "Copied 1 line");
        assert_eq!(count_export(0, "line"), "Copied 0 lines");
        assert_eq!(count_export(42, "line"), "Copied 42 lines");
    }

    #[test]
    fn test_csv_export() {
        let all = entries(&["2024-01-01 10:00:00 ERROR one", "plain, with comma"]);
        let refs: Vec<&Entry> = all.iter().collect();
        let mut buf = Vec::new();
        let count = export_csv(&refs, &mut buf, &PathBuf::from("out.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("line,level,timestamp,json,stack,message"));
        assert_eq!(
            lines.next(),
            Some("1,ERROR,2024-01-01 10:00:00,false,false,2024-01-01 10:00:00 ERROR one")
        );
        assert_eq!(lines.next(), Some("2,UNKNOWN,,false,false,\"plain, with comma\""));
    }

    #[test]
    fn test_json_export() {
        let all = entries(&["Test message"]);
        let refs: Vec<&Entry> = all.iter().collect();
        let mut buf = Vec::new();
        let count = export_json(&refs, &mut buf, &PathBuf::from("out.json")).unwrap();
        assert_eq!(count, 1);

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["raw"], "Test message");
        assert_eq!(value[0]["index"], 0);
        assert_eq!(value[0]["level"], "unknown");
    }

    #[test]
    fn test_export_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.CSV")).unwrap(),
            ExportFormat::Csv
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("x.json")).unwrap(),
            ExportFormat::Json
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("x.txt")),
            Err(ExportError::UnsupportedFormat { .. })
        ));
    }
}
