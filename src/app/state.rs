// lx - app/state.rs
//
// Per-workspace application state: the entry set, the filtered view,
// cursor, selection, notes, undo/redo history and the active mode.
//
// Single-writer: only the command loop mutates an `AppState`. Ingestion
// threads never touch it; their classified batches arrive as
// `IngestProgress` messages which the loop applies via `apply_ingest`.
//
// Every operation here is total. Problems surface as `status_message`
// text, never as errors or panics.

use crate::core::filter::{build_filter, evaluate};
use crate::core::model::{Entry, IngestProgress, InputOrigin, Level, Note};
use crate::core::signal::SignalResult;
use crate::util::constants::{
    DEFAULT_FREQUENCY_TOP_N, DEFAULT_MAX_SELECTION_LINES, MAX_NOTE_CHARS,
};
use std::collections::{BTreeMap, BTreeSet};

/// Characters of a note shown in the status line after a note jump.
const NOTE_STATUS_PREVIEW_CHARS: usize = 30;

/// Level filters in cycling order; `None` shows every level.
const LEVEL_CYCLE: &[Option<Level>] = &[
    None,
    Some(Level::Error),
    Some(Level::Warn),
    Some(Level::Info),
    Some(Level::Debug),
];

// =============================================================================
// Mode
// =============================================================================

/// Interactive mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    List,
    Filter,
    Detail,
    Help,
    Notes,
    Lookup,
    Signal,
    OpenFile,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::List => "LIST",
            Mode::Filter => "FILTER",
            Mode::Detail => "DETAIL",
            Mode::Help => "HELP",
            Mode::Notes => "NOTE",
            Mode::Lookup => "LOOKUP",
            Mode::Signal => "SIGNAL",
            Mode::OpenFile => "OPEN",
        }
    }

    /// Modes whose printable keys go into a text draft.
    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            Mode::Filter | Mode::Notes | Mode::Lookup | Mode::OpenFile
        )
    }
}

/// Label of a level filter value as shown in the status bar.
pub fn level_filter_label(level: Option<Level>) -> &'static str {
    level.map_or("ALL", |l| l.label())
}

// =============================================================================
// Limits
// =============================================================================

/// Tunables applied to a state, resolved from config.toml by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLimits {
    /// Ceiling for select-all and copy-visible operations.
    pub max_selection_lines: usize,
    /// Row count of the frequency analysis.
    pub frequency_top_n: usize,
}

impl Default for StateLimits {
    fn default() -> Self {
        Self {
            max_selection_lines: DEFAULT_MAX_SELECTION_LINES,
            frequency_top_n: DEFAULT_FREQUENCY_TOP_N,
        }
    }
}

// =============================================================================
// AppState
// =============================================================================

/// Mutable root of one workspace.
#[derive(Debug, Default)]
pub struct AppState {
    /// Every classified entry. Append-only; entries are soft-deleted.
    pub entries: Vec<Entry>,

    /// Entry indices passing the active filter, ascending.
    pub filtered: Vec<usize>,

    /// Position within `filtered`.
    pub cursor: usize,

    /// Selected entry indices, independent of `filtered`.
    pub selection: BTreeSet<usize>,

    /// Notes keyed by entry index.
    pub notes: BTreeMap<usize, Note>,

    /// Entry indices whose note box is expanded.
    pub showing_notes: BTreeSet<usize>,

    /// Batches of indices deleted together; the last element is the top.
    undo_stack: Vec<Vec<usize>>,
    redo_stack: Vec<Vec<usize>>,

    pub level_filter: Option<Level>,
    pub filter_query: String,

    pub mode: Mode,
    /// Mode to return to when the current one is dismissed.
    pub prev_mode: Mode,

    /// Vertical scroll of the detail pane, reset by every refilter.
    pub detail_scroll: usize,

    /// Draft of the note being edited and the entry it belongs to.
    pub note_draft: String,
    pub note_target: Option<usize>,

    /// Lookup query text. Results come from an external table.
    pub lookup_query: String,

    /// Path typed in Open-file mode.
    pub open_path_draft: String,

    /// Result shown in Signal mode.
    pub signal_result: Option<SignalResult>,

    /// One-line feedback for the status bar.
    pub status_message: String,

    pub origin: InputOrigin,
    /// File name, "stdin" or "clipboard".
    pub source_name: String,

    /// Bounded ingestion in progress.
    pub loading: bool,
    /// (lines done, total lines) of the bounded ingestion in progress.
    pub load_progress: Option<(usize, usize)>,
    /// Live stream still open.
    pub streaming: bool,

    pub limits: StateLimits,
}

impl AppState {
    pub fn new(limits: StateLimits) -> Self {
        Self {
            limits,
            status_message: "Ready. Press p to paste from the clipboard or o to open a file."
                .to_string(),
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Drop all content ahead of a new load into this workspace.
    ///
    /// Entries, notes, selection, undo history, filter and level filter are
    /// cleared; the mode returns to List.
    pub fn reset_for_load(&mut self, origin: InputOrigin, source_name: &str) {
        let limits = self.limits;
        *self = Self {
            limits,
            origin,
            source_name: source_name.to_string(),
            loading: true,
            ..Default::default()
        };
    }

    /// Append a classified batch, re-stamping indices so they continue the
    /// existing sequence. Does not refilter.
    pub fn append_entries(&mut self, batch: Vec<Entry>) -> usize {
        let added = batch.len();
        let base = self.entries.len();
        self.entries.reserve(added);
        for (offset, mut entry) in batch.into_iter().enumerate() {
            entry.index = base + offset;
            self.entries.push(entry);
        }
        added
    }

    /// End of a bounded load: one refilter over everything appended.
    pub fn finish_loading(&mut self) {
        self.loading = false;
        self.load_progress = None;
        self.refilter();
    }

    /// Apply one ingestion message. Valid in every mode; never changes mode.
    pub fn apply_ingest(&mut self, msg: IngestProgress) {
        match msg {
            IngestProgress::Started { total_lines } => {
                self.loading = total_lines.is_some();
                self.streaming = total_lines.is_none();
                self.load_progress = total_lines.map(|t| (0, t));
                self.status_message = match total_lines {
                    Some(t) => format!("Loading {t} lines..."),
                    None => "Streaming...".to_string(),
                };
            }
            IngestProgress::Batch {
                entries,
                lines_done,
                total_lines,
            } => {
                let added = self.append_entries(entries);
                self.load_progress = Some((lines_done, total_lines));
                tracing::debug!(added, lines_done, total_lines, "Applied ingest batch");
            }
            IngestProgress::Complete {
                total_entries,
                duration,
            } => {
                self.finish_loading();
                self.status_message = format!(
                    "Loaded {total_entries} lines in {:.0?}",
                    duration
                );
            }
            IngestProgress::LiveBatch { entries } => {
                let follow = self.filtered.is_empty() || self.cursor + 1 >= self.filtered.len();
                let added = self.append_entries(entries);
                self.refilter();
                if follow {
                    self.cursor_bottom();
                }
                tracing::trace!(added, total = self.entries.len(), "Applied live batch");
            }
            IngestProgress::StreamEnded { total_lines } => {
                self.streaming = false;
                self.loading = false;
                self.refilter();
                self.status_message = format!("Stream ended ({total_lines} lines)");
            }
            IngestProgress::Failed { error } => {
                tracing::warn!(error = %error, "Ingestion failed");
                self.loading = false;
                self.load_progress = None;
                self.refilter();
                self.status_message = error;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Filtered view and cursor
    // -------------------------------------------------------------------------

    /// Recompute `filtered` from scratch, clamp the cursor, drop stale
    /// selection indices and reset the detail scroll.
    pub fn refilter(&mut self) {
        let filter = build_filter(&self.filter_query);
        self.filtered = evaluate(&self.entries, &filter, self.level_filter);
        self.clamp_cursor();
        let entries = &self.entries;
        self.selection
            .retain(|&i| entries.get(i).is_some_and(|e| !e.deleted));
        self.detail_scroll = 0;
    }

    fn clamp_cursor(&mut self) {
        if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len().saturating_sub(1);
        }
    }

    /// Move the cursor by `delta`, clamped to the filtered view.
    pub fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.filtered.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    pub fn cursor_top(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_bottom(&mut self) {
        self.cursor = self.filtered.len().saturating_sub(1);
    }

    /// Entry index under the cursor.
    pub fn selected_index(&self) -> Option<usize> {
        self.filtered.get(self.cursor).copied()
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.selected_index().and_then(|i| self.entries.get(i))
    }

    /// Entries of the filtered view, in order.
    pub fn visible_entries(&self) -> Vec<&Entry> {
        self.filtered
            .iter()
            .filter_map(|&i| self.entries.get(i))
            .collect()
    }

    /// Move the cursor onto `index` if it is visible.
    pub fn jump_to_entry(&mut self, index: usize) -> bool {
        match self.filtered.binary_search(&index) {
            Ok(pos) => {
                self.cursor = pos;
                true
            }
            Err(_) => false,
        }
    }

    pub fn scroll_detail(&mut self, delta: isize) {
        self.detail_scroll = self.detail_scroll.saturating_add_signed(delta);
    }

    // -------------------------------------------------------------------------
    // Filter
    // -------------------------------------------------------------------------

    pub fn set_filter_query(&mut self, query: &str) {
        self.filter_query = query.to_string();
        self.refilter();
    }

    pub fn filter_push_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.refilter();
    }

    pub fn filter_backspace(&mut self) {
        if self.filter_query.pop().is_some() {
            self.refilter();
        }
    }

    /// Rotate All -> Error -> Warn -> Info -> Debug -> All.
    pub fn cycle_level_filter(&mut self) {
        let pos = LEVEL_CYCLE
            .iter()
            .position(|l| *l == self.level_filter)
            .unwrap_or(0);
        self.level_filter = LEVEL_CYCLE[(pos + 1) % LEVEL_CYCLE.len()];
        self.refilter();
        self.status_message = format!("Level: {}", level_filter_label(self.level_filter));
    }

    // -------------------------------------------------------------------------
    // Delete / undo / redo
    // -------------------------------------------------------------------------

    /// Soft-delete the selection (or the cursor entry when nothing is
    /// selected) as one undo unit. Returns the number of entries deleted.
    pub fn delete_selected(&mut self) -> usize {
        let batch: Vec<usize> = if self.selection.is_empty() {
            self.selected_index().into_iter().collect()
        } else {
            self.selection.iter().copied().collect()
        };
        self.selection.clear();
        let deleted = self.delete_batch(batch);
        self.status_message = if deleted == 0 {
            "Nothing to delete".to_string()
        } else {
            format!("Deleted {}", plural(deleted, "line"))
        };
        deleted
    }

    /// Soft-delete every live entry as one undo unit.
    pub fn clear_all(&mut self) -> usize {
        let batch: Vec<usize> = self
            .entries
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| e.index)
            .collect();
        self.selection.clear();
        let deleted = self.delete_batch(batch);
        self.status_message = if deleted == 0 {
            "Nothing to clear".to_string()
        } else {
            "Cleared all".to_string()
        };
        deleted
    }

    fn delete_batch(&mut self, batch: Vec<usize>) -> usize {
        let batch: Vec<usize> = batch
            .into_iter()
            .filter(|&i| self.entries.get(i).is_some_and(|e| !e.deleted))
            .collect();
        if batch.is_empty() {
            return 0;
        }
        for &i in &batch {
            self.entries[i].deleted = true;
        }
        let count = batch.len();
        self.undo_stack.push(batch);
        self.redo_stack.clear();
        self.refilter();
        count
    }

    /// Restore the most recent delete batch. Returns the number of entries
    /// actually restored; 0 leaves both stacks untouched.
    pub fn undo(&mut self) -> usize {
        let restored = self.flip_top(true);
        self.status_message = match restored {
            0 => "Nothing to undo".to_string(),
            n => format!("Restored {}", plural(n, "line")),
        };
        tracing::debug!(restored, "Undo");
        restored
    }

    /// Re-apply the most recently undone batch.
    pub fn redo(&mut self) -> usize {
        let deleted = self.flip_top(false);
        self.status_message = match deleted {
            0 => "Nothing to redo".to_string(),
            n => format!("Deleted {} again", plural(n, "line")),
        };
        tracing::debug!(deleted, "Redo");
        deleted
    }

    /// Move the top batch of one stack to the other, flipping `deleted` on
    /// the indices still in the expected state.
    fn flip_top(&mut self, undo: bool) -> usize {
        let (from, expect_deleted) = if undo {
            (&self.undo_stack, true)
        } else {
            (&self.redo_stack, false)
        };
        let Some(batch) = from.last() else {
            return 0;
        };
        let changing: Vec<usize> = batch
            .iter()
            .copied()
            .filter(|&i| {
                self.entries
                    .get(i)
                    .is_some_and(|e| e.deleted == expect_deleted)
            })
            .collect();
        if changing.is_empty() {
            return 0;
        }

        for &i in &changing {
            self.entries[i].deleted = !expect_deleted;
        }
        let moved = if undo {
            self.undo_stack.pop()
        } else {
            self.redo_stack.pop()
        };
        if let Some(batch) = moved {
            if undo {
                self.redo_stack.push(batch);
            } else {
                self.undo_stack.push(batch);
            }
        }
        self.refilter();
        changing.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Toggle the cursor entry in the selection.
    pub fn toggle_selection(&mut self) -> bool {
        let Some(index) = self.selected_index() else {
            return false;
        };
        if !self.selection.remove(&index) {
            if self.selection.len() >= self.limits.max_selection_lines {
                self.status_message = format!(
                    "Selection limit reached ({} lines)",
                    self.limits.max_selection_lines
                );
                return false;
            }
            self.selection.insert(index);
        }
        self.status_message = format!("{} selected", plural(self.selection.len(), "line"));
        true
    }

    /// Select every visible entry, unless there are more than the ceiling.
    pub fn select_all(&mut self) -> bool {
        if self.filtered.len() > self.limits.max_selection_lines {
            self.status_message = format!(
                "Too many lines to select ({} > {})",
                self.filtered.len(),
                self.limits.max_selection_lines
            );
            return false;
        }
        self.selection = self.filtered.iter().copied().collect();
        self.status_message = format!("{} selected", plural(self.selection.len(), "line"));
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.status_message = "Selection cleared".to_string();
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    /// Set the note on `index` from raw input. Empty input deletes the note.
    /// Returns true when a note is stored.
    pub fn set_note(&mut self, index: usize, input: &str) -> bool {
        match Note::parse(input) {
            Some(note) => {
                self.notes.insert(index, note);
                self.showing_notes.insert(index);
                true
            }
            None => {
                self.delete_note(index);
                false
            }
        }
    }

    pub fn delete_note(&mut self, index: usize) -> bool {
        self.showing_notes.remove(&index);
        self.notes.remove(&index).is_some()
    }

    pub fn note_for(&self, index: usize) -> Option<&Note> {
        self.notes.get(&index)
    }

    /// Open the note editor on the cursor entry.
    pub fn begin_note_edit(&mut self) -> bool {
        let Some(index) = self.selected_index() else {
            return false;
        };
        self.note_target = Some(index);
        self.note_draft = self
            .notes
            .get(&index)
            .map(Note::display_text)
            .unwrap_or_default();
        true
    }

    pub fn note_push_char(&mut self, c: char) {
        if self.note_draft.chars().count() < MAX_NOTE_CHARS {
            self.note_draft.push(c);
        }
    }

    pub fn note_backspace(&mut self) {
        self.note_draft.pop();
    }

    /// Store the draft on its target entry and close the editor.
    pub fn commit_note(&mut self) {
        let Some(index) = self.note_target.take() else {
            return;
        };
        let draft = std::mem::take(&mut self.note_draft);
        let had_note = self.notes.contains_key(&index);
        if self.set_note(index, &draft) {
            self.status_message = "Note saved".to_string();
        } else if had_note {
            self.status_message = "Note deleted".to_string();
        }
    }

    /// Show or hide the note box of the cursor entry.
    pub fn toggle_note_display(&mut self) {
        let Some(index) = self.selected_index() else {
            return;
        };
        if !self.notes.contains_key(&index) {
            self.status_message = "No note on this line".to_string();
        } else if !self.showing_notes.remove(&index) {
            self.showing_notes.insert(index);
        }
    }

    /// Hide every note when any is shown, otherwise show them all.
    pub fn toggle_all_notes_display(&mut self) {
        if self.notes.is_empty() {
            self.status_message = "No notes to show".to_string();
            return;
        }
        if self.notes.keys().any(|i| self.showing_notes.contains(i)) {
            self.showing_notes.clear();
            self.status_message = "Hiding all notes".to_string();
        } else {
            self.showing_notes = self.notes.keys().copied().collect();
            self.status_message = "Showing all notes".to_string();
        }
    }

    pub fn is_note_showing(&self, index: usize) -> bool {
        self.showing_notes.contains(&index) && self.notes.contains_key(&index)
    }

    /// First noted index after the cursor entry, wrapping around.
    pub fn next_noted_line(&self) -> Option<usize> {
        let current = self.selected_index();
        let after = match current {
            Some(c) => self.notes.range(c + 1..).next(),
            None => None,
        };
        after.or_else(|| self.notes.iter().next()).map(|(&i, _)| i)
    }

    /// Last noted index before the cursor entry, wrapping around.
    pub fn prev_noted_line(&self) -> Option<usize> {
        let current = self.selected_index();
        let before = match current {
            Some(c) => self.notes.range(..c).next_back(),
            None => None,
        };
        before.or_else(|| self.notes.iter().next_back()).map(|(&i, _)| i)
    }

    /// Jump to the next (or previous) noted line and expand its note.
    pub fn jump_to_note(&mut self, forward: bool) -> bool {
        let target = if forward {
            self.next_noted_line()
        } else {
            self.prev_noted_line()
        };
        let Some(index) = target else {
            self.status_message = "No notes".to_string();
            return false;
        };
        if !self.jump_to_entry(index) {
            self.status_message = format!("Line {} is hidden by the filter", index + 1);
            return false;
        }
        self.showing_notes.insert(index);
        if let Some(note) = self.notes.get(&index) {
            self.status_message = format!(
                "Note: {}",
                truncate_chars(&note.display_text(), NOTE_STATUS_PREVIEW_CHARS)
            );
        }
        true
    }

    // -------------------------------------------------------------------------
    // Text drafts (lookup, open file)
    // -------------------------------------------------------------------------

    pub fn lookup_push_char(&mut self, c: char) {
        self.lookup_query.push(c);
    }

    pub fn lookup_backspace(&mut self) {
        self.lookup_query.pop();
    }

    pub fn open_path_push_char(&mut self, c: char) {
        self.open_path_draft.push(c);
    }

    pub fn open_path_backspace(&mut self) {
        self.open_path_draft.pop();
    }
}

fn plural(count: usize, what: &str) -> String {
    if count == 1 {
        format!("1 {what}")
    } else {
        format!("{count} {what}s")
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify_lines;
    use std::time::Duration;

    fn loaded(lines: &[&str]) -> AppState {
        let mut state = AppState::new(StateLimits::default());
        state.reset_for_load(InputOrigin::Clipboard, "clipboard");
        state.append_entries(classify_lines(lines, 0));
        state.finish_loading();
        state
    }

    fn ten() -> AppState {
        let lines: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        loaded(&refs)
    }

    fn visible_indices(state: &AppState) -> Vec<usize> {
        state.filtered.clone()
    }

    #[test]
    fn test_append_restamps_indices() {
        let mut state = loaded(&["a", "b"]);
        let added = state.append_entries(classify_lines(&["c", "d"], 0));
        assert_eq!(added, 2);
        let indices: Vec<usize> = state.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(state.entries[0].raw, "a", "existing entries unchanged");
    }

    #[test]
    fn test_filter_and_level() {
        let mut state = loaded(&["2024-01-01 ERROR boom", "info: ok", "[WARN] careful"]);
        state.set_filter_query("error");
        assert_eq!(state.filtered, vec![0]);

        state.set_filter_query("");
        state.cycle_level_filter();
        assert_eq!(state.level_filter, Some(Level::Error));
        assert_eq!(state.filtered, vec![0]);
        assert_eq!(state.status_message, "Level: ERROR");

        state.cycle_level_filter();
        assert_eq!(state.filtered, vec![2]);
        for _ in 0..3 {
            state.cycle_level_filter();
        }
        assert_eq!(state.level_filter, None, "cycle wraps back to All");
        assert_eq!(state.filtered.len(), 3);
    }

    #[test]
    fn test_move_cursor_clamps() {
        let mut state = ten();
        state.move_cursor(-5);
        assert_eq!(state.cursor, 0);
        state.move_cursor(25);
        assert_eq!(state.cursor, 9);
        state.cursor_top();
        assert_eq!(state.cursor, 0);
        state.cursor_bottom();
        assert_eq!(state.selected_index(), Some(9));

        let mut empty = AppState::new(StateLimits::default());
        empty.move_cursor(3);
        assert_eq!(empty.cursor, 0);
        assert!(empty.selected_entry().is_none());
    }

    #[test]
    fn test_refilter_clamps_cursor_and_resets_scroll() {
        let mut state = ten();
        state.cursor_bottom();
        state.scroll_detail(7);
        state.set_filter_query("line 1");
        assert_eq!(state.filtered, vec![1]);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.detail_scroll, 0);
    }

    #[test]
    fn test_delete_cursor_entry_and_undo_redo() {
        let mut state = ten();
        let before = visible_indices(&state);
        state.move_cursor(3);
        assert_eq!(state.delete_selected(), 1);
        assert!(!state.filtered.contains(&3));
        assert_eq!(state.status_message, "Deleted 1 line");

        assert_eq!(state.undo(), 1);
        assert_eq!(visible_indices(&state), before);
        assert_eq!(state.redo_depth(), 1);

        assert_eq!(state.redo(), 1);
        assert!(!state.filtered.contains(&3));
        assert_eq!(state.undo_depth(), 1);
        assert_eq!(state.redo_depth(), 0);
    }

    #[test]
    fn test_delete_selection_as_one_batch() {
        let mut state = ten();
        for i in [2, 5, 7] {
            state.jump_to_entry(i);
            assert!(state.toggle_selection());
        }
        assert_eq!(state.delete_selected(), 3);
        assert!(state.selection.is_empty());
        assert_eq!(state.filtered.len(), 7);
        assert_eq!(state.undo_depth(), 1);

        assert_eq!(state.undo(), 3);
        for i in [2, 5, 7] {
            assert!(state.filtered.contains(&i));
        }
        assert_eq!(state.redo_depth(), 1);
        assert_eq!(state.undo_depth(), 0);
    }

    #[test]
    fn test_new_delete_clears_redo() {
        let mut state = ten();
        state.delete_selected();
        state.undo();
        assert_eq!(state.redo_depth(), 1);
        state.delete_selected();
        assert_eq!(state.redo_depth(), 0);
    }

    #[test]
    fn test_undo_redo_empty_stacks() {
        let mut state = ten();
        assert_eq!(state.undo(), 0);
        assert_eq!(state.status_message, "Nothing to undo");
        assert_eq!(state.redo(), 0);
        assert_eq!(state.status_message, "Nothing to redo");
    }

    #[test]
    fn test_undo_skips_indices_already_restored() {
        let mut state = ten();
        for i in [1, 2] {
            state.jump_to_entry(i);
            state.toggle_selection();
        }
        state.delete_selected();
        // Restore one index through another path.
        state.entries[1].deleted = false;
        assert_eq!(state.undo(), 1);

        // A batch that would change nothing leaves the stacks alone.
        state.entries[1].deleted = true;
        state.entries[2].deleted = true;
        state.redo_stack.clear();
        state.undo_stack.push(vec![4]);
        assert_eq!(state.undo(), 0);
        assert_eq!(state.undo_depth(), 1);
        assert_eq!(state.redo_depth(), 0);
    }

    #[test]
    fn test_clear_all_is_undoable() {
        let mut state = ten();
        assert_eq!(state.clear_all(), 10);
        assert!(state.filtered.is_empty());
        assert_eq!(state.clear_all(), 0);
        assert_eq!(state.undo(), 10);
        assert_eq!(state.filtered.len(), 10);
    }

    #[test]
    fn test_select_all_respects_ceiling() {
        let mut state = ten();
        state.limits.max_selection_lines = 5;
        assert!(!state.select_all());
        assert!(state.selection.is_empty());
        assert!(state.status_message.starts_with("Too many lines"));

        state.set_filter_query("line 1");
        assert!(state.select_all());
        assert_eq!(state.selection.len(), 1);
        state.clear_selection();
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_toggle_selection_ceiling_and_independence() {
        let mut state = ten();
        state.limits.max_selection_lines = 1;
        assert!(state.toggle_selection());
        state.move_cursor(1);
        assert!(!state.toggle_selection());
        assert_eq!(state.selection.len(), 1);

        // Selection survives a filter that hides it.
        state.set_filter_query("line 9");
        assert!(state.selection.contains(&0));
    }

    #[test]
    fn test_notes_set_replace_delete() {
        let mut state = ten();
        assert!(state.set_note(3, "!disk full"));
        assert_eq!(state.note_for(3).unwrap().text, "disk full");
        assert!(state.is_note_showing(3));

        assert!(!state.set_note(3, "   "));
        assert!(state.note_for(3).is_none());
        assert!(!state.delete_note(3));
    }

    #[test]
    fn test_note_editor_roundtrip() {
        let mut state = ten();
        state.jump_to_entry(4);
        assert!(state.begin_note_edit());
        for c in "?flaky".chars() {
            state.note_push_char(c);
        }
        state.commit_note();
        assert_eq!(state.status_message, "Note saved");
        assert_eq!(state.note_for(4).unwrap().display_text(), "?flaky");

        // Editing again starts from the stored text with its marker.
        state.begin_note_edit();
        assert_eq!(state.note_draft, "?flaky");
    }

    #[test]
    fn test_note_draft_capped() {
        let mut state = ten();
        state.begin_note_edit();
        for _ in 0..300 {
            state.note_push_char('x');
        }
        assert_eq!(state.note_draft.chars().count(), MAX_NOTE_CHARS);
    }

    #[test]
    fn test_noted_line_navigation_wraps() {
        let mut state = ten();
        state.set_note(2, "a");
        state.set_note(7, "b");
        state.jump_to_entry(3);
        assert_eq!(state.next_noted_line(), Some(7));
        assert_eq!(state.prev_noted_line(), Some(2));

        state.jump_to_entry(8);
        assert_eq!(state.next_noted_line(), Some(2), "wraps to first");
        state.jump_to_entry(1);
        assert_eq!(state.prev_noted_line(), Some(7), "wraps to last");

        assert!(state.jump_to_note(true));
        assert_eq!(state.selected_index(), Some(2));
        assert_eq!(state.status_message, "Note: a");
    }

    #[test]
    fn test_toggle_all_notes_display() {
        let mut state = ten();
        state.toggle_all_notes_display();
        assert_eq!(state.status_message, "No notes to show");

        state.set_note(1, "x");
        state.set_note(2, "y");
        state.toggle_all_notes_display();
        assert_eq!(state.status_message, "Hiding all notes");
        assert!(!state.is_note_showing(1));
        state.toggle_all_notes_display();
        assert!(state.is_note_showing(1) && state.is_note_showing(2));
    }

    #[test]
    fn test_toggle_note_display_without_note() {
        let mut state = ten();
        state.toggle_note_display();
        assert_eq!(state.status_message, "No note on this line");
    }

    #[test]
    fn test_live_batch_follows_bottom() {
        let mut state = AppState::new(StateLimits::default());
        state.reset_for_load(InputOrigin::Pipe, "stdin");
        state.apply_ingest(IngestProgress::Started { total_lines: None });
        assert!(state.streaming);

        state.apply_ingest(IngestProgress::LiveBatch {
            entries: classify_lines(&["a", "b", "c"], 0),
        });
        assert_eq!(state.cursor, 2);
        state.apply_ingest(IngestProgress::LiveBatch {
            entries: classify_lines(&["d"], 0),
        });
        assert_eq!(state.selected_entry().unwrap().raw, "d");
        assert_eq!(state.entries[3].index, 3);

        // Away from the bottom the cursor stays put.
        state.cursor_top();
        state.apply_ingest(IngestProgress::LiveBatch {
            entries: classify_lines(&["e"], 0),
        });
        assert_eq!(state.cursor, 0);

        state.apply_ingest(IngestProgress::StreamEnded { total_lines: 5 });
        assert!(!state.streaming);
        assert_eq!(state.status_message, "Stream ended (5 lines)");
    }

    #[test]
    fn test_bounded_batches_refilter_once_on_complete() {
        let mut state = AppState::new(StateLimits::default());
        state.reset_for_load(InputOrigin::File, "app.log");
        state.apply_ingest(IngestProgress::Started {
            total_lines: Some(4),
        });
        state.apply_ingest(IngestProgress::Batch {
            entries: classify_lines(&["a", "b"], 0),
            lines_done: 2,
            total_lines: 4,
        });
        assert!(state.filtered.is_empty(), "no refilter per chunk");
        assert_eq!(state.load_progress, Some((2, 4)));

        state.apply_ingest(IngestProgress::Batch {
            entries: classify_lines(&["c", "d"], 2),
            lines_done: 4,
            total_lines: 4,
        });
        state.apply_ingest(IngestProgress::Complete {
            total_entries: 4,
            duration: Duration::from_millis(3),
        });
        assert!(!state.loading);
        assert_eq!(state.filtered, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reset_for_load_clears_everything() {
        let mut state = ten();
        state.set_note(1, "x");
        state.toggle_selection();
        state.set_filter_query("line");
        state.cycle_level_filter();
        state.delete_selected();
        state.limits.max_selection_lines = 42;

        state.reset_for_load(InputOrigin::Clipboard, "clipboard");
        assert!(state.entries.is_empty());
        assert!(state.notes.is_empty());
        assert!(state.selection.is_empty());
        assert_eq!(state.undo_depth(), 0);
        assert!(state.filter_query.is_empty());
        assert_eq!(state.level_filter, None);
        assert_eq!(state.limits.max_selection_lines, 42, "limits survive");
    }

    #[test]
    fn test_visible_entries_follow_filter() {
        let state = loaded(&["alpha", "beta", "alphabet"]);
        let mut state = state;
        state.set_filter_query("alpha");
        let raws: Vec<&str> = state.visible_entries().iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["alpha", "alphabet"]);
    }
}
