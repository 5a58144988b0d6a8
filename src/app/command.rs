// lx - app/command.rs
//
// Mode state machine. Key names map to `Command`s per mode (`from_key`);
// `transition` is the explicit table {mode x command -> target mode,
// action, guard}; `dispatch` runs one command against an `AppState`.
//
// Nothing here performs I/O. Actions that need the clipboard or the
// filesystem return an `Effect` for the outer loop to execute.

use crate::app::state::{AppState, Mode};
use crate::core::export::{count_export, export_entry, export_logs_with_notes};
use crate::core::signal::{self, SignalKind, SignalResult};
use std::path::PathBuf;

// =============================================================================
// Commands and effects
// =============================================================================

/// A discrete user input, already resolved from a key for the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Up,
    Down,
    Top,
    Bottom,
    PageUp,
    PageDown,
    /// Enter / confirm the current mode.
    Confirm,
    /// Esc / leave the current mode.
    Cancel,
    Backspace,
    /// A printable character typed into a text mode.
    Input(char),
    StartFilter,
    CycleLevel,
    OpenDetail,
    ShowHelp,
    StartNote,
    ToggleNote,
    ToggleAllNotes,
    NextNote,
    PrevNote,
    StartLookup,
    StartOpenFile,
    Signal(SignalKind),
    CopyVisible,
    CopyCurrent,
    Delete,
    ClearAll,
    Undo,
    Redo,
    ToggleSelect,
    SelectAll,
    ClearSelection,
    Paste,
    NewWorkspace,
    CloseWorkspace,
    NextWorkspace,
    PrevWorkspace,
}

impl Command {
    /// Resolve a key name for `mode`. Unbound keys return `None`.
    ///
    /// Key names follow the terminal convention: single characters as
    /// themselves (`"j"`, `"G"`, `"?"`), named keys in lower case
    /// (`"enter"`, `"esc"`, `"space"`, `"ctrl+r"`).
    pub fn from_key(mode: Mode, key: &str) -> Option<Command> {
        // Quit works everywhere.
        if key == "ctrl+c" {
            return Some(Command::Quit);
        }
        if mode.is_text_input() {
            return text_key(key);
        }
        match mode {
            Mode::List => list_key(key),
            Mode::Detail => detail_key(key),
            Mode::Help => match key {
                "esc" | "?" | "q" => Some(Command::Cancel),
                _ => None,
            },
            Mode::Signal => match key {
                "esc" | "q" => Some(Command::Cancel),
                "c" | "y" => Some(Command::CopyCurrent),
                _ => None,
            },
            Mode::Filter | Mode::Notes | Mode::Lookup | Mode::OpenFile => None,
        }
    }

    /// Commands handled by the session rather than a single workspace.
    pub fn is_session_command(&self) -> bool {
        matches!(
            self,
            Command::NewWorkspace
                | Command::CloseWorkspace
                | Command::NextWorkspace
                | Command::PrevWorkspace
        )
    }
}

fn text_key(key: &str) -> Option<Command> {
    match key {
        "enter" => Some(Command::Confirm),
        "esc" => Some(Command::Cancel),
        "backspace" => Some(Command::Backspace),
        "tab" => Some(Command::CycleLevel),
        "space" => Some(Command::Input(' ')),
        _ => single_char(key).map(Command::Input),
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(c),
        _ => None,
    }
}

/// Keys shared by List and Detail.
fn browse_key(key: &str) -> Option<Command> {
    Some(match key {
        "j" | "down" => Command::Down,
        "k" | "up" => Command::Up,
        "g" | "home" => Command::Top,
        "G" | "end" => Command::Bottom,
        "/" => Command::StartFilter,
        "?" => Command::ShowHelp,
        "N" => Command::StartNote,
        "n" => Command::ToggleNote,
        "m" => Command::ToggleAllNotes,
        "]" => Command::NextNote,
        "[" => Command::PrevNote,
        "ctrl+l" => Command::StartLookup,
        "1" => Command::Signal(SignalKind::Frequency),
        "2" => Command::Signal(SignalKind::Lifetime),
        "3" => Command::Signal(SignalKind::Burst),
        "4" => Command::Signal(SignalKind::Diversity),
        "y" => Command::CopyVisible,
        "c" => Command::CopyCurrent,
        "d" => Command::Delete,
        "u" => Command::Undo,
        "ctrl+r" => Command::Redo,
        "tab" => Command::CycleLevel,
        _ => return None,
    })
}

fn list_key(key: &str) -> Option<Command> {
    Some(match key {
        "q" => Command::Quit,
        "enter" => Command::OpenDetail,
        "space" => Command::ToggleSelect,
        "a" => Command::SelectAll,
        "A" => Command::ClearSelection,
        "x" => Command::ClearAll,
        "p" | "ctrl+v" => Command::Paste,
        "o" => Command::StartOpenFile,
        "pgdown" => Command::PageDown,
        "pgup" => Command::PageUp,
        "ctrl+n" => Command::NewWorkspace,
        "ctrl+w" => Command::CloseWorkspace,
        "ctrl+right" => Command::NextWorkspace,
        "ctrl+left" => Command::PrevWorkspace,
        _ => return browse_key(key),
    })
}

fn detail_key(key: &str) -> Option<Command> {
    Some(match key {
        "esc" | "enter" | "space" | "q" => Command::Cancel,
        "pgdown" | "ctrl+d" => Command::PageDown,
        "pgup" | "ctrl+u" => Command::PageUp,
        _ => return browse_key(key),
    })
}

/// Side effect requested by a command, executed by the outer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write `text` to the clipboard; on success show `status`.
    WriteClipboard { text: String, status: String },
    /// Read the clipboard and load its lines into the active workspace.
    ReadClipboard,
    /// Read the file and load its lines into the active workspace.
    OpenFile(PathBuf),
    Quit,
}

// =============================================================================
// Transition table
// =============================================================================

/// Mode after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stay,
    To(Mode),
    /// Return to the mode that was active before the current one.
    Back,
}

/// Precondition checked before the action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    /// The filtered view is non-empty (there is a cursor entry).
    HasEntries,
}

/// State mutation performed by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    MoveCursor(isize),
    CursorTop,
    CursorBottom,
    ScrollDetail(isize),
    FilterInput(char),
    FilterBackspace,
    ClearFilter,
    CycleLevel,
    BeginNote,
    NoteInput(char),
    NoteBackspace,
    SaveNote,
    ToggleNote,
    ToggleAllNotes,
    JumpNote { forward: bool },
    LookupInput(char),
    LookupBackspace,
    ClearLookup,
    BeginOpenFile,
    OpenPathInput(char),
    OpenPathBackspace,
    SubmitOpenFile,
    RunSignal(SignalKind),
    ClearSignal,
    CopyVisible,
    CopyCurrent,
    CopySignal,
    Delete,
    ClearAll,
    Undo,
    Redo,
    ToggleSelect,
    SelectAll,
    ClearSelection,
    Paste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: Target,
    pub action: Action,
    pub guard: Guard,
}

const fn stay(action: Action) -> Transition {
    Transition {
        target: Target::Stay,
        action,
        guard: Guard::Always,
    }
}

const fn to(mode: Mode, action: Action) -> Transition {
    Transition {
        target: Target::To(mode),
        action,
        guard: Guard::Always,
    }
}

const fn guarded(t: Transition) -> Transition {
    Transition {
        guard: Guard::HasEntries,
        ..t
    }
}

/// Detail pane lines scrolled per page key.
const DETAIL_PAGE_LINES: isize = 10;

/// List lines moved per page key.
const LIST_PAGE_LINES: isize = 20;

/// The mode transition table. `None` means the command is ignored in
/// `mode`. Ingestion events are not commands: they are applied in any mode
/// and never change it.
pub fn transition(mode: Mode, command: &Command) -> Option<Transition> {
    use Command as C;
    use Mode as M;

    let t = match (mode, *command) {
        (_, C::Quit) => stay(Action::Quit),

        // -- Text input modes ------------------------------------------------
        (M::Filter, C::Input(c)) => stay(Action::FilterInput(c)),
        (M::Filter, C::Backspace) => stay(Action::FilterBackspace),
        (M::Filter, C::CycleLevel) => stay(Action::CycleLevel),
        (M::Filter, C::Confirm) => Transition {
            target: Target::Back,
            ..stay(Action::None)
        },
        (M::Filter, C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::ClearFilter)
        },

        (M::Notes, C::Input(c)) => stay(Action::NoteInput(c)),
        (M::Notes, C::Backspace) => stay(Action::NoteBackspace),
        (M::Notes, C::Confirm | C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::SaveNote)
        },

        (M::Lookup, C::Input(c)) => stay(Action::LookupInput(c)),
        (M::Lookup, C::Backspace) => stay(Action::LookupBackspace),
        (M::Lookup, C::Confirm) => Transition {
            target: Target::Back,
            ..stay(Action::None)
        },
        (M::Lookup, C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::ClearLookup)
        },

        (M::OpenFile, C::Input(c)) => stay(Action::OpenPathInput(c)),
        (M::OpenFile, C::Backspace) => stay(Action::OpenPathBackspace),
        (M::OpenFile, C::Confirm) => to(M::List, Action::SubmitOpenFile),
        (M::OpenFile, C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::None)
        },

        // -- Overlays ----------------------------------------------------------
        (M::Help, C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::None)
        },
        (M::Signal, C::Cancel) => Transition {
            target: Target::Back,
            ..stay(Action::ClearSignal)
        },
        (M::Signal, C::CopyCurrent) => stay(Action::CopySignal),

        // -- Browsing (List and Detail) ----------------------------------------
        (M::Detail, C::Cancel) => to(M::List, Action::None),
        (M::Detail, C::PageDown) => stay(Action::ScrollDetail(DETAIL_PAGE_LINES)),
        (M::Detail, C::PageUp) => stay(Action::ScrollDetail(-DETAIL_PAGE_LINES)),
        (M::List, C::PageDown) => stay(Action::MoveCursor(LIST_PAGE_LINES)),
        (M::List, C::PageUp) => stay(Action::MoveCursor(-LIST_PAGE_LINES)),
        (M::List, C::OpenDetail) => guarded(to(M::Detail, Action::None)),
        (M::List, C::ToggleSelect) => guarded(stay(Action::ToggleSelect)),
        (M::List, C::SelectAll) => guarded(stay(Action::SelectAll)),
        (M::List, C::ClearSelection) => stay(Action::ClearSelection),
        (M::List, C::ClearAll) => stay(Action::ClearAll),
        (M::List, C::Paste) => stay(Action::Paste),
        (M::List, C::StartOpenFile) => to(M::OpenFile, Action::BeginOpenFile),

        (M::List | M::Detail, cmd) => return browse_transition(cmd),

        _ => return None,
    };
    Some(t)
}

fn browse_transition(command: Command) -> Option<Transition> {
    use Command as C;
    use Mode as M;

    Some(match command {
        C::Down => stay(Action::MoveCursor(1)),
        C::Up => stay(Action::MoveCursor(-1)),
        C::Top => stay(Action::CursorTop),
        C::Bottom => stay(Action::CursorBottom),
        C::StartFilter => to(M::Filter, Action::None),
        C::CycleLevel => stay(Action::CycleLevel),
        C::ShowHelp => to(M::Help, Action::None),
        C::StartNote => guarded(to(M::Notes, Action::BeginNote)),
        C::ToggleNote => guarded(stay(Action::ToggleNote)),
        C::ToggleAllNotes => stay(Action::ToggleAllNotes),
        C::NextNote => stay(Action::JumpNote { forward: true }),
        C::PrevNote => stay(Action::JumpNote { forward: false }),
        C::StartLookup => to(M::Lookup, Action::None),
        C::Signal(kind) if kind.needs_target() => {
            guarded(to(M::Signal, Action::RunSignal(kind)))
        }
        C::Signal(kind) => to(M::Signal, Action::RunSignal(kind)),
        C::CopyVisible => stay(Action::CopyVisible),
        C::CopyCurrent => guarded(stay(Action::CopyCurrent)),
        C::Delete => guarded(stay(Action::Delete)),
        C::Undo => stay(Action::Undo),
        C::Redo => stay(Action::Redo),
        _ => return None,
    })
}

// =============================================================================
// Dispatch
// =============================================================================

/// Result of running one action.
enum Applied {
    Done,
    Effect(Effect),
    /// The action could not run; the mode does not change.
    Rejected,
}

/// Run `command` against `state` through the transition table.
///
/// Returns the side effect the outer loop must execute, if any. Commands
/// with no table entry for the current mode are ignored.
pub fn dispatch(state: &mut AppState, command: Command) -> Option<Effect> {
    let t = transition(state.mode, &command)?;

    if t.guard == Guard::HasEntries && state.filtered.is_empty() {
        state.status_message = "No lines".to_string();
        return None;
    }

    let effect = match apply_action(state, t.action) {
        Applied::Rejected => return None,
        Applied::Done => None,
        Applied::Effect(effect) => Some(effect),
    };

    match t.target {
        Target::Stay => {}
        Target::To(mode) => {
            if mode != state.mode {
                state.prev_mode = state.mode;
                state.mode = mode;
            }
        }
        Target::Back => {
            let back = state.prev_mode;
            state.prev_mode = Mode::List;
            state.mode = if back == state.mode { Mode::List } else { back };
        }
    }

    effect
}

fn apply_action(state: &mut AppState, action: Action) -> Applied {
    match action {
        Action::None => {}
        Action::Quit => return Applied::Effect(Effect::Quit),
        Action::MoveCursor(delta) => state.move_cursor(delta),
        Action::CursorTop => state.cursor_top(),
        Action::CursorBottom => state.cursor_bottom(),
        Action::ScrollDetail(delta) => state.scroll_detail(delta),

        Action::FilterInput(c) => state.filter_push_char(c),
        Action::FilterBackspace => state.filter_backspace(),
        Action::ClearFilter => state.set_filter_query(""),
        Action::CycleLevel => state.cycle_level_filter(),

        Action::BeginNote => {
            if !state.begin_note_edit() {
                return Applied::Rejected;
            }
        }
        Action::NoteInput(c) => state.note_push_char(c),
        Action::NoteBackspace => state.note_backspace(),
        Action::SaveNote => state.commit_note(),
        Action::ToggleNote => state.toggle_note_display(),
        Action::ToggleAllNotes => state.toggle_all_notes_display(),
        Action::JumpNote { forward } => {
            state.jump_to_note(forward);
        }

        Action::LookupInput(c) => state.lookup_push_char(c),
        Action::LookupBackspace => state.lookup_backspace(),
        Action::ClearLookup => state.lookup_query.clear(),

        Action::BeginOpenFile => state.open_path_draft.clear(),
        Action::OpenPathInput(c) => state.open_path_push_char(c),
        Action::OpenPathBackspace => state.open_path_backspace(),
        Action::SubmitOpenFile => {
            let path = std::mem::take(&mut state.open_path_draft);
            let path = path.trim();
            if path.is_empty() {
                state.status_message = "No file path entered".to_string();
                return Applied::Done;
            }
            return Applied::Effect(Effect::OpenFile(PathBuf::from(path)));
        }

        Action::RunSignal(kind) => match run_signal(state, kind) {
            Some(result) => state.signal_result = Some(result),
            None => {
                state.status_message = "No line selected".to_string();
                return Applied::Rejected;
            }
        },
        Action::ClearSignal => state.signal_result = None,

        Action::CopyVisible => return copy_visible(state),
        Action::CopyCurrent => return copy_current(state),
        Action::CopySignal => {
            if let Some(result) = &state.signal_result {
                return Applied::Effect(Effect::WriteClipboard {
                    text: result.format_for_clipboard(),
                    status: "Copied signal data".to_string(),
                });
            }
        }

        Action::Delete => {
            state.delete_selected();
        }
        Action::ClearAll => {
            state.clear_all();
        }
        Action::Undo => {
            state.undo();
        }
        Action::Redo => {
            state.redo();
        }
        Action::ToggleSelect => {
            state.toggle_selection();
        }
        Action::SelectAll => {
            state.select_all();
        }
        Action::ClearSelection => state.clear_selection(),
        Action::Paste => return Applied::Effect(Effect::ReadClipboard),
    }
    Applied::Done
}

/// Run a signal analysis over the visible entries. `None` when the analysis
/// needs a target and there is no cursor entry.
pub fn run_signal(state: &AppState, kind: SignalKind) -> Option<SignalResult> {
    let visible = state.visible_entries();
    let visible = visible.iter().copied();
    let result = match kind {
        SignalKind::Frequency => {
            SignalResult::Frequency(signal::frequency(visible, state.limits.frequency_top_n))
        }
        SignalKind::Diversity => SignalResult::Diversity(signal::diversity(visible)),
        SignalKind::Lifetime => {
            let target = state.selected_entry()?.message.as_str();
            SignalResult::Lifetime(signal::lifetime(visible, target))
        }
        SignalKind::Burst => {
            let target = state.selected_entry()?.message.as_str();
            SignalResult::Burst(signal::burst(visible, target))
        }
    };
    Some(result)
}

/// Clipboard text for the visible entries plus notes, subject to the
/// selection ceiling.
fn copy_visible(state: &mut AppState) -> Applied {
    let count = state.filtered.len();
    if count > state.limits.max_selection_lines {
        state.status_message = format!(
            "Too many lines to copy ({count} > {})",
            state.limits.max_selection_lines
        );
        return Applied::Rejected;
    }
    let text = export_logs_with_notes(&state.visible_entries(), &state.notes);
    let status = match state.notes.len() {
        0 => count_export(count, "line"),
        notes => format!("Copied {count} lines + {notes} notes"),
    };
    Applied::Effect(Effect::WriteClipboard { text, status })
}

fn copy_current(state: &mut AppState) -> Applied {
    let Some(entry) = state.selected_entry() else {
        return Applied::Rejected;
    };
    let note = state.note_for(entry.index);
    let text = export_entry(entry, note);
    let status = match note {
        Some(_) => format!("Copied line {} + note", entry.line_number()),
        None => format!("Copied line {}", entry.line_number()),
    };
    Applied::Effect(Effect::WriteClipboard { text, status })
}
