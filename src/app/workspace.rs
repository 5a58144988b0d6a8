// lx - app/workspace.rs
//
// Multi-workspace session. Each workspace owns an independent `AppState`
// and its own `IngestManager`; nothing is shared between workspaces.
// The session routes commands to the active workspace and drains every
// workspace's ingestion channel into that workspace's state only.

use crate::app::command::{self, Command, Effect};
use crate::app::ingest::{IngestManager, IngestSettings};
use crate::app::state::{AppState, StateLimits};
use crate::core::model::InputOrigin;
use crate::util::constants::MAX_WORKSPACES;
use std::io::BufRead;
use std::time::{Duration, Instant};

/// Interval between polls while waiting for ingestion to finish.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One isolated analysis context.
pub struct Workspace {
    /// Stable identifier, unique within the session.
    pub id: usize,
    pub state: AppState,
    ingest: IngestManager,
}

impl Workspace {
    fn new(id: usize, limits: StateLimits, settings: IngestSettings) -> Self {
        Self {
            id,
            state: AppState::new(limits),
            ingest: IngestManager::new(settings),
        }
    }

    /// Display label: the source name, or the id for an empty workspace.
    pub fn label(&self) -> String {
        if self.state.source_name.is_empty() {
            format!("[{}]", self.id)
        } else {
            format!("[{}] {}", self.id, self.state.source_name)
        }
    }

    pub fn is_ingesting(&self) -> bool {
        self.ingest.is_active()
    }
}

/// Up to `MAX_WORKSPACES` workspaces, one of which is active.
pub struct Session {
    workspaces: Vec<Workspace>,
    active: usize,
    next_id: usize,
    limits: StateLimits,
    settings: IngestSettings,
}

impl Session {
    /// A session with one empty workspace.
    pub fn new(limits: StateLimits, settings: IngestSettings) -> Self {
        Self {
            workspaces: vec![Workspace::new(1, limits, settings)],
            active: 0,
            next_id: 2,
            limits,
            settings,
        }
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Workspace {
        &self.workspaces[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.active]
    }

    /// Open a new empty workspace and make it active.
    pub fn new_workspace(&mut self) -> bool {
        if self.workspaces.len() >= MAX_WORKSPACES {
            self.active_mut().state.status_message =
                format!("Maximum of {MAX_WORKSPACES} workspaces reached");
            return false;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.workspaces
            .push(Workspace::new(id, self.limits, self.settings));
        self.active = self.workspaces.len() - 1;
        tracing::info!(id, count = self.workspaces.len(), "Workspace opened");
        true
    }

    /// Close the active workspace. The last workspace cannot be closed.
    ///
    /// Its ingestion receiver is dropped with it, so its workers stop at
    /// their next send.
    pub fn close_workspace(&mut self) -> bool {
        if self.workspaces.len() == 1 {
            self.active_mut().state.status_message =
                "Cannot close the last workspace".to_string();
            return false;
        }
        let closed = self.workspaces.remove(self.active);
        if self.active >= self.workspaces.len() {
            self.active = self.workspaces.len() - 1;
        }
        tracing::info!(id = closed.id, count = self.workspaces.len(), "Workspace closed");
        true
    }

    pub fn next_workspace(&mut self) {
        self.active = (self.active + 1) % self.workspaces.len();
    }

    pub fn prev_workspace(&mut self) {
        self.active = (self.active + self.workspaces.len() - 1) % self.workspaces.len();
    }

    /// Route a command: session commands here, everything else to the
    /// active workspace's state machine.
    pub fn dispatch(&mut self, command: Command) -> Option<Effect> {
        if !command.is_session_command() {
            return command::dispatch(&mut self.active_mut().state, command);
        }
        match command {
            Command::NewWorkspace => {
                self.new_workspace();
            }
            Command::CloseWorkspace => {
                self.close_workspace();
            }
            Command::NextWorkspace => self.next_workspace(),
            Command::PrevWorkspace => self.prev_workspace(),
            _ => {}
        }
        None
    }

    /// Resolve `key` for the active mode and dispatch it.
    pub fn dispatch_key(&mut self, key: &str) -> Option<Effect> {
        let mode = self.active().state.mode;
        match Command::from_key(mode, key) {
            Some(command) => self.dispatch(command),
            None => {
                tracing::trace!(key, mode = mode.label(), "Unbound key");
                None
            }
        }
    }

    /// Apply pending ingestion messages of every workspace to that
    /// workspace's state. Returns the number of messages applied.
    pub fn poll_ingest(&mut self) -> usize {
        let mut applied = 0;
        for ws in &mut self.workspaces {
            for msg in ws.ingest.poll_progress() {
                ws.state.apply_ingest(msg);
                applied += 1;
            }
        }
        applied
    }

    pub fn is_ingesting(&self) -> bool {
        self.workspaces.iter().any(Workspace::is_ingesting)
    }

    /// Poll until no workspace is ingesting or `timeout` elapses.
    /// Returns true when everything finished.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll_ingest();
            if !self.is_ingesting() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    /// Replace the active workspace's contents with `lines`, classified in
    /// the background.
    pub fn load_lines(&mut self, lines: Vec<String>, origin: InputOrigin, source_name: &str) {
        let ws = self.active_mut();
        ws.state.reset_for_load(origin, source_name);
        ws.ingest.start_batch(lines);
    }

    /// Replace the active workspace's contents with a live stream.
    pub fn start_live<R>(&mut self, reader: R, source_name: &str)
    where
        R: BufRead + Send + 'static,
    {
        let ws = self.active_mut();
        ws.state.reset_for_load(InputOrigin::Pipe, source_name);
        ws.ingest.start_live(reader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::Mode;
    use std::io::Cursor;

    fn session() -> Session {
        Session::new(StateLimits::default(), IngestSettings::default())
    }

    fn lines(raws: &[&str]) -> Vec<String> {
        raws.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_workspace_limit() {
        let mut s = session();
        for _ in 1..MAX_WORKSPACES {
            assert!(s.new_workspace());
        }
        assert!(!s.new_workspace());
        assert_eq!(s.workspaces().len(), MAX_WORKSPACES);
        assert!(s.active().state.status_message.starts_with("Maximum"));
    }

    #[test]
    fn test_close_and_cycle() {
        let mut s = session();
        assert!(!s.close_workspace());
        s.new_workspace();
        s.new_workspace();
        assert_eq!(s.active_index(), 2);

        s.next_workspace();
        assert_eq!(s.active_index(), 0);
        s.prev_workspace();
        assert_eq!(s.active_index(), 2);

        assert!(s.close_workspace());
        assert_eq!(s.active_index(), 1);
        let ids: Vec<usize> = s.workspaces().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_workspaces_are_isolated() {
        let mut s = session();
        s.load_lines(lines(&["ERROR one", "two"]), InputOrigin::Clipboard, "clipboard");
        s.new_workspace();
        s.load_lines(lines(&["alpha"]), InputOrigin::File, "a.log");
        assert!(s.wait_idle(Duration::from_secs(10)));

        assert_eq!(s.workspaces()[0].state.entries.len(), 2);
        assert_eq!(s.workspaces()[1].state.entries.len(), 1);

        s.dispatch_key("d");
        assert!(s.active().state.filtered.is_empty());
        assert_eq!(s.workspaces()[0].state.filtered, vec![0, 1]);

        s.dispatch_key("ctrl+left");
        assert_eq!(s.active().state.source_name, "clipboard");
        assert_eq!(s.active().label(), "[1] clipboard");
    }

    #[test]
    fn test_live_ingest_into_background_workspace() {
        let mut s = session();
        s.start_live(Cursor::new(b"a\nb\nc\n".to_vec()), "stdin");
        s.new_workspace();
        assert!(s.wait_idle(Duration::from_secs(10)));

        let live = &s.workspaces()[0].state;
        assert_eq!(live.entries.len(), 3);
        assert!(!live.streaming);
        assert!(s.active().state.entries.is_empty());
    }

    #[test]
    fn test_dispatch_key_routes_mode() {
        let mut s = session();
        s.load_lines(lines(&["x"]), InputOrigin::Clipboard, "clipboard");
        s.wait_idle(Duration::from_secs(10));
        s.dispatch_key("/");
        assert_eq!(s.active().state.mode, Mode::Filter);
        // Workspace keys are plain text while filtering.
        s.dispatch_key("ctrl+n");
        assert_eq!(s.workspaces().len(), 1);
        assert_eq!(s.dispatch_key("ctrl+c"), Some(Effect::Quit));
    }
}
