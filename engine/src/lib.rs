//! Session engine for Kiln - state machine and orchestration.
//!
//! [`App`] owns everything for one project session: the event stream handle,
//! the conversation log, the generated-project workspace and the in-flight
//! manifest request. Network tasks never touch that state directly. They post
//! [`AppEvent`]s into a channel that [`App::process_events`] drains on the
//! owner's turn, so every mutation happens in one place and in arrival order.
//!
//! ```text
//! stream task ──Opened──▶ process_events ──first ready──▶ trigger_fetch
//!             ──Event───▶ Conversation::receive              │
//!                                                            ▼
//!                          handle_manifest ◀──Manifest── fetch task
//!                                │
//!                                ▼
//!                  FileTree::build ─▶ Workspace::install
//! ```
//!
//! Stale work is discarded by identity: stream events carry the
//! [`ConnectionId`] they were read on and manifest results carry the
//! [`FetchId`] of their request. Anything not matching the live id is dropped.

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

pub use kiln_client::{
    CloseReason, ConnectionState, Endpoints, ManifestClient, ManifestError, StreamEvent,
};
pub use kiln_core::{
    Activation, Conversation, ConversationEntry, Explorer, ExplorerRow, FileCategory, FileNode,
    FileTree, Origin, PreviewTemplate, RowKind, Speaker, Transition, TreeCounts, Workspace,
};
pub use kiln_types::{
    AgentEvent, ConnectionId, EventKind, FetchId, Manifest, NonEmptyString, ProjectId,
    ProjectIdError, strip_terminal_controls,
};

mod commands;
mod input;
mod project;
mod settings;

pub use commands::{CommandSpec, command_help_summary, command_specs};
pub use input::{DraftInput, Focus, InputMode};
pub use project::generate_project_id;
pub use settings::{AppSettings, SettingsError, UiOptions};

/// Work finished off the owner's turn, waiting to be applied.
#[derive(Debug)]
pub enum AppEvent {
    Stream {
        connection: ConnectionId,
        event: StreamEvent,
    },
    Manifest {
        fetch: FetchId,
        result: Result<Manifest, ManifestError>,
    },
}

#[derive(Debug)]
enum FetchState {
    Idle,
    InFlight { id: FetchId, abort: AbortHandle },
}

/// What the generated-project panes should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The stream has not opened yet, so no build was requested.
    WaitingForStream,
    /// A manifest was requested and has not been installed. A failed request
    /// stays here.
    Building,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

pub struct App {
    settings: AppSettings,
    project: ProjectId,
    /// Current build prompt. Starts as the seed prompt, replaced by each send.
    prompt: NonEmptyString,
    conversation: Conversation,
    workspace: Workspace,
    session: Option<kiln_client::StreamHandle>,
    connection_state: ConnectionState,
    last_connection: ConnectionId,
    /// The live connection has opened. Reset when the session changes.
    ready: bool,
    fetch: FetchState,
    last_fetch: FetchId,
    installed: bool,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    input: input::InputState,
    focus: Focus,
    code_scroll: usize,
    conversation_scroll: usize,
    /// Largest useful offsets, reported by the renderer each frame.
    code_scroll_max: usize,
    conversation_scroll_max: usize,
    status: Option<StatusMessage>,
    should_quit: bool,
    tick: usize,
}

impl App {
    /// Build a session for `project` seeded with `prompt`. Nothing connects
    /// until [`App::connect`].
    #[must_use]
    pub fn new(settings: AppSettings, project: ProjectId, prompt: NonEmptyString) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            project,
            conversation: Conversation::new(&prompt),
            prompt,
            workspace: Workspace::default(),
            session: None,
            connection_state: ConnectionState::Closed,
            last_connection: ConnectionId::new(0),
            ready: false,
            fetch: FetchState::Idle,
            last_fetch: FetchId::new(0),
            installed: false,
            events_tx,
            events_rx,
            input: input::InputState::default(),
            focus: Focus::default(),
            code_scroll: 0,
            conversation_scroll: 0,
            code_scroll_max: usize::MAX,
            conversation_scroll_max: usize::MAX,
            status: None,
            should_quit: false,
            tick: 0,
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Open the event stream for the current project, closing any previous
    /// connection first. Must be called inside a Tokio runtime.
    pub fn connect(&mut self) {
        self.close_session();

        let connection = self.last_connection.next();
        self.last_connection = connection;
        self.ready = false;

        let tx = self.events_tx.clone();
        let opened = kiln_client::open_stream(
            self.settings.endpoints(),
            &self.project,
            connection,
            move |event| {
                let _ = tx.send(AppEvent::Stream { connection, event });
            },
        );

        match opened {
            Ok(handle) => {
                self.session = Some(handle);
                self.connection_state = ConnectionState::Connecting;
            }
            Err(e) => {
                tracing::warn!(%connection, "Could not open event stream: {e}");
                self.connection_state = ConnectionState::Closed;
                self.set_status_error(format!("Could not open event stream: {e}"));
            }
        }
    }

    fn close_session(&mut self) {
        if let Some(mut handle) = self.session.take() {
            let connection = handle.connection();
            if handle.close() {
                tracing::debug!(%connection, "Closed event stream session");
            }
        }
        self.connection_state = ConnectionState::Closed;
    }

    fn cancel_fetch(&mut self) {
        if let FetchState::InFlight { id, abort } =
            std::mem::replace(&mut self.fetch, FetchState::Idle)
        {
            tracing::debug!(fetch = %id, "Aborting superseded manifest request");
            abort.abort();
        }
    }

    /// Re-target the session at another project.
    ///
    /// The old connection is closed, the conversation is reseeded with the
    /// current prompt, and the workspace is cleared until the new stream
    /// opens and a fresh manifest arrives.
    pub fn switch_project(&mut self, project: ProjectId) {
        if project == self.project {
            self.set_status(format!("Already on project {project}"));
            return;
        }
        tracing::info!(from = %self.project, to = %project, "Switching project");

        self.close_session();
        self.cancel_fetch();
        self.project = project;
        self.conversation = Conversation::new(&self.prompt);
        self.workspace.begin_rebuild();
        self.installed = false;
        self.code_scroll = 0;
        self.conversation_scroll = 0;
        self.connect();
        self.set_status_success(format!("Switched to project {}", self.project));
    }

    /// Close the stream and abort any in-flight request.
    pub fn shutdown(&mut self) {
        self.cancel_fetch();
        self.close_session();
    }

    // ========================================================================
    // Event processing
    // ========================================================================

    /// Apply every event that has arrived since the last call.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Stream { connection, event } => {
                    self.handle_stream_event(connection, event);
                }
                AppEvent::Manifest { fetch, result } => self.handle_manifest(fetch, result),
            }
        }
    }

    /// A requested close drops the handle, so events already queued from that
    /// connection no longer match.
    fn is_live(&self, connection: ConnectionId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|handle| handle.connection() == connection)
    }

    fn handle_stream_event(&mut self, connection: ConnectionId, event: StreamEvent) {
        if !self.is_live(connection) {
            tracing::debug!(%connection, ?event, "Dropping event from closed connection");
            return;
        }

        match event {
            StreamEvent::Opened => {
                self.connection_state = ConnectionState::Open;
                if !self.ready {
                    self.ready = true;
                    self.trigger_fetch();
                }
            }
            StreamEvent::Event(event) => {
                let kind = event.kind.clone();
                let transition = self.conversation.receive(event);
                tracing::debug!(%connection, %kind, ?transition, "Agent event");
                self.conversation_scroll = 0;
            }
            StreamEvent::Closed(reason) => {
                self.session = None;
                self.connection_state = ConnectionState::Closed;
                match reason {
                    CloseReason::Remote => self.set_status("Event stream closed by server"),
                    CloseReason::Failed(e) => {
                        self.set_status_warning(format!("Event stream lost: {e}"));
                    }
                }
            }
        }
    }

    /// Start a manifest request for the current prompt, superseding any
    /// request already in flight. The workspace is cleared immediately.
    pub fn trigger_fetch(&mut self) {
        self.cancel_fetch();

        let id = self.last_fetch.next();
        self.last_fetch = id;
        self.workspace.begin_rebuild();
        self.installed = false;
        self.code_scroll = 0;

        let client = self.settings.manifests().clone();
        let project = self.project.clone();
        let prompt = self.prompt.as_str().to_string();
        let tx = self.events_tx.clone();
        tracing::info!(fetch = %id, %project, "Requesting manifest");

        let task = async move {
            let result = client.fetch(&project, &prompt).await;
            let _ = tx.send(AppEvent::Manifest { fetch: id, result });
        };

        let (abort, registration) = AbortHandle::new_pair();
        tokio::spawn(async move {
            let _ = Abortable::new(task, registration).await;
        });
        self.fetch = FetchState::InFlight { id, abort };
        self.set_status("Building project...");
    }

    fn handle_manifest(&mut self, fetch: FetchId, result: Result<Manifest, ManifestError>) {
        match &self.fetch {
            FetchState::InFlight { id, .. } if *id == fetch => {}
            _ => {
                tracing::debug!(%fetch, "Discarding stale manifest response");
                return;
            }
        }
        self.fetch = FetchState::Idle;

        match result {
            Ok(manifest) => {
                let tree = FileTree::build(&manifest.files);
                for anomaly in tree.anomalies() {
                    tracing::warn!(%fetch, "Skipped manifest record: {anomaly}");
                }
                let preview = manifest
                    .sandbox_id
                    .as_deref()
                    .map(|sandbox| self.settings.preview().render(sandbox));
                let counts = tree.counts();
                self.workspace.install(tree, preview);
                self.installed = true;
                self.set_status_success(format!(
                    "Loaded {} files in {} folders",
                    counts.files, counts.folders
                ));
            }
            Err(e) => {
                tracing::warn!(%fetch, "Manifest request failed: {e}");
                self.set_status_error(format!("Build failed: {}", e.summary()));
            }
        }
    }

    /// Append a user entry and make its text the build prompt.
    ///
    /// After the stream is ready, a prompt change starts a new build.
    pub fn send_message(&mut self, text: String) {
        let Transition::Sent(prompt) = self.conversation.send_local(text) else {
            return;
        };
        self.conversation_scroll = 0;
        if prompt == self.prompt {
            return;
        }
        self.prompt = prompt;
        if self.ready {
            self.trigger_fetch();
        }
    }

    // ========================================================================
    // Selection and navigation
    // ========================================================================

    pub fn select_file(&mut self, path: &str) {
        match self.workspace.select(path) {
            Ok(()) => self.code_scroll = 0,
            Err(e) => self.set_status_warning(e.to_string()),
        }
    }

    pub fn move_explorer_cursor(&mut self, delta: isize) {
        self.workspace.move_cursor(delta);
    }

    /// Open the file or toggle the folder under the explorer cursor.
    pub fn activate_explorer_row(&mut self) {
        if let Some(Activation::Selected(_)) = self.workspace.activate_cursor() {
            self.code_scroll = 0;
        }
    }

    pub fn scroll_code(&mut self, delta: isize) {
        self.code_scroll = self
            .code_scroll
            .saturating_add_signed(delta)
            .min(self.code_scroll_max);
    }

    /// Scroll the conversation. The offset counts lines up from the bottom.
    pub fn scroll_conversation(&mut self, delta: isize) {
        self.conversation_scroll = self
            .conversation_scroll
            .saturating_add_signed(delta)
            .min(self.conversation_scroll_max);
    }

    /// Called by the renderer with the code pane's maximum offset.
    pub fn update_code_scroll_max(&mut self, max: usize) {
        self.code_scroll_max = max;
        self.code_scroll = self.code_scroll.min(max);
    }

    /// Called by the renderer with the conversation's maximum offset.
    pub fn update_conversation_scroll_max(&mut self, max: usize) {
        self.conversation_scroll_max = max;
        self.conversation_scroll = self.conversation_scroll.min(max);
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    // ========================================================================
    // Frame loop helpers
    // ========================================================================

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.set_status_kind(StatusKind::Info, message);
    }

    pub fn set_status_success(&mut self, message: impl Into<String>) {
        self.set_status_kind(StatusKind::Success, message);
    }

    pub fn set_status_warning(&mut self, message: impl Into<String>) {
        self.set_status_kind(StatusKind::Warning, message);
    }

    pub fn set_status_error(&mut self, message: impl Into<String>) {
        self.set_status_kind(StatusKind::Error, message);
    }

    fn set_status_kind(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind,
            text: message.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    #[must_use]
    pub fn prompt(&self) -> &NonEmptyString {
        &self.prompt
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        matches!(self.fetch, FetchState::InFlight { .. })
    }

    #[must_use]
    pub fn build_status(&self) -> BuildStatus {
        if self.installed {
            BuildStatus::Ready
        } else if self.ready || self.is_fetching() {
            BuildStatus::Building
        } else {
            BuildStatus::WaitingForStream
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    #[must_use]
    pub fn code_scroll(&self) -> usize {
        self.code_scroll
    }

    #[must_use]
    pub fn conversation_scroll(&self) -> usize {
        self.conversation_scroll
    }

    #[must_use]
    pub fn ui_options(&self) -> UiOptions {
        self.settings.ui()
    }

    #[cfg(test)]
    fn events_sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.events_tx.clone()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
