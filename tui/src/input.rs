//! Input handling for Kiln TUI.

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;

use kiln_engine::{App, Focus, InputMode};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 1024; // bounded: no OOM
const MAX_EVENTS_PER_FRAME: usize = 64; // never starve rendering
const PAGE_LINES: isize = 10;

enum InputMsg {
    Event(Event),
    Error(String),
}

/// Reads terminal events on a blocking thread and hands them to the frame loop.
pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl InputPump {
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let join = tokio::task::spawn_blocking(move || input_loop(stop2, tx));
        Self {
            rx,
            stop,
            join: Some(join),
        }
    }

    pub async fn shutdown(&mut self) {
        // Closing the receiver unblocks a reader waiting on channel capacity.
        self.rx.close();

        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), join).await;
        }
    }
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: Arc<AtomicBool>, tx: mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    // Backpressure instead of dropping events.
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// Drain pending terminal events into `app`. Returns `true` when the app
/// should exit.
pub fn handle_events(app: &mut App, input: &mut InputPump) -> Result<bool> {
    let mut processed = 0;
    while processed < MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };

        if apply_event(app, ev) {
            return Ok(true);
        }
        processed += 1;
    }
    Ok(app.should_quit())
}

pub(crate) fn apply_event(app: &mut App, event: Event) -> bool {
    match event {
        Event::Key(key) => {
            if matches!(key.kind, KeyEventKind::Release) {
                return app.should_quit();
            }

            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                app.request_quit();
                return true;
            }

            match app.input_mode() {
                InputMode::Normal => handle_normal_mode(app, key),
                InputMode::Insert | InputMode::Command => handle_edit_mode(app, key),
            }
        }
        Event::Paste(text) => {
            // Single-line buffers: line breaks become spaces.
            let flattened = text.replace("\r\n", " ").replace(['\r', '\n'], " ");
            if let Some(buffer) = app.active_buffer_mut() {
                for c in flattened.chars() {
                    buffer.insert_char(c);
                }
            }
        }
        _ => {}
    }
    app.should_quit()
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('i') => app.enter_insert_mode(),
        KeyCode::Char(':' | '/') => app.enter_command_mode(),
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::BackTab => {
            // Three panes: two steps forward is one step back.
            app.cycle_focus();
            app.cycle_focus();
        }
        KeyCode::Char('1') => app.set_focus(Focus::Conversation),
        KeyCode::Char('2') => app.set_focus(Focus::Explorer),
        KeyCode::Char('3') => app.set_focus(Focus::Code),
        KeyCode::Char('j') | KeyCode::Down => move_focused(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_focused(app, -1),
        KeyCode::PageDown => move_focused(app, PAGE_LINES),
        KeyCode::PageUp => move_focused(app, -PAGE_LINES),
        KeyCode::Enter | KeyCode::Char(' ' | 'l') if app.focus() == Focus::Explorer => {
            app.activate_explorer_row();
        }
        KeyCode::Esc => app.clear_status(),
        _ => {}
    }
}

/// Down is positive. The conversation is anchored at the bottom, so moving
/// down there means scrolling toward the newest entry.
fn move_focused(app: &mut App, delta: isize) {
    match app.focus() {
        Focus::Conversation => app.scroll_conversation(-delta),
        Focus::Explorer => app.move_explorer_cursor(delta),
        Focus::Code => app.scroll_code(delta),
    }
}

fn handle_edit_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        KeyCode::Enter => app.submit_input(),
        _ => {
            let Some(buffer) = app.active_buffer_mut() else {
                return;
            };
            match key.code {
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    buffer.insert_char(c);
                }
                KeyCode::Backspace => buffer.delete_char_before(),
                KeyCode::Delete => buffer.delete_char_at(),
                KeyCode::Left => buffer.move_left(),
                KeyCode::Right => buffer.move_right(),
                KeyCode::Home => buffer.move_home(),
                KeyCode::End => buffer.move_end(),
                _ => {}
            }
        }
    }
}
