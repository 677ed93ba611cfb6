//! Modal input: normal-mode navigation, an insert-mode message draft and a
//! `/` command line.

use super::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Insert,
    Command,
}

/// Pane that receives navigation keys in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Conversation,
    Explorer,
    Code,
}

impl Focus {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Conversation => Self::Explorer,
            Self::Explorer => Self::Code,
            Self::Code => Self::Conversation,
        }
    }
}

/// Single-line text buffer. The cursor is a char index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftInput {
    text: String,
    cursor: usize,
}

impl DraftInput {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn delete_char_before(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.text.remove(at);
    }

    pub fn delete_char_at(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index();
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn take_text(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

#[derive(Debug, Default)]
pub(crate) struct InputState {
    mode: InputMode,
    draft: DraftInput,
    command: DraftInput,
}

impl App {
    #[must_use]
    pub fn input_mode(&self) -> InputMode {
        self.input.mode
    }

    #[must_use]
    pub fn draft(&self) -> &DraftInput {
        &self.input.draft
    }

    #[must_use]
    pub fn command_line(&self) -> &DraftInput {
        &self.input.command
    }

    pub fn enter_normal_mode(&mut self) {
        self.input.mode = InputMode::Normal;
    }

    pub fn enter_insert_mode(&mut self) {
        self.input.mode = InputMode::Insert;
    }

    pub fn enter_command_mode(&mut self) {
        self.input.command = DraftInput::default();
        self.input.mode = InputMode::Command;
    }

    /// Buffer the active mode edits. `None` in normal mode.
    pub fn active_buffer_mut(&mut self) -> Option<&mut DraftInput> {
        match self.input.mode {
            InputMode::Normal => None,
            InputMode::Insert => Some(&mut self.input.draft),
            InputMode::Command => Some(&mut self.input.command),
        }
    }

    /// Enter in insert or command mode.
    ///
    /// A draft starting with `/` is treated as a command so both entry points
    /// behave the same.
    pub fn submit_input(&mut self) {
        match self.input.mode {
            InputMode::Normal => {}
            InputMode::Insert => {
                let text = self.input.draft.take_text();
                if let Some(command) = text.trim_start().strip_prefix('/') {
                    self.process_command(command);
                } else {
                    self.send_message(text);
                }
            }
            InputMode::Command => {
                let raw = self.input.command.take_text();
                self.enter_normal_mode();
                self.process_command(&raw);
            }
        }
    }
}
