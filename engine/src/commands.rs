//! Slash commands: `/quit`, `/project <id>`, `/help`.

use kiln_types::ProjectId;

use super::App;

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub palette_label: &'static str,
    pub help_label: &'static str,
    pub description: &'static str,
    pub show_in_help: bool,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        palette_label: "q, quit",
        help_label: "q(uit)",
        description: "Exit the application",
        show_in_help: true,
    },
    CommandSpec {
        palette_label: "project [id]",
        help_label: "project",
        description: "Show or switch the active project",
        show_in_help: true,
    },
    CommandSpec {
        palette_label: "help",
        help_label: "help",
        description: "Show available commands",
        show_in_help: false,
    },
];

#[must_use]
pub fn command_specs() -> &'static [CommandSpec] {
    COMMAND_SPECS
}

#[must_use]
pub fn command_help_summary() -> String {
    let labels: Vec<&str> = COMMAND_SPECS
        .iter()
        .filter(|spec| spec.show_in_help)
        .map(|spec| spec.help_label)
        .collect();
    format!("Commands: /{}", labels.join(", /"))
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    Quit,
    Project(Option<&'a str>),
    Help,
    Unknown(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    pub(crate) fn parse(raw: &'a str) -> Self {
        let raw = raw.trim_start().trim_start_matches('/');
        let parts: Vec<&str> = raw.split_whitespace().collect();

        match parts.first().copied() {
            Some("q" | "quit") => Command::Quit,
            Some("project" | "p") => Command::Project(parts.get(1).copied()),
            Some("help") => Command::Help,
            Some(cmd) => Command::Unknown(cmd),
            None => Command::Empty,
        }
    }
}

impl App {
    /// Run a command line, with or without its leading `/`.
    pub fn process_command(&mut self, raw: &str) {
        match Command::parse(raw) {
            Command::Quit => self.request_quit(),
            Command::Project(None) => {
                let message = format!("Project: {}", self.project());
                self.set_status(message);
            }
            Command::Project(Some(id)) => match ProjectId::new(id) {
                Ok(project) => self.switch_project(project),
                Err(e) => self.set_status_warning(format!("Invalid project id: {e}")),
            },
            Command::Help => self.set_status(command_help_summary()),
            Command::Unknown(cmd) => {
                self.set_status_warning(format!("Unknown command: /{cmd}"));
            }
            Command::Empty => {}
        }
    }
}
