//! Kiln CLI - Binary entry point and terminal session management.
//!
//! # Architecture
//!
//! The CLI bridges [`kiln_engine`] (session state) and [`kiln_tui`] (rendering),
//! providing RAII-based terminal management with guaranteed cleanup.
//!
//! ```text
//! main() -> resolve config -> App::new + connect -> TerminalSession::new() -> run_app()
//! ```
//!
//! # Event Loop
//!
//! A fixed 8ms (~120 FPS) render cadence:
//!
//! 1. Wait for frame tick
//! 2. Drain input queue (non-blocking via [`kiln_tui::InputPump`])
//! 3. Advance animation state (`app.tick()`)
//! 4. Apply stream and manifest events (`app.process_events()`)
//! 5. Render frame

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::{
    fs::{self, OpenOptions},
    io::{Stdout, Write, stdout},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kiln_config::KilnConfig;
use kiln_engine::{App, AppSettings, NonEmptyString, ProjectId, generate_project_id};
use kiln_tui::{InputPump, draw, handle_events};

#[derive(Debug, Parser)]
#[command(name = "kiln", version, about = "Watch an AI agent build a project")]
struct Cli {
    /// What to build. Defaults to `app.default_prompt` from the config.
    prompt: Option<String>,

    /// Attach to an existing project instead of generating a new id.
    #[arg(short, long, value_name = "ID")]
    project: Option<String>,

    /// Read configuration from this file instead of ~/.kiln/config.toml.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_kiln_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write over the TUI.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_kiln_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in kiln_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn kiln_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.kiln/logs/kiln.log
    if let Some(dir) = kiln_config::kiln_dir() {
        candidates.push(dir.join("logs").join("kiln.log"));
    }

    // Fallback: ./.kiln/logs/kiln.log
    candidates.push(PathBuf::from(".kiln").join("logs").join("kiln.log"));

    candidates
}

fn load_config(path: Option<&PathBuf>) -> KilnConfig {
    match path {
        Some(path) => match KilnConfig::load_from(path) {
            Ok(config) => config.resolve_env(),
            Err(e) => {
                tracing::warn!("Using default config: {e}");
                KilnConfig::default().resolve_env()
            }
        },
        None => KilnConfig::resolve(),
    }
}

/// Raw mode, bracketed paste and the alternate screen, undone on drop so the
/// terminal stays usable after early returns and panics.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnableBracketedPaste, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            let _ = execute!(out, LeaveAlternateScreen, DisableBracketedPaste);
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(t) => t,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen, DisableBracketedPaste);
                return Err(err.into());
            }
        };

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );
        let _ = Write::flush(self.terminal.backend_mut());
        let _ = self.terminal.show_cursor();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.as_ref());
    let settings = AppSettings::from_config(&config).context("invalid configuration")?;

    let project = match cli.project {
        Some(raw) => ProjectId::new(raw).context("invalid --project")?,
        None => generate_project_id().context("failed to generate a project id")?,
    };
    let prompt = NonEmptyString::new(cli.prompt.unwrap_or(config.app.default_prompt))
        .context("the build prompt must not be empty")?;

    tracing::info!(%project, "Starting session");
    let mut app = App::new(settings, project, prompt);
    app.connect();

    let result = {
        let mut session = TerminalSession::new()?;
        run_app(&mut session.terminal, &mut app).await
    };

    app.shutdown();
    if let Err(err) = &result {
        eprintln!("Error: {err:?}");
    }
    result
}

const FRAME_DURATION: Duration = Duration::from_millis(8);

async fn run_app<B>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
{
    let mut input = InputPump::new();
    let mut frames = tokio::time::interval(FRAME_DURATION);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: Result<()> = loop {
        tokio::select! {
            _ = frames.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                app.request_quit();
            }
        }

        // Non-blocking input (drain queue only)
        match handle_events(app, &mut input) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
        if app.should_quit() {
            break Ok(());
        }

        app.tick();
        app.process_events();

        if let Err(e) = terminal.draw(|frame| draw(frame, app)) {
            break Err(e.into());
        }
    };

    input.shutdown().await;
    result
}
