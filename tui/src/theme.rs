//! Color theme and glyphs for Kiln TUI.
//!
//! Uses Kanagawa Wave palette by default with an optional high-contrast override.

use ratatui::style::{Color, Modifier, Style};

use kiln_engine::{ConnectionState, EventKind, FileCategory, UiOptions};

/// Kanagawa Wave color palette constants.
mod colors {
    use super::Color;

    // === Backgrounds (Sumi Ink) ===
    pub const BG_DARK: Color = Color::Rgb(22, 22, 29); // sumiInk0
    pub const BG_PANEL: Color = Color::Rgb(31, 31, 40); // sumiInk3
    pub const BG_HIGHLIGHT: Color = Color::Rgb(42, 42, 55); // sumiInk4
    pub const BG_BORDER: Color = Color::Rgb(84, 84, 109); // sumiInk6

    // === Foregrounds (Fuji) ===
    pub const TEXT_PRIMARY: Color = Color::Rgb(220, 215, 186); // fujiWhite
    pub const TEXT_SECONDARY: Color = Color::Rgb(200, 192, 147); // oldWhite
    pub const TEXT_MUTED: Color = Color::Rgb(114, 113, 105); // fujiGray

    // === Primary/Brand ===
    pub const PRIMARY: Color = Color::Rgb(149, 127, 184); // oniViolet

    // === Accent Colors ===
    pub const BLUE: Color = Color::Rgb(126, 156, 216); // crystalBlue
    pub const CYAN: Color = Color::Rgb(127, 180, 202); // springBlue
    pub const GREEN: Color = Color::Rgb(152, 187, 108); // springGreen
    pub const YELLOW: Color = Color::Rgb(230, 195, 132); // carpYellow
    pub const ORANGE: Color = Color::Rgb(255, 160, 102); // surimiOrange
    pub const RED: Color = Color::Rgb(255, 93, 98); // peachRed

    // === Semantic Aliases ===
    pub const ACCENT: Color = CYAN;
    pub const SUCCESS: Color = GREEN;
    pub const WARNING: Color = YELLOW;
    pub const ERROR: Color = RED;
    pub const PEACH: Color = ORANGE;
}

/// Resolved theme palette used by the UI.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg_dark: Color,
    pub bg_panel: Color,
    pub bg_highlight: Color,
    pub bg_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,
    pub primary: Color,
    pub accent: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub peach: Color,
    pub green: Color,
    pub yellow: Color,
    pub red: Color,
    pub blue: Color,
}

impl Palette {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            bg_dark: colors::BG_DARK,
            bg_panel: colors::BG_PANEL,
            bg_highlight: colors::BG_HIGHLIGHT,
            bg_border: colors::BG_BORDER,
            text_primary: colors::TEXT_PRIMARY,
            text_secondary: colors::TEXT_SECONDARY,
            text_muted: colors::TEXT_MUTED,
            primary: colors::PRIMARY,
            accent: colors::ACCENT,
            blue: colors::BLUE,
            success: colors::SUCCESS,
            warning: colors::WARNING,
            error: colors::ERROR,
            peach: colors::PEACH,
            green: colors::GREEN,
            yellow: colors::YELLOW,
            red: colors::RED,
        }
    }

    #[must_use]
    pub fn high_contrast() -> Self {
        Self {
            bg_dark: Color::Black,
            bg_panel: Color::Black,
            bg_highlight: Color::DarkGray,
            bg_border: Color::Gray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            text_muted: Color::DarkGray,
            primary: Color::White,
            accent: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            peach: Color::Yellow,
            green: Color::Green,
            yellow: Color::Yellow,
            red: Color::Red,
            blue: Color::Blue,
        }
    }

    /// Accent for an agent entry.
    #[must_use]
    pub fn event_color(&self, kind: &EventKind) -> Color {
        match kind {
            EventKind::Thinking => self.text_muted,
            EventKind::Started => self.primary,
            EventKind::FileCreated => self.blue,
            EventKind::Command => self.peach,
            EventKind::Completed => self.success,
            EventKind::Other(_) => self.text_secondary,
        }
    }

    #[must_use]
    pub fn connection_color(&self, state: ConnectionState) -> Color {
        match state {
            ConnectionState::Connecting => self.warning,
            ConnectionState::Open => self.success,
            ConnectionState::Closed => self.text_muted,
        }
    }
}

#[must_use]
pub fn palette(options: UiOptions) -> Palette {
    if options.high_contrast {
        Palette::high_contrast()
    } else {
        Palette::standard()
    }
}

/// ASCII/Unicode glyphs for icons and spinners.
#[derive(Debug, Clone, Copy)]
pub struct Glyphs {
    pub user: &'static str,
    pub thinking: &'static str,
    pub file_created: &'static str,
    pub command: &'static str,
    pub completed: &'static str,
    pub unknown_event: &'static str,
    pub folder_open: &'static str,
    pub folder_closed: &'static str,
    pub file_code: &'static str,
    pub file_json: &'static str,
    pub file_text: &'static str,
    pub file_image: &'static str,
    pub file_style: &'static str,
    pub file_markup: &'static str,
    pub file_other: &'static str,
    pub status_ready: &'static str,
    pub status_missing: &'static str,
    pub selected: &'static str,
    pub separator: &'static str,
    pub spinner_frames: &'static [&'static str],
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_FRAMES_ASCII: &[&str] = &["|", "/", "-", "\\"];

#[must_use]
pub fn glyphs(options: UiOptions) -> Glyphs {
    if options.ascii_only {
        Glyphs {
            user: ">",
            thinking: "?",
            file_created: "+",
            command: "$",
            completed: "OK",
            unknown_event: "*",
            folder_open: "v",
            folder_closed: ">",
            file_code: "c",
            file_json: "j",
            file_text: "t",
            file_image: "i",
            file_style: "s",
            file_markup: "m",
            file_other: "-",
            status_ready: "*",
            status_missing: "o",
            selected: ">",
            separator: "|",
            spinner_frames: SPINNER_FRAMES_ASCII,
        }
    } else {
        Glyphs {
            user: "❯",
            thinking: "◦",
            file_created: "✚",
            command: "$",
            completed: "✓",
            unknown_event: "•",
            folder_open: "▾",
            folder_closed: "▸",
            file_code: "λ",
            file_json: "{}",
            file_text: "¶",
            file_image: "▣",
            file_style: "#",
            file_markup: "<>",
            file_other: "·",
            status_ready: "●",
            status_missing: "○",
            selected: "▌",
            separator: "│",
            spinner_frames: SPINNER_FRAMES,
        }
    }
}

impl Glyphs {
    /// Icon for a non-transient agent entry. `started` renders as a spinner instead.
    #[must_use]
    pub fn event_icon(&self, kind: &EventKind) -> &'static str {
        match kind {
            EventKind::Thinking => self.thinking,
            EventKind::FileCreated => self.file_created,
            EventKind::Command => self.command,
            EventKind::Completed => self.completed,
            EventKind::Started | EventKind::Other(_) => self.unknown_event,
        }
    }

    #[must_use]
    pub fn file_icon(&self, category: FileCategory) -> &'static str {
        match category {
            FileCategory::Code => self.file_code,
            FileCategory::Json => self.file_json,
            FileCategory::Text => self.file_text,
            FileCategory::Image => self.file_image,
            FileCategory::Style => self.file_style,
            FileCategory::Markup => self.file_markup,
            FileCategory::Other => self.file_other,
        }
    }

    #[must_use]
    pub fn folder_icon(&self, expanded: bool) -> &'static str {
        if expanded {
            self.folder_open
        } else {
            self.folder_closed
        }
    }
}

#[must_use]
pub fn spinner_frame(tick: usize, options: UiOptions) -> &'static str {
    let frames = glyphs(options).spinner_frames;
    frames[tick % frames.len()]
}

/// Pre-defined styles for common UI elements.
pub mod styles {
    use super::{Modifier, Palette, Style};

    #[must_use]
    pub fn user_name(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.green)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_normal(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.bg_dark)
            .bg(palette.text_secondary)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_insert(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.bg_dark)
            .bg(palette.green)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_command(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.bg_dark)
            .bg(palette.yellow)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint(palette: &Palette) -> Style {
        Style::default().fg(palette.text_muted)
    }

    #[must_use]
    pub fn key_highlight(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.peach)
            .add_modifier(Modifier::BOLD)
    }

    /// Border for a pane, brighter when it has focus.
    #[must_use]
    pub fn pane_border(palette: &Palette, focused: bool) -> Style {
        if focused {
            Style::default().fg(palette.primary)
        } else {
            Style::default().fg(palette.bg_border)
        }
    }

    #[must_use]
    pub fn cursor_row(palette: &Palette) -> Style {
        Style::default()
            .bg(palette.bg_highlight)
            .add_modifier(Modifier::BOLD)
    }
}
