//! TUI rendering for Kiln using ratatui.
//!
//! The screen is a read-only projection of [`App`]: the conversation on the
//! left, the generated project's explorer and code viewer on the right, and
//! an input line plus status bar at the bottom. Every string that came over
//! the network passes through [`strip_terminal_controls`] before it reaches
//! the terminal.

mod input;
mod theme;

pub use input::{InputPump, handle_events};
pub use theme::{Glyphs, Palette, glyphs, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use kiln_engine::{
    App, BuildStatus, ConversationEntry, EventKind, Focus, InputMode, RowKind, Speaker,
    StatusKind, command_specs, strip_terminal_controls,
};

/// Main draw function. Reports the scrollable range of each pane back to
/// `app` so stored offsets never run past the content.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let options = app.ui_options();
    let palette = palette(options);
    let glyphs = glyphs(options);
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Panes
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(22),
            Constraint::Percentage(43),
        ])
        .split(rows[0]);

    let conversation_max = draw_conversation(frame, app, panes[0], &palette, &glyphs);
    draw_explorer(frame, app, panes[1], &palette, &glyphs);
    let code_max = draw_code(frame, app, panes[2], &palette, &glyphs);
    app.update_conversation_scroll_max(usize::from(conversation_max));
    app.update_code_scroll_max(code_max);
    draw_input(frame, app, rows[1], &palette);
    draw_status_bar(frame, app, rows[2], &palette, &glyphs);

    if app.input_mode() == InputMode::Command {
        draw_command_palette(frame, app, &palette);
    }
}

fn pane_block<'a>(title: String, focused: bool, palette: &Palette) -> Block<'a> {
    let title_style = if focused {
        Style::default()
            .fg(palette.text_primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text_secondary)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::pane_border(palette, focused))
        .style(Style::default().bg(palette.bg_panel))
        .title(Line::from(Span::styled(title, title_style)))
}

fn entry_lines(
    entry: &ConversationEntry,
    tick: usize,
    app: &App,
    palette: &Palette,
    glyphs: &Glyphs,
) -> Vec<Line<'static>> {
    let text = strip_terminal_controls(entry.text()).into_owned();

    match entry.speaker() {
        Speaker::User => {
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("{} ", glyphs.user), styles::user_name(palette)),
                Span::styled("You", styles::user_name(palette)),
            ])];
            lines.extend(text.lines().map(|line| {
                Line::from(Span::styled(
                    format!("  {line}"),
                    Style::default().fg(palette.text_primary),
                ))
            }));
            lines
        }
        Speaker::Agent(kind) => {
            let color = palette.event_color(kind);
            let line = match kind {
                EventKind::Started => Line::from(vec![
                    Span::styled(
                        format!("{} ", spinner_frame(tick, app.ui_options())),
                        Style::default().fg(color),
                    ),
                    Span::styled(
                        "Creating project...",
                        Style::default().fg(color).add_modifier(Modifier::ITALIC),
                    ),
                ]),
                EventKind::Thinking => Line::from(vec![
                    Span::styled(format!("{} ", glyphs.thinking), Style::default().fg(color)),
                    Span::styled(
                        text,
                        Style::default().fg(color).add_modifier(Modifier::ITALIC),
                    ),
                ]),
                EventKind::FileCreated => Line::from(vec![
                    Span::styled(format!("{} ", glyphs.file_created), Style::default().fg(color)),
                    Span::styled("Created ", Style::default().fg(palette.text_secondary)),
                    Span::styled(text, Style::default().fg(color)),
                ]),
                EventKind::Command => Line::from(vec![
                    Span::styled(format!("{} ", glyphs.command), Style::default().fg(color)),
                    Span::styled(
                        text,
                        Style::default().fg(palette.text_primary).bg(palette.bg_highlight),
                    ),
                ]),
                EventKind::Completed => Line::from(vec![
                    Span::styled(format!("{} ", glyphs.completed), Style::default().fg(color)),
                    Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                ]),
                EventKind::Other(raw) => Line::from(vec![
                    Span::styled(
                        format!("{} ", glyphs.event_icon(kind)),
                        Style::default().fg(color),
                    ),
                    Span::styled(
                        format!("[{}] ", strip_terminal_controls(raw)),
                        Style::default().fg(palette.text_muted),
                    ),
                    Span::styled(text, Style::default().fg(color)),
                ]),
            };
            vec![line]
        }
    }
}

fn draw_conversation(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) -> u16 {
    let conversation = app.conversation();
    let tick = app.tick_count();

    let mut lines: Vec<Line> = Vec::new();
    let mut previous_user = false;
    for (index, entry) in conversation.iter().enumerate() {
        let is_user = matches!(entry.speaker(), Speaker::User);
        // Separate turns, not every agent line.
        if index > 0 && (is_user || previous_user) {
            lines.push(Line::from(""));
        }
        previous_user = is_user;
        lines.extend(entry_lines(entry, tick, app, palette, glyphs));
    }

    let block = pane_block(
        format!(" Conversation ({}) ", conversation.len()),
        app.focus() == Focus::Conversation,
        palette,
    );
    let inner = block.inner(area);

    let total = wrapped_line_count(&lines, inner.width);
    let visible = inner.height;
    let max_scroll = total.saturating_sub(visible);
    let from_bottom = u16::try_from(app.conversation_scroll())
        .unwrap_or(u16::MAX)
        .min(max_scroll);
    let offset = max_scroll - from_bottom;

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
    max_scroll
}

fn draw_explorer(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let workspace = app.workspace();
    let tree = workspace.tree();
    let focused = app.focus() == Focus::Explorer;

    let title = if tree.is_empty() {
        " Files ".to_string()
    } else {
        let counts = tree.counts();
        format!(" Files ({} files, {} folders) ", counts.files, counts.folders)
    };
    let block = pane_block(title, focused, palette);

    if tree.is_empty() {
        let message = match app.build_status() {
            BuildStatus::WaitingForStream => Line::from(Span::styled(
                "Waiting for agent...",
                Style::default().fg(palette.text_muted),
            )),
            BuildStatus::Building | BuildStatus::Ready => Line::from(vec![
                Span::styled(
                    format!("{} ", spinner_frame(app.tick_count(), app.ui_options())),
                    Style::default().fg(palette.primary),
                ),
                Span::styled(
                    "Building project...",
                    Style::default().fg(palette.text_secondary),
                ),
            ]),
        };
        frame.render_widget(Paragraph::new(message).block(block), area);
        return;
    }

    let inner = block.inner(area);
    let explorer = workspace.explorer();
    let rows = explorer.rows(tree);
    let cursor = explorer.cursor();
    let selected = workspace.selection().selected_path();

    let height = usize::from(inner.height.max(1));
    let first = cursor.saturating_sub(height - 1);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(first)
        .take(height)
        .map(|(index, row)| {
            let indent = "  ".repeat(row.depth);
            let is_selected = selected == Some(row.full_path);
            let (icon, name_style) = match row.kind {
                RowKind::Directory { expanded } => (
                    glyphs.folder_icon(expanded),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                RowKind::File(category) => (
                    glyphs.file_icon(category),
                    if is_selected {
                        Style::default()
                            .fg(palette.peach)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.text_primary)
                    },
                ),
            };
            let marker = if is_selected { glyphs.selected } else { " " };
            let line = Line::from(vec![
                Span::styled(marker.to_string(), Style::default().fg(palette.peach)),
                Span::raw(indent),
                Span::styled(format!("{icon} "), Style::default().fg(palette.text_muted)),
                Span::styled(strip_terminal_controls(row.name).into_owned(), name_style),
            ]);
            if focused && index == cursor {
                line.style(styles::cursor_row(palette))
            } else {
                line
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_code(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) -> usize {
    let workspace = app.workspace();
    let focused = app.focus() == Focus::Code;

    let title = match workspace.selection().selected_path() {
        Some(path) => format!(" {} ", strip_terminal_controls(path)),
        None => " Code ".to_string(),
    };
    let mut block = pane_block(title, focused, palette);
    if let Some(url) = workspace.preview_endpoint() {
        block = block.title_bottom(
            Line::from(vec![
                Span::styled(
                    format!(" {} preview ", glyphs.status_ready),
                    Style::default().fg(palette.success),
                ),
                Span::styled(
                    format!("{} ", strip_terminal_controls(url)),
                    Style::default().fg(palette.blue),
                ),
            ])
            .alignment(Alignment::Right),
        );
    }

    let Some(content) = workspace.selected_content() else {
        let hint = if workspace.tree().is_empty() {
            ""
        } else {
            "Select a file to view its contents"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(palette.text_muted),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return 0;
    };

    let content = strip_terminal_controls(content);
    let source: Vec<&str> = content.lines().collect();
    let gutter = source.len().max(1).to_string().len();
    let inner = block.inner(area);
    let max_scroll = source.len().saturating_sub(usize::from(inner.height));
    let offset = app.code_scroll().min(max_scroll);

    let lines: Vec<Line> = source
        .iter()
        .enumerate()
        .skip(offset)
        .take(usize::from(inner.height))
        .map(|(index, line)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>gutter$} {} ", index + 1, glyphs.separator),
                    Style::default().fg(palette.text_muted),
                ),
                Span::styled(
                    line.replace('\t', "    "),
                    Style::default().fg(palette.text_primary),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
    max_scroll
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let mode = app.input_mode();
    let options = app.ui_options();

    let (mode_label, mode_style, border_style) = match mode {
        InputMode::Normal => (
            "NORMAL",
            styles::mode_normal(palette),
            Style::default().fg(palette.text_muted),
        ),
        InputMode::Insert => (
            "INSERT",
            styles::mode_insert(palette),
            Style::default().fg(palette.green),
        ),
        InputMode::Command => (
            "COMMAND",
            styles::mode_command(palette),
            Style::default().fg(palette.yellow),
        ),
    };

    let hints = match mode {
        InputMode::Normal => vec![
            Span::styled("i", styles::key_highlight(palette)),
            Span::styled(" message  ", styles::key_hint(palette)),
            Span::styled("Tab", styles::key_highlight(palette)),
            Span::styled(" focus  ", styles::key_hint(palette)),
            Span::styled("j/k", styles::key_highlight(palette)),
            Span::styled(" move  ", styles::key_hint(palette)),
            Span::styled("/", styles::key_highlight(palette)),
            Span::styled(" command  ", styles::key_hint(palette)),
            Span::styled("q", styles::key_highlight(palette)),
            Span::styled(" quit ", styles::key_hint(palette)),
        ],
        InputMode::Insert => vec![
            Span::styled("Enter", styles::key_highlight(palette)),
            Span::styled(" send  ", styles::key_hint(palette)),
            Span::styled("Esc", styles::key_highlight(palette)),
            Span::styled(" normal ", styles::key_hint(palette)),
        ],
        InputMode::Command => vec![
            Span::styled("Enter", styles::key_highlight(palette)),
            Span::styled(" execute  ", styles::key_hint(palette)),
            Span::styled("Esc", styles::key_highlight(palette)),
            Span::styled(" cancel ", styles::key_hint(palette)),
        ],
    };

    let (prefix, buffer) = match mode {
        InputMode::Command => (" / ".to_string(), Some(app.command_line())),
        InputMode::Insert => {
            let prompt_char = if options.ascii_only { ">" } else { "❯" };
            (format!(" {prompt_char} "), Some(app.draft()))
        }
        InputMode::Normal => (String::new(), None),
    };
    let prefix_width = prefix.width() as u16;
    let content_width = usize::from(area.width.saturating_sub(2 + prefix_width).max(1));

    let mut cursor_pos = None;
    let body = match buffer {
        Some(buffer) => {
            let text = buffer.text();
            let before: String = text.chars().take(buffer.cursor()).collect();
            let cursor_display = before.width();

            // Scroll horizontally so the cursor stays in view.
            let (visible, skipped) = if cursor_display >= content_width {
                let target = cursor_display - content_width + 1;
                let mut skipped = 0;
                let mut byte_offset = text.len();
                for (idx, ch) in text.char_indices() {
                    if skipped >= target {
                        byte_offset = idx;
                        break;
                    }
                    skipped += ch.to_string().width();
                }
                (&text[byte_offset..], skipped)
            } else {
                (text, 0)
            };

            let cursor_x = area
                .x
                .saturating_add(1 + prefix_width)
                .saturating_add(cursor_display.saturating_sub(skipped) as u16);
            cursor_pos = Some((cursor_x, area.y.saturating_add(1)));

            let prefix_style = if mode == InputMode::Command {
                Style::default().fg(palette.yellow)
            } else {
                Style::default().fg(palette.primary)
            };
            Line::from(vec![
                Span::styled(prefix, prefix_style),
                Span::styled(visible.to_string(), Style::default().fg(palette.text_primary)),
            ])
        }
        None => Line::from(Span::styled(
            format!(" Prompt: {}", strip_terminal_controls(app.prompt().as_str())),
            Style::default().fg(palette.text_muted),
        )),
    };

    let input = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_top(Line::from(vec![Span::styled(
                format!(" {mode_label} "),
                mode_style,
            )]))
            .title_top(Line::from(hints).alignment(Alignment::Right)),
    );
    frame.render_widget(input, area);

    if let Some(position) = cursor_pos {
        frame.set_cursor_position(position);
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let state = app.connection_state();
    let connection = Span::styled(
        format!(" {} {} ", glyphs.status_ready, state.label()),
        Style::default().fg(palette.connection_color(state)),
    );
    let project = Span::styled(
        format!("{} {} ", glyphs.separator, app.project()),
        Style::default().fg(palette.text_secondary),
    );

    let (status_text, status_style) = if let Some(status) = app.status() {
        let (prefix, color) = match status.kind {
            StatusKind::Error => ("Error: ", palette.error),
            StatusKind::Warning => ("Warning: ", palette.warning),
            StatusKind::Success => ("", palette.success),
            StatusKind::Info => ("", palette.text_secondary),
        };
        (
            format!("{} {prefix}{}", glyphs.separator, status.text),
            Style::default().fg(color),
        )
    } else {
        let text = match app.build_status() {
            BuildStatus::WaitingForStream => {
                format!("{} {} Waiting for stream", glyphs.separator, glyphs.status_missing)
            }
            BuildStatus::Building => format!(
                "{} {} Building",
                glyphs.separator,
                spinner_frame(app.tick_count(), app.ui_options())
            ),
            BuildStatus::Ready => format!("{} {} Ready", glyphs.separator, glyphs.status_ready),
        };
        (text, Style::default().fg(palette.text_secondary))
    };

    let status = Paragraph::new(Line::from(vec![
        connection,
        project,
        Span::styled(status_text, status_style),
    ]));
    frame.render_widget(status, area);
}

fn draw_command_palette(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = frame.area();
    let specs = command_specs();

    let width = 46.min(area.width.saturating_sub(4));
    let height = (specs.len() as u16 + 4).min(area.height.saturating_sub(4));
    let palette_area = Rect {
        x: area.x + (area.width.saturating_sub(width) / 2),
        y: area.y + (area.height / 3),
        width,
        height,
    };
    frame.render_widget(Clear, palette_area);

    let filter = app
        .command_line()
        .text()
        .trim()
        .trim_start_matches('/')
        .to_ascii_lowercase();
    let filter = filter.split_whitespace().next().unwrap_or("");

    let mut lines = vec![Line::from("")];
    let matching: Vec<_> = specs
        .iter()
        .filter(|spec| filter.is_empty() || spec.palette_label.contains(filter))
        .collect();
    if matching.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No matching commands",
            Style::default().fg(palette.text_muted),
        )));
    }
    for spec in matching {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  /{}", spec.palette_label),
                Style::default().fg(palette.peach),
            ),
            Span::styled(
                format!("  {}", spec.description),
                Style::default().fg(palette.text_muted),
            ),
        ]));
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(palette.primary))
            .style(Style::default().bg(palette.bg_panel))
            .title(Line::from(vec![Span::styled(
                " Commands ",
                Style::default()
                    .fg(palette.text_primary)
                    .add_modifier(Modifier::BOLD),
            )])),
    );
    frame.render_widget(widget, palette_area);
}

fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total: u16 = 0;

    for line in lines {
        let line_width = line.width();
        let rows = if line_width == 0 {
            1
        } else {
            ((line_width - 1) / width) + 1
        };
        total = total.saturating_add(rows as u16);
    }

    total
}

#[cfg(test)]
mod tests {
    use kiln_config::KilnConfig;
    use kiln_engine::{App, AppSettings, NonEmptyString, ProjectId};
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer, text::Line};

    use super::{draw, wrapped_line_count};

    fn app(ascii_only: bool) -> App {
        let mut config = KilnConfig::default();
        config.app.ascii_only = ascii_only;
        let settings = AppSettings::from_config(&config).unwrap();
        App::new(
            settings,
            ProjectId::new("20240101000000000abc").unwrap(),
            NonEmptyString::new("build a \u{1b}[31mtodo\u{1b}[0m app").unwrap(),
        )
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn initial_screen_shows_seed_prompt_and_waiting_state() {
        let mut app = app(true);
        let screen = render(&mut app);
        assert!(screen.contains("Conversation (1)"));
        assert!(screen.contains("build a todo app"));
        assert!(!screen.contains("[31m"));
        assert!(screen.contains("Waiting for agent..."));
        assert!(screen.contains("closed"));
        assert!(screen.contains("20240101000000000abc"));
        assert!(screen.contains("NORMAL"));
    }

    #[test]
    fn user_sends_render_in_order() {
        let mut app = app(false);
        app.send_message("add dark mode".to_string());
        let screen = render(&mut app);
        assert!(screen.contains("Conversation (2)"));
        let seed = screen.find("build a todo app").unwrap();
        let sent = screen.find("add dark mode").unwrap();
        assert!(seed < sent);
    }

    #[test]
    fn command_mode_shows_palette() {
        let mut app = app(true);
        app.enter_command_mode();
        let screen = render(&mut app);
        assert!(screen.contains("COMMAND"));
        assert!(screen.contains("Commands"));
        assert!(screen.contains("/project [id]"));
    }

    #[test]
    fn status_message_replaces_build_state() {
        let mut app = app(true);
        app.set_status_error("Build failed: boom");
        let screen = render(&mut app);
        assert!(screen.contains("Error: Build failed: boom"));
    }

    #[test]
    fn overscroll_is_clamped_to_rendered_content() {
        let mut app = app(true);
        app.scroll_conversation(500);
        app.scroll_code(40);
        assert_eq!(app.conversation_scroll(), 500);

        render(&mut app);
        assert_eq!(app.conversation_scroll(), 0);
        assert_eq!(app.code_scroll(), 0);

        app.scroll_conversation(3);
        app.scroll_code(3);
        assert_eq!(app.conversation_scroll(), 0);
        assert_eq!(app.code_scroll(), 0);
    }

    #[test]
    fn wrapped_line_count_accounts_for_width() {
        let lines = vec![Line::from("abcdef"), Line::from(""), Line::from("abc")];
        assert_eq!(wrapped_line_count(&lines, 3), 4);
        assert_eq!(wrapped_line_count(&lines, 10), 3);
        assert_eq!(wrapped_line_count(&lines, 0), 10);
    }
}
