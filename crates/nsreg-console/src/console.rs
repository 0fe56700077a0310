//! Terminal UI for the registry console.
//!
//! Two screens: the instance list with a command line, and the explorer
//! with the namespace tree on the left and the value editor on the right.
//!
//! Launch with `nsreg` (no subcommand).

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nsreg_explorer::{EditorStatus, Route, RowKind, TreeRow};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

use crate::app::{App, ExplorerView, Focus, MessageLevel, Screen};

const PLACEHOLDER: &str = "Select a key from the sidebar to view its value.";
/// Width of `"{:>4} │ "`.
const GUTTER_WIDTH: u16 = 7;

fn level_color(level: MessageLevel) -> Color {
    match level {
        MessageLevel::Info => Color::White,
        MessageLevel::Success => Color::Green,
        MessageLevel::Warning => Color::Yellow,
        MessageLevel::Error => Color::Red,
        MessageLevel::Hint => Color::DarkGray,
    }
}

/// Render whichever screen is active.
pub fn render(frame: &mut Frame, app: &App) {
    match app.screen() {
        Screen::Home => render_home(frame, app),
        Screen::Explore(view) => render_explorer(frame, app, view),
    }
}

// ── Home ──

fn render_home(frame: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(6),    // Instances
            Constraint::Length(8), // Console output
            Constraint::Length(5), // Input
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled("  Instances: ", Style::default().fg(Color::Gray)),
        Span::styled(app.store().len().to_string(), Style::default().fg(Color::Green)),
        Span::styled("  |  Route: ", Style::default().fg(Color::Gray)),
        Span::styled(app.route().to_string(), Style::default().fg(Color::LightCyan)),
    ]))
    .block(
        Block::default()
            .title(" Namespaced Registry Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(title, outer[0]);

    render_instances(frame, outer[1], app);
    render_console_output(frame, outer[2], app);
    render_input(frame, outer[3], app);
}

fn render_instances(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(format!(" Instances ({}) ", app.store().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    if app.store().is_empty() {
        let text = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No instances yet. Register one with /add <name> <url>.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(block);
        frame.render_widget(text, area);
        return;
    }

    let rows: Vec<Row> = app
        .store()
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            let style = if i == app.selected {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new(vec![
                Cell::from(format!("  {}", i + 1)),
                Cell::from(instance.name.clone()),
                Cell::from(instance.url.clone()),
                Cell::from(Span::styled(
                    instance.id.to_string(),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Percentage(25),
            Constraint::Percentage(40),
            Constraint::Percentage(35),
        ],
    )
    .block(block)
    .header(
        Row::new(vec!["  #", "Name", "URL", "ID"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(table, area);
}

fn render_console_output(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Console Output ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let inner_height = area.height.saturating_sub(2) as usize;
    let messages = app.messages();
    let start = messages.len().saturating_sub(inner_height);

    let lines: Vec<Line> = messages[start..]
        .iter()
        .map(|msg| {
            Line::from(vec![
                Span::styled(
                    format!("  [{}] ", msg.at.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(msg.text.as_str(), Style::default().fg(level_color(msg.level))),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Command Input (Enter = open selected, /help = commands, /quit = exit) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_display = if app.input.is_empty() {
        Line::from(vec![
            Span::styled("  > ", Style::default().fg(Color::Green)),
            Span::styled("Type a /command...", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(vec![
            Span::styled("  > ", Style::default().fg(Color::Green)),
            Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
        ])
    };
    let hint_line = Line::from(Span::styled(
        "  Ctrl+C or /quit to exit  |  Up/Down to pick an instance  |  Enter to submit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(
        Paragraph::new(vec![Line::from(""), input_display, hint_line]).block(block),
        area,
    );

    // Border plus the "  > " prompt.
    let cursor_x = area.x + 5 + app.cursor_pos as u16;
    frame.set_cursor_position((cursor_x, area.y + 2));
}

// ── Explorer ──

fn render_explorer(frame: &mut Frame, app: &App, view: &ExplorerView) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(8),    // Tree + editor
            Constraint::Length(4), // Footer
        ])
        .split(frame.area());

    let instance = view.session.instance();
    let title = Paragraph::new(Line::from(vec![
        Span::styled("  Instance: ", Style::default().fg(Color::Gray)),
        Span::styled(instance.name.as_str(), Style::default().fg(Color::White)),
        Span::styled("  |  URL: ", Style::default().fg(Color::Gray)),
        Span::styled(instance.url.as_str(), Style::default().fg(Color::Cyan)),
        Span::styled("  |  Route: ", Style::default().fg(Color::Gray)),
        Span::styled(app.route().to_string(), Style::default().fg(Color::LightCyan)),
    ]))
    .block(
        Block::default()
            .title(" Namespaced Registry Explorer ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(title, outer[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(outer[1]);
    render_tree(frame, columns[0], view);
    render_editor(frame, columns[1], view);

    render_footer(frame, outer[2], app);
}

fn focus_border(view: &ExplorerView, pane: Focus) -> Style {
    if view.focus == pane {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn tree_line(row: &TreeRow, highlighted: bool) -> Line<'_> {
    let indent = "  ".repeat(row.depth + 1);
    let (marker, style) = match row.kind {
        RowKind::Group { expanded, .. } => (
            if expanded { "▾ " } else { "▸ " },
            Style::default().fg(Color::LightBlue),
        ),
        RowKind::Value { selected: true } => (
            "  ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        RowKind::Value { selected: false } => ("  ", Style::default().fg(Color::White)),
        RowKind::Error => ("! ", Style::default().fg(Color::Red)),
    };
    let style = if highlighted {
        style.add_modifier(Modifier::REVERSED)
    } else {
        style
    };

    let mut spans = vec![
        Span::raw(indent),
        Span::styled(marker, style),
        Span::styled(row.label.as_str(), style),
    ];
    if let RowKind::Group { loading: true, .. } = row.kind {
        spans.push(Span::styled(" ...", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn render_tree(frame: &mut Frame, area: Rect, view: &ExplorerView) {
    let block = Block::default()
        .title(" Namespaces ")
        .borders(Borders::ALL)
        .border_style(focus_border(view, Focus::Tree));

    let tree = view.session.tree();
    let message = match (tree.projects(), tree.projects_error()) {
        (_, Some(error)) => Some(Span::styled(
            format!("  Error: {error}"),
            Style::default().fg(Color::Red),
        )),
        (None, None) => Some(Span::styled(
            "  Loading projects...",
            Style::default().fg(Color::DarkGray),
        )),
        (Some([]), None) => Some(Span::styled(
            "  No projects.",
            Style::default().fg(Color::DarkGray),
        )),
        _ => None,
    };
    if let Some(message) = message {
        frame.render_widget(Paragraph::new(Line::from(message)).block(block), area);
        return;
    }

    let rows = tree.rows();
    let visible_height = area.height.saturating_sub(2) as usize;
    let scroll = (view.cursor + 1).saturating_sub(visible_height);
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible_height)
        .map(|(i, row)| tree_line(row, view.focus == Focus::Tree && i == view.cursor))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_editor(frame: &mut Frame, area: Rect, view: &ExplorerView) {
    let editor = view.session.editor();
    let Some(key) = editor.key() else {
        let block = Block::default()
            .title(" Value ")
            .borders(Borders::ALL)
            .border_style(focus_border(view, Focus::Editor));
        let text = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {PLACEHOLDER}"),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(block);
        frame.render_widget(text, area);
        return;
    };

    let dirty = if editor.is_dirty() { " (modified)" } else { "" };
    let block = Block::default()
        .title(format!(" {key}{dirty} "))
        .borders(Borders::ALL)
        .border_style(focus_border(view, Focus::Editor));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Text
            Constraint::Length(1), // Error
            Constraint::Length(1), // Buttons
        ])
        .split(inner);

    let buffer = editor.buffer();
    let (row, col) = buffer.cursor();
    let height = parts[0].height as usize;
    let scroll = (row + 1).saturating_sub(height);
    let lines: Vec<Line> = buffer
        .lines()
        .iter()
        .enumerate()
        .skip(scroll)
        .take(height)
        .map(|(n, text)| {
            Line::from(vec![
                Span::styled(format!("{:>4} │ ", n + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(text.as_str(), Style::default().fg(Color::White)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), parts[0]);

    if let Some(error) = editor.error() {
        frame.render_widget(
            Paragraph::new(Span::styled(format!(" {error}"), Style::default().fg(Color::Red))),
            parts[1],
        );
    } else if editor.status() == EditorStatus::Loading && !editor.is_dirty() {
        frame.render_widget(
            Paragraph::new(Span::styled(" Loading...", Style::default().fg(Color::DarkGray))),
            parts[1],
        );
    }

    let dim = Style::default().fg(Color::DarkGray);
    let revert_style = if editor.can_revert() {
        Style::default().fg(Color::White)
    } else {
        dim
    };
    let save_style = match editor.status() {
        EditorStatus::Success => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        _ if editor.can_save() => Style::default().fg(Color::Black).bg(Color::Green),
        _ => dim,
    };
    let buttons = Line::from(vec![
        Span::styled(" [ Revert ^R ] ", revert_style),
        Span::raw(" "),
        Span::styled(format!(" [ {} ^S ] ", editor.save_label()), save_style),
    ]);
    frame.render_widget(Paragraph::new(buttons), parts[2]);

    if view.focus == Focus::Editor && row >= scroll {
        let x = parts[0].x + GUTTER_WIDTH + col as u16;
        let y = parts[0].y + (row - scroll) as u16;
        if x < parts[0].right() && y < parts[0].bottom() {
            frame.set_cursor_position((x, y));
        }
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let last = app.messages().last().map(|msg| {
        Line::from(vec![
            Span::styled(
                format!("  [{}] ", msg.at.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(msg.text.as_str(), Style::default().fg(level_color(msg.level))),
        ])
    });
    let hints = Line::from(Span::styled(
        "  Tab focus  |  Enter/Space open  |  Left collapse  |  \
         Ctrl+S save  |  Ctrl+R revert  |  Esc back",
        Style::default().fg(Color::DarkGray),
    ));

    let lines = vec![last.unwrap_or_default(), hints];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ── Input ──

fn byte_index(s: &str, char_pos: usize) -> usize {
    s.char_indices().nth(char_pos).map_or(s.len(), |(i, _)| i)
}

/// Apply one key press to the console.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match app.screen() {
        Screen::Home => handle_home_key(app, key),
        Screen::Explore(view) => {
            let focus = view.focus;
            match (key.code, ctrl) {
                (KeyCode::Esc, _) if focus == Focus::Editor => app.toggle_focus(),
                (KeyCode::Esc, _) => app.navigate(Route::Home),
                (KeyCode::Tab, _) | (KeyCode::BackTab, _) => app.toggle_focus(),
                (KeyCode::Char('s'), true) => app.save(),
                (KeyCode::Char('r'), true) => app.revert(),
                _ if focus == Focus::Tree => handle_tree_key(app, key.code),
                _ => handle_editor_key(app, key.code),
            }
        }
    }
}

fn handle_home_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.process_input(),
        KeyCode::Up => app.select_instance(-1),
        KeyCode::Down => app.select_instance(1),
        KeyCode::Char(c) => {
            let at = byte_index(&app.input, app.cursor_pos);
            app.input.insert(at, c);
            app.cursor_pos += 1;
        }
        KeyCode::Backspace => {
            if app.cursor_pos > 0 {
                app.cursor_pos -= 1;
                let at = byte_index(&app.input, app.cursor_pos);
                app.input.remove(at);
            }
        }
        KeyCode::Delete => {
            if app.cursor_pos < app.input.chars().count() {
                let at = byte_index(&app.input, app.cursor_pos);
                app.input.remove(at);
            }
        }
        KeyCode::Left => app.cursor_pos = app.cursor_pos.saturating_sub(1),
        KeyCode::Right => {
            if app.cursor_pos < app.input.chars().count() {
                app.cursor_pos += 1;
            }
        }
        KeyCode::Home => app.cursor_pos = 0,
        KeyCode::End => app.cursor_pos = app.input.chars().count(),
        _ => {}
    }
}

fn handle_tree_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up => app.tree_move(-1),
        KeyCode::Down => app.tree_move(1),
        KeyCode::PageUp => app.tree_move(-10),
        KeyCode::PageDown => app.tree_move(10),
        KeyCode::Enter | KeyCode::Char(' ') => app.tree_activate(),
        KeyCode::Left => app.tree_collapse(),
        KeyCode::Right => app.tree_expand(),
        _ => {}
    }
}

fn handle_editor_key(app: &mut App, code: KeyCode) {
    let Some(view) = app.explorer_mut() else {
        return;
    };
    if view.session.selected_key().is_none() {
        view.focus = Focus::Tree;
        return;
    }
    let buffer = view.session.editor_mut().buffer_mut();
    match code {
        KeyCode::Char(c) => buffer.insert_char(c),
        KeyCode::Enter => buffer.insert_newline(),
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Delete => buffer.delete(),
        KeyCode::Left => buffer.move_left(),
        KeyCode::Right => buffer.move_right(),
        KeyCode::Up => buffer.move_up(),
        KeyCode::Down => buffer.move_down(),
        KeyCode::Home => buffer.home(),
        KeyCode::End => buffer.end(),
        _ => {}
    }
}

// ── Terminal ──

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive console until the operator quits.
pub async fn run_console(mut app: App, tick_rate: Duration) -> anyhow::Result<()> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!(
            "The console requires a terminal (TTY). Use a subcommand for scripted access."
        ));
    }

    // Restore the terminal if anything panics.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app, tick_rate).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> anyhow::Result<()> {
    while !app.should_quit() {
        let now = Instant::now();
        app.drain_responses(now);
        app.tick(now);

        terminal.draw(|frame| render(frame, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
        tokio::task::yield_now().await;
    }
    tracing::info!("Console closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use nsreg_explorer::InstanceStore;
    use ratatui::backend::TestBackend;

    use super::*;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn draw(app: &App) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
    }

    fn screen_text(app: &App) -> String {
        draw(app)
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn command_line_editing_handles_multibyte_chars() {
        let mut app = App::new(InstanceStore::new(), None);
        type_str(&mut app, "añb");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "ab");
        assert_eq!(app.cursor_pos, 1);
        press(&mut app, KeyCode::End);
        assert_eq!(app.cursor_pos, 2);
    }

    #[tokio::test]
    async fn typed_add_command_registers_instance() {
        let mut app = App::new(InstanceStore::new(), None);
        type_str(&mut app, "/add local http://localhost:19950");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store().len(), 1);
        assert!(app.input.is_empty());
        assert!(screen_text(&app).contains("http://localhost:19950"));
    }

    #[tokio::test]
    async fn explorer_shows_placeholder_and_escape_returns_home() {
        let mut store = InstanceStore::new();
        store.add("broken", "not a url");
        let mut app = App::new(store, None);
        press(&mut app, KeyCode::Enter);
        app.drain_responses(Instant::now());

        let text = screen_text(&app);
        assert!(text.contains(PLACEHOLDER));
        assert!(text.contains("Invalid registry URL"));

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.screen(), Screen::Home));
    }

    #[test]
    fn input_cursor_sits_after_typed_text() {
        let mut app = App::new(InstanceStore::new(), None);
        type_str(&mut app, "/ab");
        let mut terminal = draw(&app);
        let cursor = terminal.get_cursor_position().unwrap();

        let before = terminal.backend().buffer().cell((cursor.x - 1, cursor.y)).unwrap();
        assert_eq!(before.symbol(), "b");
        let at = terminal.backend().buffer().cell((cursor.x, cursor.y)).unwrap();
        assert_eq!(at.symbol(), " ");
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = App::new(InstanceStore::new(), None);
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }
}
