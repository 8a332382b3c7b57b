mod export;
mod help;
mod state;

use crate::catalog::CatalogClient;
use crate::context::AppContext;
use crate::orchestrator::{self, AppEvent, UiCommand};
use crate::render;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{copy_to_clipboard, export_ledger_csv, export_ledger_json};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{
    UiState, TAB_CATALOG, TAB_HELP, TAB_LEDGER, TAB_RUNNING, TAB_SOURCES, TAB_TITLES, TAB_TOKEN,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(mut ctx: AppContext, catalog: CatalogClient) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // The terminal loop lives on its own thread; the controller stays on the runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(&mut ctx, &catalog, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState {
        info: "Loading…".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => state.next_tab(),
                    (_, KeyCode::BackTab) => state.prev_tab(),
                    (_, KeyCode::Char('?')) => state.tab = TAB_HELP,
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
                    (_, KeyCode::Char('r')) => {
                        state.info = "Refreshing…".into();
                        let _ = cmd_tx.send(UiCommand::Refresh);
                    }
                    (_, KeyCode::Enter) | (_, KeyCode::Char('g')) if state.tab == TAB_CATALOG => {
                        let gpu = k.code == KeyCode::Char('g');
                        match state.selected_image() {
                            Some(img) => {
                                let _ = cmd_tx.send(UiCommand::Run {
                                    image: img.image_name.clone(),
                                    name: img.remote_name.clone(),
                                    description: img.remote_description.clone(),
                                    gpu,
                                });
                            }
                            None => state.info = "No catalog image selected".into(),
                        }
                    }
                    (_, KeyCode::Char('s')) if state.tab == TAB_RUNNING => {
                        let target = state
                            .selected_running()
                            .map(|w| (w.short_id().to_string(), w.container_id.clone()));
                        match target {
                            Some((short, id)) => {
                                state.info = format!("Stopping {short}…");
                                let _ = cmd_tx.send(UiCommand::Stop(id));
                            }
                            None => state.info = "No running workload selected".into(),
                        }
                    }
                    (_, KeyCode::Char('e')) if state.tab == TAB_LEDGER => {
                        state.info = match export_ledger_json(&state) {
                            Ok(p) => {
                                state.last_exported_path = Some(p.to_string_lossy().to_string());
                                format!("Exported JSON: {} (press 'y' to copy path)", p.display())
                            }
                            Err(e) => format!("JSON export failed: {e:#}"),
                        };
                    }
                    (_, KeyCode::Char('c')) if state.tab == TAB_LEDGER => {
                        state.info = match export_ledger_csv(&state) {
                            Ok(p) => {
                                state.last_exported_path = Some(p.to_string_lossy().to_string());
                                format!("Exported CSV: {} (press 'y' to copy path)", p.display())
                            }
                            Err(e) => format!("CSV export failed: {e:#}"),
                        };
                    }
                    (_, KeyCode::Char('n')) if state.tab == TAB_TOKEN => {
                        let _ = cmd_tx.send(UiCommand::GenerateToken);
                    }
                    (_, KeyCode::Char('y')) => {
                        let target = match state.tab {
                            TAB_TOKEN => state.token.clone(),
                            TAB_LEDGER => state.last_exported_path.clone(),
                            _ => None,
                        };
                        state.info = match target {
                            Some(text) => match copy_to_clipboard(&text) {
                                Ok(()) => "✓ Copied to clipboard".into(),
                                Err(e) => format!("Clipboard copy failed: {e:#}"),
                            },
                            None => "Nothing to copy here".into(),
                        };
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(TAB_TITLES.iter().map(|t| Line::from(*t)).collect::<Vec<_>>())
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("runes"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_RUNNING => draw_running(chunks[1], f, state),
        TAB_LEDGER => draw_list(
            chunks[1],
            f,
            "Ledger  (e: export JSON, c: export CSV, y: copy path)",
            state.ledger.iter().map(render::workload_line).collect(),
            state.selected[TAB_LEDGER],
        ),
        TAB_CATALOG => draw_list(
            chunks[1],
            f,
            "Catalog  (enter: run on CPU, g: run with GPU)",
            state.images.iter().map(render::catalog_image_line).collect(),
            state.selected[TAB_CATALOG],
        ),
        TAB_SOURCES => draw_list(
            chunks[1],
            f,
            "Sources",
            state.sources.iter().map(render::catalog_source_line).collect(),
            state.selected[TAB_SOURCES],
        ),
        TAB_TOKEN => draw_token(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }

    let status = Paragraph::new(Line::from(vec![
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL))
    .wrap(Wrap { trim: true });
    f.render_widget(status, chunks[2]);
}

fn draw_running(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    match state.running.as_ref() {
        Some(rows) => draw_list(
            area,
            f,
            "Running  (s: stop selected)",
            rows.iter().map(render::workload_line).collect(),
            state.selected[TAB_RUNNING],
        ),
        None => {
            let p = Paragraph::new("Container runtime not reachable; press r to retry.")
                .block(Block::default().borders(Borders::ALL).title("Running"));
            f.render_widget(p, area);
        }
    }
}

/// Bordered list with the selected row highlighted and kept in view.
fn draw_list(area: Rect, f: &mut ratatui::Frame, title: &str, rows: Vec<String>, selected: usize) {
    let visible = (area.height as usize).saturating_sub(2).max(1);
    let offset = selected.saturating_sub(visible - 1);

    let lines: Vec<Line> = if rows.is_empty() {
        vec![Line::from(Span::styled(
            "(empty)",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        rows.into_iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, text)| {
                if i == selected {
                    Line::from(Span::styled(
                        text,
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(text)
                }
            })
            .collect()
    };

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_token(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let token = state.token.as_deref().unwrap_or("-");
    let p = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Access token: ", Style::default().fg(Color::Gray)),
            Span::styled(token, Style::default().fg(Color::Cyan)),
        ]),
        Line::from(""),
        Line::from("Injected into every workload started from this machine."),
        Line::from(vec![
            Span::styled("n", Style::default().fg(Color::Magenta)),
            Span::raw(": generate new   "),
            Span::styled("y", Style::default().fg(Color::Magenta)),
            Span::raw(": copy to clipboard"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Token"));
    f.render_widget(p, area);
}
