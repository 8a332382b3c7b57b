use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("tab", 9, "Next tab (shift-tab: previous)"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        key_line("r", 11, "Refresh (reconcile and reload catalog)"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Running tab:"),
        key_line("s", 11, "Stop selected workload"),
        Line::from(""),
        Line::from("Ledger tab:"),
        key_line("e", 11, "Export ledger as JSON"),
        key_line("c", 11, "Export ledger as CSV"),
        key_line("y", 11, "Copy exported path to clipboard"),
        Line::from(""),
        Line::from("Catalog tab:"),
        key_line("enter", 7, "Run selected image on CPU"),
        key_line("g", 11, "Run selected image with GPU"),
        Line::from(""),
        Line::from("Token tab:"),
        key_line("n", 11, "Generate a new token"),
        key_line("y", 11, "Copy token to clipboard"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
