use edustats_core::{Role, ViewState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, AppState};

use super::styles;

/// Key bindings shown in the help overlay
const HELP_ENTRIES: &[(&str, &str)] = &[
    ("1 / 2 / 3", "Admin / Teacher / Student statistics"),
    ("Tab", "Next dashboard"),
    ("r", "Refresh current dashboard"),
    ("R", "Refresh all dashboards"),
    ("?", "Toggle this help"),
    ("q / Esc", "Quit"),
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(2), // Role tabs
            Constraint::Min(5),    // Statistics
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_statistics(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  Edustats";
    let help_hint = "[?] Help";

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 2)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, role) in Role::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(
            format!("[{}] {}", i + 1, role.title()),
            styles::tab_style(*role == app.role()),
        ));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_statistics(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::muted_style())
        .title(format!(" {} statistics ", app.role()));

    let rows = app.current_view().map(|v| v.rows()).unwrap_or_default();
    if rows.is_empty() {
        let loading = app.current_view().map_or(true, |v| v.is_loading());
        let message = if loading {
            "Loading statistics..."
        } else {
            "No statistics available yet. Press [r] to retry."
        };
        let paragraph = Paragraph::new(Span::styled(message, styles::muted_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let table_rows = rows.into_iter().map(|row| {
        Row::new(vec![
            Cell::from(row.label),
            Cell::from(row.value).style(styles::value_style()),
        ])
    });

    let table = Table::new(
        table_rows,
        [Constraint::Percentage(60), Constraint::Percentage(40)],
    )
    .header(Row::new(vec!["Statistic", "Value"]).style(styles::header_style()))
    .column_spacing(2)
    .block(block);

    frame.render_widget(table, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(format!(" {} ", app.role()))];

    if let Some(view) = app.current_view() {
        let state_style = match view.state() {
            ViewState::Updated => styles::success_style(),
            ViewState::Stale => styles::highlight_style(),
            _ => styles::muted_style(),
        };
        spans.push(Span::styled(format!("[{}]", view.state().label()), state_style));

        if let Some(age) = view.age_display() {
            spans.push(Span::raw(format!("  updated {}", age)));
        }
        if app.is_current_stale() {
            spans.push(Span::styled("  (out of date)", styles::highlight_style()));
        }
    }

    if let Some(ref message) = app.status_message {
        spans.push(Span::styled(format!("  {}", message), styles::muted_style()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 50, frame.area());

    let lines: Vec<Line> = HELP_ENTRIES
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!(" {:<12}", key), styles::help_key_style()),
                Span::styled(*desc, styles::help_desc_style()),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::title_style())
        .title(" Help ");

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Rectangle centered in `area`, sized as a percentage of it
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
