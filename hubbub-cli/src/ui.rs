//! Chat screen rendering.

use std::collections::VecDeque;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

const LOG_PANE_HEIGHT: u16 = 8;
const ROSTER_PANE_WIDTH: u16 = 24;

/// One rendered line of the message pane. `author` is `None` for
/// channel notices and local feedback.
pub struct ChatLine {
    pub author: Option<(String, (u8, u8, u8))>,
    pub text: String,
}

/// Everything one frame needs, collected by the runner.
pub struct View<'a> {
    pub lines: &'a VecDeque<ChatLine>,
    pub roster: Vec<(String, (u8, u8, u8))>,
    pub input: &'a str,
    pub status: String,
    /// `Some` when the log pane is open.
    pub log_lines: Option<Vec<String>>,
    pub scroll: usize,
}

pub fn draw(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, view: &View) {
    let _ = terminal.draw(|f| {
        let mut constraints = vec![Constraint::Min(4)];
        if view.log_lines.is_some() {
            constraints.push(Constraint::Length(LOG_PANE_HEIGHT));
        }
        constraints.push(Constraint::Length(3));
        constraints.push(Constraint::Length(1));

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.size());
        let (log_area, input_area, status_area) = if view.log_lines.is_some() {
            (Some(rows[1]), rows[2], rows[3])
        } else {
            (None, rows[1], rows[2])
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(ROSTER_PANE_WIDTH)])
            .split(rows[0]);

        // Bottom-anchored message pane; `scroll` lifts the window up.
        let height = columns[0].height.saturating_sub(2) as usize;
        let rendered: Vec<Line> = view.lines.iter().map(render_line).collect();
        let offset = rendered
            .len()
            .saturating_sub(height)
            .saturating_sub(view.scroll);
        let messages = Paragraph::new(rendered)
            .block(Block::default().borders(Borders::ALL).title("Messages"))
            .scroll((offset as u16, 0));
        f.render_widget(messages, columns[0]);

        let names: Vec<Line> = view
            .roster
            .iter()
            .map(|(name, (r, g, b))| {
                Line::from(Span::styled(
                    name.as_str(),
                    Style::default().fg(Color::Rgb(*r, *g, *b)),
                ))
            })
            .collect();
        let roster = Paragraph::new(names).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Users ({})", view.roster.len())),
        );
        f.render_widget(roster, columns[1]);

        if let (Some(area), Some(lines)) = (log_area, view.log_lines.as_ref()) {
            let visible = area.height.saturating_sub(2) as usize;
            let start = lines.len().saturating_sub(visible);
            let text = if lines.is_empty() {
                "No logs yet.".to_string()
            } else {
                lines[start..].join("\n")
            };
            let logs = Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title("Logs"));
            f.render_widget(logs, area);
        }

        let input = Paragraph::new(view.input).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Input (/help for commands)"),
        );
        f.render_widget(input, input_area);
        if input_area.height > 2 {
            let cursor_x = input_area
                .x
                .saturating_add(1 + view.input.chars().count() as u16)
                .min(input_area.x.saturating_add(input_area.width.saturating_sub(2)));
            f.set_cursor(cursor_x, input_area.y + 1);
        }

        let status = Paragraph::new(view.status.as_str()).style(Style::default().fg(Color::Blue));
        f.render_widget(status, status_area);
    });
}

fn render_line(line: &ChatLine) -> Line<'_> {
    match &line.author {
        Some((name, (r, g, b))) => Line::from(vec![
            Span::styled(
                name.as_str(),
                Style::default()
                    .fg(Color::Rgb(*r, *g, *b))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(": "),
            Span::raw(line.text.as_str()),
        ]),
        None => Line::from(Span::styled(
            line.text.as_str(),
            Style::default().fg(Color::DarkGray),
        )),
    }
}
