use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{accuracy_bar, format_date};
use crate::truncate;
use crate::models::{StudyMode, StudySet};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(set) = &app.selected_set else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Study Set ");
        let paragraph = Paragraph::new("No study set selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header info
            Constraint::Length(7), // Per-mode progress
            Constraint::Min(0),    // Items
        ])
        .split(area);

    draw_header(f, set, chunks[0]);
    draw_progress(f, app, chunks[1]);
    draw_items(f, set, chunks[2]);
}

fn draw_header(f: &mut Frame, set: &StudySet, area: Rect) {
    let description = if set.description.is_empty() {
        "No description"
    } else {
        set.description.as_str()
    };
    let source = match &set.source_name {
        Some(name) => format!("{} ({})", set.source_type.as_str(), name),
        None => set.source_type.as_str().to_string(),
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Description: ", Style::default().fg(Color::Gray)),
            Span::styled(description, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Source: ", Style::default().fg(Color::Gray)),
            Span::styled(source, Style::default().fg(Color::Cyan)),
            Span::styled("  Updated: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format_date(set.updated_at),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", set.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_progress(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = StudyMode::ALL
        .iter()
        .enumerate()
        .map(|(i, mode)| {
            let record = app.selected_progress.iter().find(|p| p.mode == *mode);
            let mut spans = vec![
                Span::styled(format!("{} ", i + 1), Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("{:<12}", mode.label()),
                    Style::default().fg(Color::White),
                ),
            ];
            match record {
                Some(p) => spans.extend(vec![
                    Span::styled(accuracy_bar(p.accuracy()), Style::default().fg(Color::Green)),
                    Span::styled(
                        format!(" {:>3.0}%", p.accuracy()),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        format!(
                            "  {} studied, {} sessions",
                            p.items_studied, p.completed_sessions
                        ),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                None => spans.push(Span::styled(
                    "not practiced yet",
                    Style::default().fg(Color::DarkGray),
                )),
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Progress ")
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_items(f: &mut Frame, set: &StudySet, area: Rect) {
    let items: Vec<ListItem> = set
        .items
        .iter()
        .map(|item| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<28}", truncate(&item.term, 26)),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    truncate(&item.definition, 60),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Items ({}) ", set.items.len()))
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
