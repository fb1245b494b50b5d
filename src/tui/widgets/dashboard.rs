use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{accuracy_bar, format_date};
use crate::truncate;
use crate::tui::App;

const RECENT_SETS: usize = 5;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Stats + per-mode row
            Constraint::Min(0),    // Recent sets
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_modes(f, app, top_chunks[1]);
    draw_recent_sets(f, app, chunks[1]);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let sessions: u32 = stats.by_mode.iter().map(|(_, t)| t.completed_sessions).sum();
    let correct: u32 = stats.by_mode.iter().map(|(_, t)| t.correct_answers).sum();
    let incorrect: u32 = stats.by_mode.iter().map(|(_, t)| t.incorrect_answers).sum();
    let accuracy = if correct + incorrect == 0 {
        0.0
    } else {
        f64::from(correct) * 100.0 / f64::from(correct + incorrect)
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Study sets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_sets),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Items: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_items),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Sessions completed: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{}", sessions), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Answers: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{}", correct), Style::default().fg(Color::Green)),
            Span::raw(" / "),
            Span::styled(format!("{}", incorrect), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Accuracy: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.0}%", accuracy),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_modes(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .stats
        .by_mode
        .iter()
        .map(|(mode, totals)| {
            let answered = totals.correct_answers + totals.incorrect_answers;
            let accuracy = if answered == 0 {
                0.0
            } else {
                f64::from(totals.correct_answers) * 100.0 / f64::from(answered)
            };
            let style = if totals.items_studied == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12}", mode.label()), style),
                Span::styled(accuracy_bar(accuracy), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(" {:>5} studied", totals.items_studied),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!(" {:>3} done", totals.completed_sessions),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Practice by Mode ")
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_recent_sets(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = if app.sets.items.is_empty() {
        vec![ListItem::new(Span::styled(
            "No study sets yet. Press s to add the sample set.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.sets
            .items
            .iter()
            .take(RECENT_SETS)
            .map(|set| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<10}", format_date(set.updated_at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{:<32}", truncate(&set.title, 30)),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(
                        format!("{:>4} items  ", set.items.len()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(
                        set.source_type.as_str(),
                        Style::default().fg(Color::Magenta),
                    ),
                ]))
            })
            .collect()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Study Sets ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
