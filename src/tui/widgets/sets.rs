use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::format_date;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .sets
        .items
        .iter()
        .map(|set| {
            let has_choices = set.items.iter().all(|i| i.choice().is_some());
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<32}", truncate(&set.title, 30)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6}  ", set.items.len()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:<14}", set.source_type.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<10}", format_date(set.updated_at)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    if has_choices { "quiz-ready" } else { "" },
                    Style::default().fg(Color::Green),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Study Sets ({}) ", app.sets.items.len()))
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("{:<32}", "Title"), header_style),
        Span::styled(format!("{:>6}  ", "Items"), header_style),
        Span::styled(format!("{:<14}", "Source"), header_style),
        Span::styled("Updated", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.sets.selected);

    // Header sits on the first row inside the border
    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
