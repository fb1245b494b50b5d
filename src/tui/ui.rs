use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, set_detail, sets, study};
use super::{App, View};
use crate::learn::LearnStage;
use crate::modes::{ActiveSession, WriteStage};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Study Sets", "Study"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Sets | View::SetDetail => 1,
        View::Study => 2,
    };

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" StudyDeck [{}] ", app.backend.as_str())),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Sets => sets::draw(f, app, area),
        View::SetDetail => set_detail::draw(f, app, area),
        View::Study => study::draw(f, app, area),
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = match app.view {
        View::Dashboard => vec![
            key("h/l"),
            Span::raw(" Views  "),
            key("s"),
            Span::raw(" Sample set  "),
            key("^r"),
            Span::raw(" Refresh  "),
            key("q"),
            Span::raw(" Quit"),
        ],
        View::Sets => vec![
            key("h/l"),
            Span::raw(" Views  "),
            key("j/k"),
            Span::raw(" Nav  "),
            key("g/G"),
            Span::raw(" Top/Bot  "),
            key("<CR>"),
            Span::raw(" Open  "),
            key("s"),
            Span::raw(" Sample set  "),
            key("q"),
            Span::raw(" Quit"),
        ],
        View::SetDetail => vec![
            key("1-5"),
            Span::raw(" Study mode  "),
            key("h/<Esc>"),
            Span::raw(" Back  "),
            key("q"),
            Span::raw(" Quit"),
        ],
        View::Study => study_help(app),
    };

    if let Some(message) = &app.message {
        spans.push(Span::raw("  | "));
        spans.push(Span::styled(
            message.as_str(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}

fn study_help(app: &App) -> Vec<Span<'static>> {
    let mut spans = match app.study.as_ref().map(|s| &s.session) {
        Some(ActiveSession::Flashcards(_)) => vec![
            key("<Space>"),
            Span::raw(" Flip  "),
            key("h/l"),
            Span::raw(" Prev/Next  "),
            key("y/n"),
            Span::raw(" Knew it/Didn't  "),
            key("s"),
            Span::raw(" Shuffle  "),
        ],
        Some(ActiveSession::Quiz(_)) => vec![
            key("1-4/a-d"),
            Span::raw(" Answer  "),
            key("<CR>"),
            Span::raw(" Next  "),
        ],
        Some(ActiveSession::Match(_)) => vec![
            key("h/j/k/l"),
            Span::raw(" Move  "),
            key("<Space>"),
            Span::raw(" Select  "),
        ],
        Some(ActiveSession::Learn(s)) => match s.stage() {
            LearnStage::Term => vec![
                key("<Space>"),
                Span::raw(" Reveal  "),
                key("R"),
                Span::raw(" Reset  "),
            ],
            LearnStage::Definition => vec![
                key("y/n"),
                Span::raw(" Knew it/Didn't  "),
                key("t"),
                Span::raw(" Type it  "),
            ],
            LearnStage::Quiz => vec![key("<CR>"), Span::raw(" Check  ")],
        },
        Some(ActiveSession::Write(s)) => match s.stage() {
            WriteStage::Answering => vec![key("<CR>"), Span::raw(" Check  ")],
            WriteStage::Graded(_) => vec![
                key("<CR>"),
                Span::raw(" Next  "),
                key("o"),
                Span::raw(" I was right  "),
            ],
        },
        None => Vec::new(),
    };

    spans.extend(vec![key("<Esc>"), Span::raw(" Leave")]);
    spans
}
