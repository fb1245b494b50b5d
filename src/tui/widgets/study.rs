use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::format_until;
use crate::truncate;
use crate::ai::Grade;
use crate::learn::{LearnSession, LearnStage};
use crate::models::{now_millis, option_letter};
use crate::modes::{
    ActiveSession, FlashcardSession, MatchSession, MatchSide, QuizSession, StudySession,
    WriteSession, WriteStage,
};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(study) = &app.study else {
        let block = Block::default().borders(Borders::ALL).title(" Study ");
        let paragraph = Paragraph::new("No session running").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Session header
            Constraint::Min(0),    // Mode body
        ])
        .split(area);

    let summary = study.session.summary();
    let header = Line::from(vec![
        Span::styled(
            format!("{} ", study.session.mode().label()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            truncate(&study.set.title, 40),
            Style::default().fg(Color::White),
        ),
        Span::raw("   "),
        Span::styled(
            format!("{} right", summary.correct_answers),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" / "),
        Span::styled(
            format!("{} wrong", summary.incorrect_answers),
            Style::default().fg(Color::Red),
        ),
        if study.session.is_complete() {
            Span::styled(
                "   Complete!",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw("")
        },
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    match &study.session {
        ActiveSession::Flashcards(s) => draw_flashcards(f, s, chunks[1]),
        ActiveSession::Quiz(s) => draw_quiz(f, s, chunks[1]),
        ActiveSession::Match(s) => draw_match(f, s, chunks[1]),
        ActiveSession::Learn(s) => draw_learn(f, s, chunks[1]),
        ActiveSession::Write(s) => draw_write(f, s, chunks[1]),
    }
}

fn card(title: String, lines: Vec<Line<'_>>) -> Paragraph<'_> {
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

fn grade_line(grade: Grade) -> Line<'static> {
    let mut spans = vec![if grade.correct {
        Span::styled(
            "Correct",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "Not quite",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    }];
    if grade.degraded {
        spans.push(Span::styled(
            " (checked locally)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn input_line(answer: &str) -> Line<'_> {
    Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Yellow)),
        Span::raw(answer),
        Span::styled("█", Style::default().fg(Color::Yellow)),
    ])
}

fn draw_flashcards(f: &mut Frame, s: &FlashcardSession, area: Rect) {
    let Some(item) = s.current() else {
        f.render_widget(card(" Flashcards ".into(), Vec::new()), area);
        return;
    };
    let (pos, total) = s.position();

    let (label, text, color) = if s.is_flipped() {
        ("Definition", item.definition.as_str(), Color::Cyan)
    } else {
        ("Term", item.term.as_str(), Color::White)
    };
    let mark = match s.mark_of(&item.id) {
        Some(true) => Span::styled("known", Style::default().fg(Color::Green)),
        Some(false) => Span::styled("still learning", Style::default().fg(Color::Red)),
        None => Span::raw(""),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(label, Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(mark),
    ];
    f.render_widget(card(format!(" Card {}/{} ", pos, total), lines), area);
}

fn draw_quiz(f: &mut Frame, s: &QuizSession, area: Rect) {
    let Some(question) = s.current() else {
        f.render_widget(card(" Quiz ".into(), Vec::new()), area);
        return;
    };
    let (pos, total) = s.position();
    let chosen = s.chosen();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            question.prompt.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (i, option) in question.options.iter().enumerate() {
        let style = match chosen {
            Some(_) if i == question.correct_index => Style::default().fg(Color::Green),
            Some(c) if c == i => Style::default().fg(Color::Red),
            _ => Style::default().fg(Color::Gray),
        };
        let letter = option_letter(i).unwrap_or('?');
        lines.push(Line::from(Span::styled(
            format!("{}. {}", letter, option),
            style,
        )));
    }
    f.render_widget(card(format!(" Question {}/{} ", pos, total), lines), area);
}

fn draw_match(f: &mut Frame, s: &MatchSession, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let tile_item = |index: usize| {
        let tile = &s.tiles()[index];
        let style = if tile.matched {
            Style::default().fg(Color::DarkGray)
        } else if s.selected() == Some(index) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if s.cursor() == index {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        } else {
            Style::default().fg(Color::White)
        };
        let cursor = if s.cursor() == index { "> " } else { "  " };
        ListItem::new(Line::from(Span::styled(
            format!("{}{}", cursor, truncate(&tile.text, 60)),
            style,
        )))
    };

    let half = s.tiles().len().div_ceil(2);
    let left: Vec<ListItem> = (0..half).map(tile_item).collect();
    let right: Vec<ListItem> = (half..s.tiles().len()).map(tile_item).collect();

    let (round, rounds) = s.round();
    let title = format!(
        " Round {}/{} | Matched {} | Mistakes {} ",
        round,
        rounds,
        s.matched_pairs(),
        s.mistakes()
    );
    f.render_widget(
        List::new(left).block(Block::default().borders(Borders::ALL).title(title)),
        columns[0],
    );
    let hint = match s.selected().map(|i| s.tiles()[i].side) {
        Some(MatchSide::Term) => " Pick its definition ",
        Some(MatchSide::Definition) => " Pick its term ",
        None => " Pick a tile ",
    };
    f.render_widget(
        List::new(right).block(Block::default().borders(Borders::ALL).title(hint)),
        columns[1],
    );
}

fn draw_learn(f: &mut Frame, s: &LearnSession, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let stats = s.stats();
    let stats_line = Line::from(vec![
        Span::styled("Mastered ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.mastered),
            Style::default().fg(Color::Green),
        ),
        Span::styled("  Learning ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.in_progress),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("  New ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.not_started),
            Style::default().fg(Color::White),
        ),
    ]);
    f.render_widget(
        Paragraph::new(stats_line).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let mut lines = vec![Line::from("")];
    if let Some(grade) = s.last_grade() {
        lines.push(grade_line(grade));
        lines.push(Line::from(""));
    }

    let Some(current) = s.current() else {
        let next = s.items().iter().map(|i| i.next_review).min();
        lines.push(Line::from(Span::styled(
            "Nothing is due right now.",
            Style::default().fg(Color::Green),
        )));
        if let Some(next) = next {
            lines.push(Line::from(Span::styled(
                format!("Next review {}", format_until(next, now_millis())),
                Style::default().fg(Color::DarkGray),
            )));
        }
        f.render_widget(card(" Learn ".into(), lines), chunks[1]);
        return;
    };

    lines.push(Line::from(Span::styled(
        current.item.term.as_str(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    match s.stage() {
        LearnStage::Term => {}
        LearnStage::Definition => lines.push(Line::from(Span::styled(
            current.item.definition.as_str(),
            Style::default().fg(Color::Cyan),
        ))),
        LearnStage::Quiz => lines.push(input_line(s.answer())),
    }

    let title = format!(" Level {} ", current.knowledge_level);
    f.render_widget(card(title, lines), chunks[1]);
}

fn draw_write(f: &mut Frame, s: &WriteSession, area: Rect) {
    let Some(item) = s.current() else {
        f.render_widget(card(" Write ".into(), Vec::new()), area);
        return;
    };
    let (pos, total) = s.position();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            item.term.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        input_line(s.answer()),
        Line::from(""),
    ];
    if let WriteStage::Graded(grade) = s.stage() {
        lines.push(grade_line(grade));
        lines.push(Line::from(vec![
            Span::styled("Answer: ", Style::default().fg(Color::Gray)),
            Span::styled(item.definition.as_str(), Style::default().fg(Color::Cyan)),
        ]));
    }
    f.render_widget(card(format!(" {}/{} ", pos, total), lines), area);
}
