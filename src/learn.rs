use std::collections::HashSet;

use chrono::Duration;
use serde::Serialize;

use crate::ai::{grade_with_fallback, ContentService, Grade};
use crate::models::{StudyItem, StudyMode};
use crate::modes::StudySession;
use crate::progress::SessionSummary;

pub const MAX_LEVEL: u8 = 4;

/// Levels at or above this count as mastered.
pub const MASTERED_LEVEL: u8 = 3;

/// How long an item rests at `level` before it is due again.
pub fn review_delay(level: u8) -> Duration {
    match level {
        0 => Duration::minutes(1),
        1 => Duration::hours(1),
        2 => Duration::days(1),
        3 => Duration::days(3),
        _ => Duration::days(7),
    }
}

/// A study item with its in-session knowledge state. Built fresh for every
/// learn session and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnItem {
    #[serde(flatten)]
    pub item: StudyItem,
    pub knowledge_level: u8,
    pub next_review: i64,
    pub last_reviewed: Option<i64>,
}

impl LearnItem {
    pub fn new(item: StudyItem, now: i64) -> Self {
        Self {
            item,
            knowledge_level: 0,
            next_review: now,
            last_reviewed: None,
        }
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.next_review <= now
    }

    /// Moves one level up on success or down on failure and reschedules.
    pub fn record(&mut self, success: bool, now: i64) {
        self.knowledge_level = if success {
            (self.knowledge_level + 1).min(MAX_LEVEL)
        } else {
            self.knowledge_level.saturating_sub(1)
        };
        self.next_review = now + review_delay(self.knowledge_level).num_milliseconds();
        self.last_reviewed = Some(now);
    }
}

/// Index of the due item with the earliest `next_review`; ties go to the
/// earlier item. `None` when nothing is due.
pub fn next_due(items: &[LearnItem], now: i64) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_due(now))
        .min_by_key(|(_, item)| item.next_review)
        .map(|(index, _)| index)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnStats {
    pub mastered: usize,
    pub in_progress: usize,
    pub not_started: usize,
}

impl LearnStats {
    pub fn from_items(items: &[LearnItem]) -> Self {
        let mastered = items
            .iter()
            .filter(|i| i.knowledge_level >= MASTERED_LEVEL)
            .count();
        let in_progress = items
            .iter()
            .filter(|i| i.knowledge_level > 0 && i.knowledge_level < MASTERED_LEVEL)
            .count();
        Self {
            mastered,
            in_progress,
            not_started: items.len() - mastered - in_progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnStage {
    Term,
    Definition,
    Quiz,
}

pub struct LearnSession {
    source: Vec<StudyItem>,
    items: Vec<LearnItem>,
    current: Option<usize>,
    stage: LearnStage,
    answer: String,
    last_grade: Option<Grade>,
    reviewed: HashSet<String>,
    correct: u32,
    incorrect: u32,
}

impl LearnSession {
    pub fn new(items: &[StudyItem], now: i64) -> Self {
        let mut session = Self {
            source: items.to_vec(),
            items: Vec::new(),
            current: None,
            stage: LearnStage::Term,
            answer: String::new(),
            last_grade: None,
            reviewed: HashSet::new(),
            correct: 0,
            incorrect: 0,
        };
        session.reset(now);
        session
    }

    /// Throws away all knowledge state and starts over from level 0.
    pub fn reset(&mut self, now: i64) {
        self.items = self
            .source
            .iter()
            .cloned()
            .map(|item| LearnItem::new(item, now))
            .collect();
        self.stage = LearnStage::Term;
        self.answer.clear();
        self.last_grade = None;
        self.reviewed.clear();
        self.correct = 0;
        self.incorrect = 0;
        self.current = next_due(&self.items, now);
    }

    pub fn items(&self) -> &[LearnItem] {
        &self.items
    }

    pub fn current(&self) -> Option<&LearnItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn stage(&self) -> LearnStage {
        self.stage
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn last_grade(&self) -> Option<Grade> {
        self.last_grade
    }

    pub fn stats(&self) -> LearnStats {
        LearnStats::from_items(&self.items)
    }

    pub fn reveal(&mut self) {
        if self.current.is_some() && self.stage == LearnStage::Term {
            self.stage = LearnStage::Definition;
        }
    }

    pub fn start_quiz(&mut self) {
        if self.current.is_some() && self.stage == LearnStage::Definition {
            self.answer.clear();
            self.stage = LearnStage::Quiz;
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.stage == LearnStage::Quiz {
            self.answer.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if self.stage == LearnStage::Quiz {
            self.answer.pop();
        }
    }

    /// Grades the typed answer against the current definition and applies it.
    pub fn submit_answer(&mut self, service: &dyn ContentService, now: i64) -> Option<Grade> {
        if self.stage != LearnStage::Quiz {
            return None;
        }
        let item = &self.current()?.item;
        let grade = grade_with_fallback(service, &item.term, &item.definition, &self.answer);
        self.apply(grade.correct, now);
        self.last_grade = Some(grade);
        Some(grade)
    }

    /// Self-assessed recall from the definition or quiz stage.
    pub fn self_grade(&mut self, success: bool, now: i64) {
        if self.stage == LearnStage::Term {
            return;
        }
        self.apply(success, now);
        self.last_grade = Some(Grade {
            correct: success,
            degraded: false,
        });
    }

    /// Re-checks for due items, e.g. after waiting out a delay.
    pub fn refresh(&mut self, now: i64) {
        if self.stage == LearnStage::Term {
            self.current = next_due(&self.items, now);
        }
    }

    fn apply(&mut self, success: bool, now: i64) {
        let Some(index) = self.current else { return };
        let item = &mut self.items[index];
        item.record(success, now);
        self.reviewed.insert(item.item.id.clone());
        if success {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.answer.clear();
        self.stage = LearnStage::Term;
        self.current = next_due(&self.items, now);
    }
}

impl StudySession for LearnSession {
    fn mode(&self) -> StudyMode {
        StudyMode::Learn
    }

    fn is_complete(&self) -> bool {
        self.current.is_none()
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            items_studied: self.reviewed.len() as u32,
            correct_answers: self.correct,
            incorrect_answers: self.incorrect,
            completed: self.is_complete() && !self.reviewed.is_empty(),
        }
    }
}
