use super::StudySession;
use crate::ai::{grade_with_fallback, ContentService, Grade};
use crate::models::{StudyItem, StudyMode};
use crate::progress::SessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Answering,
    Graded(Grade),
}

/// Shows a term, the learner types the definition.
pub struct WriteSession {
    items: Vec<StudyItem>,
    index: usize,
    answer: String,
    stage: WriteStage,
    results: Vec<Option<bool>>,
}

impl WriteSession {
    pub fn new(items: &[StudyItem]) -> Self {
        Self {
            items: items.to_vec(),
            index: 0,
            answer: String::new(),
            stage: WriteStage::Answering,
            results: vec![None; items.len()],
        }
    }

    pub fn current(&self) -> Option<&StudyItem> {
        self.items.get(self.index)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.items.len())
    }

    pub fn stage(&self) -> WriteStage {
        self.stage
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn push_char(&mut self, c: char) {
        if self.stage == WriteStage::Answering {
            self.answer.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if self.stage == WriteStage::Answering {
            self.answer.pop();
        }
    }

    pub fn submit(&mut self, service: &dyn ContentService) -> Option<Grade> {
        if self.stage != WriteStage::Answering {
            return None;
        }
        let item = self.items.get(self.index)?;
        let grade = grade_with_fallback(service, &item.term, &item.definition, &self.answer);
        self.results[self.index] = Some(grade.correct);
        self.stage = WriteStage::Graded(grade);
        Some(grade)
    }

    /// Lets the learner overrule a wrong verdict ("I was right").
    pub fn override_correct(&mut self) {
        if let WriteStage::Graded(grade) = self.stage {
            if !grade.correct {
                self.results[self.index] = Some(true);
                self.stage = WriteStage::Graded(Grade {
                    correct: true,
                    degraded: grade.degraded,
                });
            }
        }
    }

    pub fn next(&mut self) {
        if matches!(self.stage, WriteStage::Graded(_)) && self.index + 1 < self.items.len() {
            self.index += 1;
            self.answer.clear();
            self.stage = WriteStage::Answering;
        }
    }
}

impl StudySession for WriteSession {
    fn mode(&self) -> StudyMode {
        StudyMode::Write
    }

    fn is_complete(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(Option::is_some)
    }

    fn summary(&self) -> SessionSummary {
        let correct = self.results.iter().filter(|r| **r == Some(true)).count() as u32;
        let incorrect = self.results.iter().filter(|r| **r == Some(false)).count() as u32;
        SessionSummary {
            items_studied: correct + incorrect,
            correct_answers: correct,
            incorrect_answers: incorrect,
            completed: self.is_complete(),
        }
    }
}
