use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::StudySession;
use crate::models::{StudyItem, StudyMode};
use crate::progress::SessionSummary;

pub struct FlashcardSession {
    cards: Vec<StudyItem>,
    index: usize,
    flipped: bool,
    // item id -> known
    marks: HashMap<String, bool>,
}

impl FlashcardSession {
    pub fn new(items: &[StudyItem]) -> Self {
        Self {
            cards: items.to_vec(),
            index: 0,
            flipped: false,
            marks: HashMap::new(),
        }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.index = 0;
        self.flipped = false;
    }

    pub fn current(&self) -> Option<&StudyItem> {
        self.cards.get(self.index)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.cards.len())
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn mark_of(&self, item_id: &str) -> Option<bool> {
        self.marks.get(item_id).copied()
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) {
        if self.index + 1 < self.cards.len() {
            self.index += 1;
            self.flipped = false;
        }
    }

    pub fn previous(&mut self) {
        if self.index > 0 {
            self.index -= 1;
            self.flipped = false;
        }
    }

    /// Records whether the learner knew the current card and moves on.
    pub fn mark(&mut self, known: bool) {
        let Some(card) = self.current() else { return };
        let id = card.id.clone();
        self.marks.insert(id, known);
        self.next();
    }
}

impl StudySession for FlashcardSession {
    fn mode(&self) -> StudyMode {
        StudyMode::Flashcards
    }

    fn is_complete(&self) -> bool {
        !self.cards.is_empty() && self.marks.len() == self.cards.len()
    }

    fn summary(&self) -> SessionSummary {
        let known = self.marks.values().filter(|&&k| k).count() as u32;
        SessionSummary {
            items_studied: self.marks.len() as u32,
            correct_answers: known,
            incorrect_answers: self.marks.len() as u32 - known,
            completed: self.is_complete(),
        }
    }
}
