//! Session state for each study mode. Rendering lives in the TUI; these
//! types only track what the learner has done and what comes next.

mod flashcards;
mod matching;
mod quiz;
mod write;

pub use flashcards::FlashcardSession;
pub use matching::{MatchOutcome, MatchSession, MatchSide};
pub use quiz::QuizSession;
pub use write::{WriteSession, WriteStage};

use rand::Rng;

use crate::learn::LearnSession;
use crate::models::{StudyItem, StudyMode};
use crate::progress::SessionSummary;

pub trait StudySession {
    fn mode(&self) -> StudyMode;

    fn is_complete(&self) -> bool;

    /// Counters so far; valid at any point, not only on completion.
    fn summary(&self) -> SessionSummary;
}

pub enum ActiveSession {
    Flashcards(FlashcardSession),
    Quiz(QuizSession),
    Match(MatchSession),
    Learn(LearnSession),
    Write(WriteSession),
}

impl ActiveSession {
    pub fn start<R: Rng + ?Sized>(
        mode: StudyMode,
        items: &[StudyItem],
        now: i64,
        rng: &mut R,
    ) -> Self {
        match mode {
            StudyMode::Flashcards => ActiveSession::Flashcards(FlashcardSession::new(items)),
            StudyMode::Quiz => ActiveSession::Quiz(QuizSession::new(items, rng)),
            StudyMode::Match => ActiveSession::Match(MatchSession::new(items, rng)),
            StudyMode::Learn => ActiveSession::Learn(LearnSession::new(items, now)),
            StudyMode::Write => ActiveSession::Write(WriteSession::new(items)),
        }
    }

    fn inner(&self) -> &dyn StudySession {
        match self {
            ActiveSession::Flashcards(s) => s,
            ActiveSession::Quiz(s) => s,
            ActiveSession::Match(s) => s,
            ActiveSession::Learn(s) => s,
            ActiveSession::Write(s) => s,
        }
    }
}

impl StudySession for ActiveSession {
    fn mode(&self) -> StudyMode {
        self.inner().mode()
    }

    fn is_complete(&self) -> bool {
        self.inner().is_complete()
    }

    fn summary(&self) -> SessionSummary {
        self.inner().summary()
    }
}
