use rand::seq::SliceRandom;
use rand::Rng;

use super::StudySession;
use crate::models::{StudyItem, StudyMode, OPTION_COUNT};
use crate::progress::SessionSummary;

// Filler choices for sets too small to supply three distractors.
const PLACEHOLDER_OPTIONS: [&str; 4] = [
    "None of the above",
    "All of the above",
    "Not enough information",
    "It depends",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub item_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

/// Choices for `item`: its own options when it carries a valid set, else the
/// correct definition mixed with other definitions from `pool` and, when the
/// pool runs short, placeholder options.
pub fn build_options<R: Rng + ?Sized>(
    item: &StudyItem,
    pool: &[StudyItem],
    rng: &mut R,
) -> (Vec<String>, usize) {
    if let Some((options, index)) = item.choice() {
        return (options.to_vec(), index);
    }

    let correct = item.definition.trim().to_string();

    let mut distractors: Vec<String> = Vec::new();
    for other in pool {
        let candidate = other.definition.trim();
        if other.id == item.id
            || same(candidate, &correct)
            || distractors.iter().any(|d| same(d, candidate))
        {
            continue;
        }
        distractors.push(candidate.to_string());
    }
    distractors.shuffle(rng);
    distractors.truncate(OPTION_COUNT - 1);

    for placeholder in PLACEHOLDER_OPTIONS {
        if distractors.len() == OPTION_COUNT - 1 {
            break;
        }
        if same(placeholder, &correct) || distractors.iter().any(|d| same(d, placeholder)) {
            continue;
        }
        distractors.push(placeholder.to_string());
    }

    let mut options = distractors;
    options.push(correct.clone());
    options.shuffle(rng);
    let correct_index = options.iter().position(|o| *o == correct).unwrap_or(0);
    (options, correct_index)
}

fn same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    index: usize,
    choices: Vec<Option<usize>>,
}

impl QuizSession {
    pub fn new<R: Rng + ?Sized>(items: &[StudyItem], rng: &mut R) -> Self {
        let questions: Vec<QuizQuestion> = items
            .iter()
            .map(|item| {
                let (options, correct_index) = build_options(item, items, rng);
                QuizQuestion {
                    item_id: item.id.clone(),
                    prompt: item.term.clone(),
                    options,
                    correct_index,
                }
            })
            .collect();
        let choices = vec![None; questions.len()];
        Self {
            questions,
            index: 0,
            choices,
        }
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.index)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.questions.len())
    }

    /// The learner's pick for the current question, once made.
    pub fn chosen(&self) -> Option<usize> {
        self.choices.get(self.index).copied().flatten()
    }

    /// Answers the current question. Returns whether the pick was right, or
    /// `None` if the question was already answered or `choice` is out of range.
    pub fn choose(&mut self, choice: usize) -> Option<bool> {
        let question = self.questions.get(self.index)?;
        if choice >= question.options.len() || self.chosen().is_some() {
            return None;
        }
        let correct = choice == question.correct_index;
        self.choices[self.index] = Some(choice);
        Some(correct)
    }

    pub fn next(&mut self) {
        if self.chosen().is_some() && self.index + 1 < self.questions.len() {
            self.index += 1;
        }
    }

    fn tally(&self) -> (u32, u32) {
        self.questions
            .iter()
            .zip(&self.choices)
            .filter_map(|(q, c)| c.map(|c| c == q.correct_index))
            .fold((0, 0), |(right, wrong), ok| {
                if ok {
                    (right + 1, wrong)
                } else {
                    (right, wrong + 1)
                }
            })
    }
}

impl StudySession for QuizSession {
    fn mode(&self) -> StudyMode {
        StudyMode::Quiz
    }

    fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.choices.iter().all(Option::is_some)
    }

    fn summary(&self) -> SessionSummary {
        let (correct, incorrect) = self.tally();
        SessionSummary {
            items_studied: correct + incorrect,
            correct_answers: correct,
            incorrect_answers: incorrect,
            completed: self.is_complete(),
        }
    }
}
