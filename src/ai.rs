//! Seam to the external AI content/grading service.
//!
//! The service itself lives outside this crate. What lives here is the
//! contract, the structural checks applied to anything it returns, and the
//! deterministic behavior used whenever it fails.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{option_index, NewStudyItem, OPTION_COUNT};

/// Upper bound on flashcard candidates accepted from one extraction.
pub const MAX_GENERATED_ITEMS: usize = 100;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,

    #[error("malformed AI response: {0}")]
    Malformed(String),
}

pub trait ContentService {
    /// Judges whether `answer` is an acceptable recall of `expected`.
    fn grade_answer(&self, term: &str, expected: &str, answer: &str) -> Result<bool, AiError>;
}

/// Used when no AI endpoint is available; every call takes the fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredService;

impl ContentService for UnconfiguredService {
    fn grade_answer(&self, _term: &str, _expected: &str, _answer: &str) -> Result<bool, AiError> {
        Err(AiError::NotConfigured)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub correct: bool,
    /// True when the AI call failed and `substring_match` decided instead.
    pub degraded: bool,
}

pub fn grade_with_fallback(
    service: &dyn ContentService,
    term: &str,
    expected: &str,
    answer: &str,
) -> Grade {
    match service.grade_answer(term, expected, answer) {
        Ok(correct) => Grade {
            correct,
            degraded: false,
        },
        Err(e) => {
            match e {
                AiError::NotConfigured => log::debug!("Grading '{}' locally: {}", term, e),
                _ => log::warn!("AI grading failed for '{}', using substring match: {}", term, e),
            }
            Grade {
                correct: substring_match(answer, expected),
                degraded: true,
            }
        }
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lenient comparison: a non-empty answer passes when either side contains
/// the other, ignoring case and runs of whitespace.
pub fn substring_match(answer: &str, expected: &str) -> bool {
    let answer = normalize(answer);
    let expected = normalize(expected);
    if answer.is_empty() || expected.is_empty() {
        return false;
    }
    expected.contains(&answer) || answer.contains(&expected)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedItem {
    term: Option<String>,
    definition: Option<String>,
    options: Option<Vec<String>>,
    correct_answer: Option<String>,
}

/// Checks the shape of an extraction result: a JSON array of 1 to
/// [`MAX_GENERATED_ITEMS`] objects with a term and a definition, and, when
/// present, exactly four options plus an A-D answer letter.
pub fn parse_generated_items(raw: &str) -> Result<Vec<NewStudyItem>, AiError> {
    let generated: Vec<GeneratedItem> =
        serde_json::from_str(raw).map_err(|e| AiError::Malformed(e.to_string()))?;

    if generated.is_empty() {
        return Err(AiError::Malformed("no items".into()));
    }
    if generated.len() > MAX_GENERATED_ITEMS {
        return Err(AiError::Malformed(format!(
            "{} items exceeds the limit of {}",
            generated.len(),
            MAX_GENERATED_ITEMS
        )));
    }

    generated
        .into_iter()
        .enumerate()
        .map(|(i, g)| {
            let term = required(g.term, i, "term")?;
            let definition = required(g.definition, i, "definition")?;
            let mut item = NewStudyItem::new(term, definition);

            match (g.options, g.correct_answer) {
                (Some(options), Some(letter)) => {
                    if options.len() != OPTION_COUNT {
                        return Err(AiError::Malformed(format!(
                            "item {} has {} options",
                            i,
                            options.len()
                        )));
                    }
                    if option_index(&letter).is_none() {
                        return Err(AiError::Malformed(format!(
                            "item {} has answer letter '{}'",
                            i, letter
                        )));
                    }
                    item = item.with_choices(options, letter);
                }
                (Some(_), None) => {
                    log::debug!("Dropping options without an answer letter on item {}", i);
                }
                (None, _) => {}
            }

            Ok(item)
        })
        .collect()
}

fn required(value: Option<String>, index: usize, field: &str) -> Result<String, AiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AiError::Malformed(format!("item {} is missing {}", index, field))),
    }
}
