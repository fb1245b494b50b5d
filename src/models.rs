use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of choices a multiple-choice item carries.
pub const OPTION_COUNT: usize = 4;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Where a study set came from. Recorded for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    Pdf,
    Manual,
    AiGenerated,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Manual => "manual",
            SourceType::AiGenerated => "ai-generated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Some(SourceType::Pdf),
            "manual" => Some(SourceType::Manual),
            "ai-generated" | "ai" => Some(SourceType::AiGenerated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Flashcards,
    Quiz,
    Match,
    Learn,
    Write,
}

impl StudyMode {
    pub const ALL: [StudyMode; 5] = [
        StudyMode::Flashcards,
        StudyMode::Quiz,
        StudyMode::Match,
        StudyMode::Learn,
        StudyMode::Write,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Flashcards => "flashcards",
            StudyMode::Quiz => "quiz",
            StudyMode::Match => "match",
            StudyMode::Learn => "learn",
            StudyMode::Write => "write",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flashcards" | "flashcard" | "cards" => Some(StudyMode::Flashcards),
            "quiz" => Some(StudyMode::Quiz),
            "match" => Some(StudyMode::Match),
            "learn" => Some(StudyMode::Learn),
            "write" => Some(StudyMode::Write),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StudyMode::Flashcards => "Flashcards",
            StudyMode::Quiz => "Quiz",
            StudyMode::Match => "Match",
            StudyMode::Learn => "Learn",
            StudyMode::Write => "Write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyItem {
    pub id: String,
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl StudyItem {
    /// The item's own multiple-choice options and the index of the right one,
    /// when both are present and well formed.
    pub fn choice(&self) -> Option<(&[String], usize)> {
        let options = self.options.as_deref()?;
        if options.len() != OPTION_COUNT {
            return None;
        }
        let index = option_index(self.correct_answer.as_deref()?)?;
        Some((options, index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub items: Vec<StudyItem>,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

/// Input for a study item. `id` is only honoured when an edit replaces the
/// items of a set that already holds an item with that id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudyItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl NewStudyItem {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: None,
            term: term.into(),
            definition: definition.into(),
            options: None,
            correct_answer: None,
        }
    }

    pub fn with_choices(mut self, options: Vec<String>, correct_answer: impl Into<String>) -> Self {
        self.options = Some(options);
        self.correct_answer = Some(correct_answer.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.term.trim().is_empty() {
            return Err(Error::validation("item term must not be empty"));
        }
        if self.definition.trim().is_empty() {
            return Err(Error::validation(format!(
                "definition for '{}' must not be empty",
                self.term
            )));
        }
        if let Some(options) = &self.options {
            if options.len() != OPTION_COUNT {
                return Err(Error::validation(format!(
                    "'{}' must have exactly {} options, got {}",
                    self.term,
                    OPTION_COUNT,
                    options.len()
                )));
            }
            if options.iter().any(|o| o.trim().is_empty()) {
                return Err(Error::validation(format!(
                    "'{}' has an empty option",
                    self.term
                )));
            }
        }
        if let Some(letter) = &self.correct_answer {
            if self.options.is_none() {
                return Err(Error::validation(format!(
                    "'{}' has a correct answer but no options",
                    self.term
                )));
            }
            if option_index(letter).is_none() {
                return Err(Error::validation(format!(
                    "'{}' correct answer must be a letter A-D, got '{}'",
                    self.term, letter
                )));
            }
        }
        Ok(())
    }

    /// Builds a stored item under a fresh id.
    pub fn into_item(self) -> StudyItem {
        self.into_item_with_id(new_id())
    }

    fn into_item_with_id(self, id: String) -> StudyItem {
        StudyItem {
            id,
            term: self.term,
            definition: self.definition,
            options: self.options,
            correct_answer: self.correct_answer,
        }
    }
}

impl From<StudyItem> for NewStudyItem {
    fn from(item: StudyItem) -> Self {
        Self {
            id: Some(item.id),
            term: item.term,
            definition: item.definition,
            options: item.options,
            correct_answer: item.correct_answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<NewStudyItem>,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl NewStudySet {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_items(&self.items)
    }

    /// Builds the entity that gets persisted, with fresh ids and timestamps.
    pub fn into_study_set(self, now: i64) -> StudySet {
        StudySet {
            id: new_id(),
            title: self.title,
            description: self.description,
            created_at: now,
            updated_at: now,
            items: self.items.into_iter().map(NewStudyItem::into_item).collect(),
            source_type: self.source_type,
            source_name: self.source_name,
        }
    }
}

/// Partial update. `items`, when present, replaces the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Option<Vec<NewStudyItem>>,
    pub source_type: Option<SourceType>,
    pub source_name: Option<String>,
}

impl StudySetPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(items) = &self.items {
            validate_items(items)?;
        }
        Ok(())
    }

    /// Merges the patch over `set` and stamps `updated_at`.
    pub fn apply(self, set: &mut StudySet, now: i64) {
        if let Some(title) = self.title {
            set.title = title;
        }
        if let Some(description) = self.description {
            set.description = description;
        }
        if let Some(items) = self.items {
            set.items = replace_items(&set.items, items);
        }
        if let Some(source_type) = self.source_type {
            set.source_type = source_type;
        }
        if let Some(source_name) = self.source_name {
            set.source_name = Some(source_name);
        }
        set.updated_at = now;
    }
}

/// Items that carry the id of an item already in the set keep it; everything
/// else, including a repeated id, gets a fresh one.
fn replace_items(current: &[StudyItem], items: Vec<NewStudyItem>) -> Vec<StudyItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|mut item| {
            let id = item
                .id
                .take()
                .filter(|id| current.iter().any(|c| &c.id == id) && seen.insert(id.clone()))
                .unwrap_or_else(new_id);
            item.into_item_with_id(id)
        })
        .collect()
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("title must not be empty"));
    }
    Ok(())
}

fn validate_items(items: &[NewStudyItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::validation("a study set needs at least one item"));
    }
    items.iter().try_for_each(NewStudyItem::validate)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub study_set_id: String,
    pub mode: StudyMode,
    pub updated_at: i64,
    pub items_studied: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub completed_sessions: u32,
}

impl UserProgress {
    pub fn empty(study_set_id: impl Into<String>, mode: StudyMode, now: i64) -> Self {
        Self {
            study_set_id: study_set_id.into(),
            mode,
            updated_at: now,
            items_studied: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            completed_sessions: 0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        let answered = self.correct_answers + self.incorrect_answers;
        if answered == 0 {
            0.0
        } else {
            (self.correct_answers as f64 / answered as f64) * 100.0
        }
    }
}

pub fn option_letter(index: usize) -> Option<char> {
    match index {
        0 => Some('A'),
        1 => Some('B'),
        2 => Some('C'),
        3 => Some('D'),
        _ => None,
    }
}

pub fn option_index(letter: &str) -> Option<usize> {
    match letter.trim().to_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
