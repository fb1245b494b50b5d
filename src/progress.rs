use serde::Serialize;

use crate::error::Result;
use crate::models::{StudyMode, UserProgress};
use crate::store::StudyStore;

/// Counters a study mode hands over when a session ends or is left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub items_studied: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub completed: bool,
}

impl SessionSummary {
    pub fn is_empty(&self) -> bool {
        self.items_studied == 0 && self.correct_answers == 0 && self.incorrect_answers == 0
    }

    /// What happened after `earlier` was taken from the same running session.
    pub fn since(&self, earlier: &SessionSummary) -> SessionSummary {
        SessionSummary {
            items_studied: self.items_studied.saturating_sub(earlier.items_studied),
            correct_answers: self.correct_answers.saturating_sub(earlier.correct_answers),
            incorrect_answers: self.incorrect_answers.saturating_sub(earlier.incorrect_answers),
            completed: self.completed && !earlier.completed,
        }
    }
}

/// Folds a finished session into the lifetime totals for `(study_set_id, mode)`.
///
/// Totals accumulate across sessions; the store itself only ever sees a
/// last-write-wins upsert. Sessions where nothing was studied are not
/// recorded and the current record (if any) is returned unchanged.
pub fn record_session(
    store: &mut dyn StudyStore,
    study_set_id: &str,
    mode: StudyMode,
    summary: &SessionSummary,
    now: i64,
) -> Result<Option<UserProgress>> {
    let existing = store.get_user_progress(study_set_id, mode)?;
    if summary.is_empty() {
        return Ok(existing);
    }

    let mut progress = existing.unwrap_or_else(|| UserProgress::empty(study_set_id, mode, now));
    progress.updated_at = now;
    progress.items_studied += summary.items_studied;
    progress.correct_answers += summary.correct_answers;
    progress.incorrect_answers += summary.incorrect_answers;
    if summary.completed {
        progress.completed_sessions += 1;
    }

    let saved = store.save_user_progress(progress)?;
    log::debug!(
        "Recorded {} session for {}: {} studied, {} correct, {} incorrect",
        mode.as_str(),
        study_set_id,
        summary.items_studied,
        summary.correct_answers,
        summary.incorrect_answers
    );
    Ok(Some(saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewStudyItem, NewStudySet, SourceType};
    use crate::store::{LocalStore, MemoryKeyValueStore, SqliteStore};

    fn seeded(store: &mut dyn StudyStore) -> String {
        store
            .create_study_set(NewStudySet {
                title: "Spanish".into(),
                description: String::new(),
                items: vec![NewStudyItem::new("perro", "dog")],
                source_type: SourceType::Manual,
                source_name: None,
            })
            .unwrap()
            .id
    }

    fn summary(studied: u32, correct: u32, incorrect: u32, completed: bool) -> SessionSummary {
        SessionSummary {
            items_studied: studied,
            correct_answers: correct,
            incorrect_answers: incorrect,
            completed,
        }
    }

    #[test]
    fn first_session_creates_record() {
        let mut store = LocalStore::new(Box::new(MemoryKeyValueStore::default()));
        let id = seeded(&mut store);

        let saved = record_session(&mut store, &id, StudyMode::Quiz, &summary(4, 3, 1, true), 10)
            .unwrap()
            .unwrap();

        assert_eq!(saved.items_studied, 4);
        assert_eq!(saved.correct_answers, 3);
        assert_eq!(saved.incorrect_answers, 1);
        assert_eq!(saved.completed_sessions, 1);
        assert_eq!(saved.updated_at, 10);
    }

    #[test]
    fn sessions_accumulate() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store.init().unwrap();
        let id = seeded(&mut store);

        record_session(&mut store, &id, StudyMode::Write, &summary(4, 3, 1, true), 10).unwrap();
        record_session(&mut store, &id, StudyMode::Write, &summary(2, 0, 2, false), 20).unwrap();

        let saved = store
            .get_user_progress(&id, StudyMode::Write)
            .unwrap()
            .unwrap();
        assert_eq!(saved.items_studied, 6);
        assert_eq!(saved.correct_answers, 3);
        assert_eq!(saved.incorrect_answers, 3);
        assert_eq!(saved.completed_sessions, 1);
        assert_eq!(saved.updated_at, 20);
    }

    #[test]
    fn empty_session_is_not_recorded() {
        let mut store = LocalStore::new(Box::new(MemoryKeyValueStore::default()));
        let id = seeded(&mut store);

        let result =
            record_session(&mut store, &id, StudyMode::Match, &SessionSummary::default(), 5)
                .unwrap();
        assert!(result.is_none());
        assert!(store
            .get_user_progress(&id, StudyMode::Match)
            .unwrap()
            .is_none());
    }

    #[test]
    fn since_keeps_only_new_work() {
        let earlier = summary(2, 1, 1, false);
        let now = summary(5, 3, 2, true);
        assert_eq!(now.since(&earlier), summary(3, 2, 1, true));
        assert!(now.since(&now).is_empty());
        assert!(!now.since(&now).completed);
    }

    #[test]
    fn modes_are_tracked_separately() {
        let mut store = LocalStore::new(Box::new(MemoryKeyValueStore::default()));
        let id = seeded(&mut store);

        record_session(&mut store, &id, StudyMode::Learn, &summary(1, 1, 0, true), 1).unwrap();
        record_session(&mut store, &id, StudyMode::Flashcards, &summary(1, 0, 1, true), 2)
            .unwrap();

        let learn = store
            .get_user_progress(&id, StudyMode::Learn)
            .unwrap()
            .unwrap();
        assert_eq!(learn.correct_answers, 1);
        assert_eq!(learn.incorrect_answers, 0);
    }
}
