use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;

use super::{Backend, StudyStore};
use crate::error::Result;
use crate::models::{
    now_millis, NewStudySet, SourceType, StudyItem, StudyMode, StudySet, StudySetPatch,
    UserProgress,
};

const SET_COLUMNS: &str =
    "id, title, description, created_at, updated_at, source_type, source_name";

const PROGRESS_COLUMNS: &str = "study_set_id, mode, updated_at, items_studied, correct_answers, \
                                incorrect_answers, completed_sessions";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS study_sets (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                source_type TEXT NOT NULL CHECK(source_type IN ('pdf', 'manual', 'ai-generated')),
                source_name TEXT
            );

            CREATE TABLE IF NOT EXISTS study_items (
                id TEXT PRIMARY KEY,
                study_set_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                term TEXT NOT NULL,
                definition TEXT NOT NULL,
                options TEXT,
                correct_answer TEXT,
                FOREIGN KEY (study_set_id) REFERENCES study_sets(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS user_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                study_set_id TEXT NOT NULL,
                mode TEXT NOT NULL CHECK(mode IN ('flashcards', 'quiz', 'match', 'learn', 'write')),
                updated_at INTEGER NOT NULL,
                items_studied INTEGER NOT NULL DEFAULT 0,
                correct_answers INTEGER NOT NULL DEFAULT 0,
                incorrect_answers INTEGER NOT NULL DEFAULT 0,
                completed_sessions INTEGER NOT NULL DEFAULT 0,
                UNIQUE (study_set_id, mode)
            );

            CREATE INDEX IF NOT EXISTS idx_study_sets_updated ON study_sets(updated_at);
            CREATE INDEX IF NOT EXISTS idx_study_items_set ON study_items(study_set_id, position);
            CREATE INDEX IF NOT EXISTS idx_user_progress_set ON user_progress(study_set_id);
            "#,
        )?;
        Ok(())
    }

    fn load_items(&self, study_set_id: &str) -> Result<Vec<StudyItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, term, definition, options, correct_answer
            FROM study_items
            WHERE study_set_id = ?1
            ORDER BY position ASC
            "#,
        )?;

        let rows = stmt.query_map(params![study_set_id], |row| {
            let options: Option<String> = row.get(3)?;
            Ok(StudyItem {
                id: row.get(0)?,
                term: row.get(1)?,
                definition: row.get(2)?,
                options: options.map(|json| decode_options(&json, 3)).transpose()?,
                correct_answer: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl StudyStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn create_study_set(&mut self, data: NewStudySet) -> Result<StudySet> {
        data.validate()?;
        let set = data.into_study_set(now_millis());

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO study_sets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)", SET_COLUMNS),
            params![
                set.id,
                set.title,
                set.description,
                set.created_at,
                set.updated_at,
                set.source_type.as_str(),
                set.source_name
            ],
        )?;
        insert_items(&tx, &set.id, &set.items)?;
        tx.commit()?;

        log::debug!("Created study set {} with {} items", set.id, set.items.len());
        Ok(set)
    }

    fn get_study_set(&self, id: &str) -> Result<Option<StudySet>> {
        let set = self
            .conn
            .query_row(
                &format!("SELECT {} FROM study_sets WHERE id = ?1", SET_COLUMNS),
                params![id],
                set_from_row,
            )
            .optional()?;

        match set {
            Some(mut s) => {
                s.items = self.load_items(id)?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    fn update_study_set(&mut self, id: &str, patch: StudySetPatch) -> Result<Option<StudySet>> {
        let Some(mut set) = self.get_study_set(id)? else {
            return Ok(None);
        };
        patch.validate()?;

        let replace_items = patch.items.is_some();
        patch.apply(&mut set, now_millis());

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            UPDATE study_sets
            SET title = ?1, description = ?2, updated_at = ?3, source_type = ?4, source_name = ?5
            WHERE id = ?6
            "#,
            params![
                set.title,
                set.description,
                set.updated_at,
                set.source_type.as_str(),
                set.source_name,
                set.id
            ],
        )?;
        if replace_items {
            tx.execute(
                "DELETE FROM study_items WHERE study_set_id = ?1",
                params![set.id],
            )?;
            insert_items(&tx, &set.id, &set.items)?;
        }
        tx.commit()?;

        Ok(Some(set))
    }

    fn delete_study_set(&mut self, id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM user_progress WHERE study_set_id = ?1",
            params![id],
        )?;
        // Items go with the set through the cascade.
        let rows = tx.execute("DELETE FROM study_sets WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    fn get_all_study_sets(&self) -> Result<Vec<StudySet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM study_sets ORDER BY updated_at DESC, created_at DESC",
            SET_COLUMNS
        ))?;
        let rows = stmt.query_map([], set_from_row)?;
        let mut sets = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        for set in &mut sets {
            set.items = self.load_items(&set.id)?;
        }

        Ok(sets)
    }

    fn save_user_progress(&mut self, progress: UserProgress) -> Result<UserProgress> {
        self.conn.execute(
            &format!(
                r#"
                INSERT INTO user_progress ({})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(study_set_id, mode) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    items_studied = excluded.items_studied,
                    correct_answers = excluded.correct_answers,
                    incorrect_answers = excluded.incorrect_answers,
                    completed_sessions = excluded.completed_sessions
                "#,
                PROGRESS_COLUMNS
            ),
            params![
                progress.study_set_id,
                progress.mode.as_str(),
                progress.updated_at,
                progress.items_studied,
                progress.correct_answers,
                progress.incorrect_answers,
                progress.completed_sessions
            ],
        )?;
        Ok(progress)
    }

    fn get_user_progress(
        &self,
        study_set_id: &str,
        mode: StudyMode,
    ) -> Result<Option<UserProgress>> {
        let progress = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM user_progress WHERE study_set_id = ?1 AND mode = ?2",
                    PROGRESS_COLUMNS
                ),
                params![study_set_id, mode.as_str()],
                progress_from_row,
            )
            .optional()?;
        Ok(progress)
    }
}

fn insert_items(tx: &Transaction<'_>, study_set_id: &str, items: &[StudyItem]) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO study_items (id, study_set_id, position, term, definition, options, correct_answer)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;

    for (position, item) in items.iter().enumerate() {
        let options = item
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        stmt.execute(params![
            item.id,
            study_set_id,
            position as i64,
            item.term,
            item.definition,
            options,
            item.correct_answer
        ])?;
    }

    Ok(())
}

fn set_from_row(row: &Row<'_>) -> rusqlite::Result<StudySet> {
    let source_type: String = row.get(5)?;
    Ok(StudySet {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        items: vec![],
        source_type: SourceType::from_str(&source_type)
            .ok_or_else(|| conversion_error(5, format!("unknown source type '{}'", source_type)))?,
        source_name: row.get(6)?,
    })
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<UserProgress> {
    let mode: String = row.get(1)?;
    Ok(UserProgress {
        study_set_id: row.get(0)?,
        mode: StudyMode::from_str(&mode)
            .ok_or_else(|| conversion_error(1, format!("unknown study mode '{}'", mode)))?,
        updated_at: row.get(2)?,
        items_studied: row.get(3)?,
        correct_answers: row.get(4)?,
        incorrect_answers: row.get(5)?,
        completed_sessions: row.get(6)?,
    })
}

fn decode_options(json: &str, column: usize) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(json).map_err(|e| conversion_error(column, e.to_string()))
}

fn conversion_error(column: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewStudyItem;

    fn setup_store() -> SqliteStore {
        let store = SqliteStore::open(":memory:").expect("Failed to create in-memory database");
        store.init().expect("Failed to initialize database");
        store
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    fn biology() -> NewStudySet {
        NewStudySet {
            title: "Biology".into(),
            description: String::new(),
            items: vec![
                NewStudyItem::new("Cell", "Unit of life"),
                NewStudyItem::new("Gene", "Unit of heredity"),
            ],
            source_type: SourceType::Pdf,
            source_name: Some("bio.pdf".into()),
        }
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let store = setup_store();
            assert_eq!(count(&store, "study_sets"), 0);
            assert_eq!(count(&store, "study_items"), 0);
            assert_eq!(count(&store, "user_progress"), 0);
        }

        #[test]
        fn init_is_idempotent() {
            let mut store = setup_store();
            store.create_study_set(biology()).unwrap();

            store.init().expect("Re-init should succeed");

            assert_eq!(store.get_all_study_sets().unwrap().len(), 1);
        }
    }

    mod item_tests {
        use super::*;

        #[test]
        fn delete_cascades_items() {
            let mut store = setup_store();
            let set = store.create_study_set(biology()).unwrap();
            assert_eq!(count(&store, "study_items"), 2);

            store.delete_study_set(&set.id).unwrap();
            assert_eq!(count(&store, "study_items"), 0);
        }

        #[test]
        fn replacing_items_removes_old_rows() {
            let mut store = setup_store();
            let set = store.create_study_set(biology()).unwrap();

            let patch = StudySetPatch {
                items: Some(vec![NewStudyItem::new("Enzyme", "Biological catalyst")]),
                ..Default::default()
            };
            store.update_study_set(&set.id, patch).unwrap();

            assert_eq!(count(&store, "study_items"), 1);
        }

        #[test]
        fn invalid_patch_leaves_row_untouched() {
            let mut store = setup_store();
            let set = store.create_study_set(biology()).unwrap();

            let patch = StudySetPatch {
                title: Some("".into()),
                ..Default::default()
            };
            assert!(store.update_study_set(&set.id, patch).is_err());

            let fetched = store.get_study_set(&set.id).unwrap().unwrap();
            assert_eq!(fetched.title, "Biology");
            assert_eq!(fetched.updated_at, set.updated_at);
        }

        #[test]
        fn source_fields_round_trip() {
            let mut store = setup_store();
            let set = store.create_study_set(biology()).unwrap();
            let fetched = store.get_study_set(&set.id).unwrap().unwrap();
            assert_eq!(fetched.source_type, SourceType::Pdf);
            assert_eq!(fetched.source_name.as_deref(), Some("bio.pdf"));
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn upsert_keeps_single_row() {
            let mut store = setup_store();
            let set = store.create_study_set(biology()).unwrap();

            for studied in 1..=3 {
                let mut progress = UserProgress::empty(&set.id, StudyMode::Match, studied as i64);
                progress.items_studied = studied;
                store.save_user_progress(progress).unwrap();
            }

            assert_eq!(count(&store, "user_progress"), 1);
            let saved = store
                .get_user_progress(&set.id, StudyMode::Match)
                .unwrap()
                .unwrap();
            assert_eq!(saved.items_studied, 3);
            assert_eq!(saved.updated_at, 3);
        }
    }
}
