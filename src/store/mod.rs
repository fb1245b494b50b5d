mod local;
mod sqlite;

#[cfg(test)]
pub use local::MemoryKeyValueStore;
pub use local::{FileKeyValueStore, LocalStore};
pub use sqlite::SqliteStore;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::models::{NewStudySet, StudyMode, StudySet, StudySetPatch, UserProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Local => "local",
        }
    }
}

/// Storage contract shared by the SQLite database and the local fallback.
///
/// Lookups of missing records return `Ok(None)` (or `Ok(false)` for delete);
/// `Err` is reserved for validation and storage failures.
pub trait StudyStore {
    fn backend(&self) -> Backend;

    fn create_study_set(&mut self, data: NewStudySet) -> Result<StudySet>;

    fn get_study_set(&self, id: &str) -> Result<Option<StudySet>>;

    /// Merges `patch` over the stored set. Supplying `items` replaces them all.
    fn update_study_set(&mut self, id: &str, patch: StudySetPatch) -> Result<Option<StudySet>>;

    /// Removes the set together with its items and progress records.
    fn delete_study_set(&mut self, id: &str) -> Result<bool>;

    /// Every set, most recently updated first.
    fn get_all_study_sets(&self) -> Result<Vec<StudySet>>;

    /// Upsert keyed by `(study_set_id, mode)`; the last write wins.
    fn save_user_progress(&mut self, progress: UserProgress) -> Result<UserProgress>;

    fn get_user_progress(&self, study_set_id: &str, mode: StudyMode)
        -> Result<Option<UserProgress>>;

    fn list_user_progress(&self, study_set_id: &str) -> Result<Vec<UserProgress>> {
        let mut records = Vec::new();
        for mode in StudyMode::ALL {
            if let Some(progress) = self.get_user_progress(study_set_id, mode)? {
                records.push(progress);
            }
        }
        Ok(records)
    }
}

/// Picks the backend once for the life of the process. A configured database
/// that fails to open is logged and replaced by the local store.
pub fn open_store(config: &Config) -> Result<Box<dyn StudyStore>> {
    if let Some(path) = config.database_path() {
        match SqliteStore::open(&path).and_then(|store| store.init().map(|_| store)) {
            Ok(store) => {
                log::info!("Using SQLite study store at {}", path);
                return Ok(Box::new(store));
            }
            Err(e) => {
                log::error!(
                    "Failed to initialize database at {}: {}; falling back to local store",
                    path,
                    e
                );
            }
        }
    }

    log::info!("Using local study store in {}", config.data_dir.display());
    let kv = FileKeyValueStore::open(&config.data_dir)?;
    Ok(Box::new(LocalStore::new(Box::new(kv))))
}

pub(crate) fn sort_most_recent_first(sets: &mut [StudySet]) {
    sets.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
