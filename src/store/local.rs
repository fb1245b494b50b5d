use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::{sort_most_recent_first, Backend, StudyStore};
use crate::error::{Error, Result};
use crate::models::{now_millis, NewStudySet, StudyMode, StudySet, StudySetPatch, UserProgress};

const STORE_FILE_NAME: &str = "local-store.json";
const ALL_SETS_KEY: &str = "study-sets:all";
const SET_KEY_PREFIX: &str = "study-set:";
const PROGRESS_KEY_PREFIX: &str = "progress:";

fn set_key(id: &str) -> String {
    format!("{}{}", SET_KEY_PREFIX, id)
}

fn progress_key(study_set_id: &str, mode: StudyMode) -> String {
    format!("{}{}:{}", PROGRESS_KEY_PREFIX, study_set_id, mode.as_str())
}

/// String key-value storage that survives the process, in the manner of
/// browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;

    fn keys(&self) -> Vec<String>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Key-value map kept in a single JSON file. Every write re-reads the file,
/// applies the one change and rewrites it through a temporary sibling and a
/// rename, so keys written by another process in the meantime survive.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKeyValueStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE_NAME);
        let entries = read_entries(&path)?;
        Ok(Self { path, entries })
    }

    fn update(&mut self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut entries = read_entries(&self.path)?;
        let changed = change(&mut entries);
        if changed {
            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, serde_json::to_string_pretty(&entries)?)?;
            fs::rename(&tmp, &self.path)?;
        }
        self.entries = entries;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).map_err(|e| Error::Corrupt {
        key: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.update(|entries| {
            entries.insert(key, value);
            true
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// In-memory copy of everything the key-value layer holds for this store.
#[derive(Debug, Default)]
struct Mirror {
    order: Vec<String>,
    sets: HashMap<String, StudySet>,
    progress: HashMap<(String, StudyMode), UserProgress>,
}

impl Mirror {
    fn hydrate(kv: &dyn KeyValueStore) -> Result<Self> {
        let mut mirror = Mirror::default();

        let ids: Vec<String> = match kv.get(ALL_SETS_KEY) {
            Some(raw) => decode(ALL_SETS_KEY, &raw)?,
            None => Vec::new(),
        };

        for id in ids {
            let key = set_key(&id);
            let Some(raw) = kv.get(&key) else {
                log::warn!("Study set {} is indexed but missing from local store", id);
                continue;
            };
            match decode::<StudySet>(&key, &raw) {
                Ok(set) => {
                    mirror.order.push(id.clone());
                    mirror.sets.insert(id, set);
                }
                Err(e) => log::warn!("Skipping unreadable study set: {}", e),
            }
        }

        for key in kv.keys() {
            if !key.starts_with(PROGRESS_KEY_PREFIX) {
                continue;
            }
            let Some(raw) = kv.get(&key) else { continue };
            match decode::<UserProgress>(&key, &raw) {
                Ok(p) => {
                    mirror.progress.insert((p.study_set_id.clone(), p.mode), p);
                }
                Err(e) => log::warn!("Skipping unreadable progress record: {}", e),
            }
        }

        log::debug!(
            "Hydrated local store: {} sets, {} progress records",
            mirror.sets.len(),
            mirror.progress.len()
        );
        Ok(mirror)
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn ensure_hydrated<'a>(
    slot: &'a mut Option<Mirror>,
    kv: &dyn KeyValueStore,
) -> Result<&'a mut Mirror> {
    if slot.is_none() {
        *slot = Some(Mirror::hydrate(kv)?);
    }
    Ok(slot.get_or_insert_with(Mirror::default))
}

/// Fallback study store: an owned mirror over a [`KeyValueStore`], filled
/// from it on first access and written through on every change.
///
/// Writes are not transactional. A failure part way through a create or
/// delete leaves whatever keys were already written.
pub struct LocalStore {
    kv: Box<dyn KeyValueStore>,
    mirror: RefCell<Option<Mirror>>,
}

impl LocalStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            mirror: RefCell::new(None),
        }
    }

    fn write_set(&mut self, set: &StudySet) -> Result<()> {
        self.kv.set(&set_key(&set.id), serde_json::to_string(set)?)
    }

    fn write_index(&mut self, order: &[String]) -> Result<()> {
        self.kv.set(ALL_SETS_KEY, serde_json::to_string(order)?)
    }
}

impl StudyStore for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn create_study_set(&mut self, data: NewStudySet) -> Result<StudySet> {
        data.validate()?;
        let set = data.into_study_set(now_millis());

        self.write_set(&set)?;

        let mirror = ensure_hydrated(self.mirror.get_mut(), self.kv.as_ref())?;
        mirror.order.push(set.id.clone());
        mirror.sets.insert(set.id.clone(), set.clone());
        let order = mirror.order.clone();
        self.write_index(&order)?;

        log::debug!("Created study set {} in local store", set.id);
        Ok(set)
    }

    fn get_study_set(&self, id: &str) -> Result<Option<StudySet>> {
        let mut slot = self.mirror.borrow_mut();
        let mirror = ensure_hydrated(&mut slot, self.kv.as_ref())?;
        Ok(mirror.sets.get(id).cloned())
    }

    fn update_study_set(&mut self, id: &str, patch: StudySetPatch) -> Result<Option<StudySet>> {
        let mirror = ensure_hydrated(self.mirror.get_mut(), self.kv.as_ref())?;
        let Some(mut set) = mirror.sets.get(id).cloned() else {
            return Ok(None);
        };
        patch.validate()?;
        patch.apply(&mut set, now_millis());

        self.write_set(&set)?;
        let mirror = ensure_hydrated(self.mirror.get_mut(), self.kv.as_ref())?;
        mirror.sets.insert(set.id.clone(), set.clone());

        Ok(Some(set))
    }

    fn delete_study_set(&mut self, id: &str) -> Result<bool> {
        let mirror = ensure_hydrated(self.mirror.get_mut(), self.kv.as_ref())?;
        if mirror.sets.remove(id).is_none() {
            return Ok(false);
        }
        mirror.order.retain(|existing| existing != id);
        mirror.progress.retain(|(set_id, _), _| set_id != id);
        let order = mirror.order.clone();

        self.kv.remove(&set_key(id))?;
        self.write_index(&order)?;
        for mode in StudyMode::ALL {
            self.kv.remove(&progress_key(id, mode))?;
        }

        Ok(true)
    }

    fn get_all_study_sets(&self) -> Result<Vec<StudySet>> {
        let mut slot = self.mirror.borrow_mut();
        let mirror = ensure_hydrated(&mut slot, self.kv.as_ref())?;
        let mut sets: Vec<StudySet> = mirror
            .order
            .iter()
            .filter_map(|id| mirror.sets.get(id).cloned())
            .collect();
        sort_most_recent_first(&mut sets);
        Ok(sets)
    }

    fn save_user_progress(&mut self, progress: UserProgress) -> Result<UserProgress> {
        self.kv.set(
            &progress_key(&progress.study_set_id, progress.mode),
            serde_json::to_string(&progress)?,
        )?;

        let mirror = ensure_hydrated(self.mirror.get_mut(), self.kv.as_ref())?;
        mirror.progress.insert(
            (progress.study_set_id.clone(), progress.mode),
            progress.clone(),
        );
        Ok(progress)
    }

    fn get_user_progress(
        &self,
        study_set_id: &str,
        mode: StudyMode,
    ) -> Result<Option<UserProgress>> {
        let mut slot = self.mirror.borrow_mut();
        let mirror = ensure_hydrated(&mut slot, self.kv.as_ref())?;
        Ok(mirror
            .progress
            .get(&(study_set_id.to_string(), mode))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewStudyItem, SourceType};
    use tempfile::TempDir;

    fn capitals() -> NewStudySet {
        NewStudySet {
            title: "Capitals".into(),
            description: String::new(),
            items: vec![
                NewStudyItem::new("France", "Paris"),
                NewStudyItem::new("Japan", "Tokyo"),
            ],
            source_type: SourceType::Manual,
            source_name: None,
        }
    }

    fn open_file_store(dir: &TempDir) -> LocalStore {
        let kv = FileKeyValueStore::open(dir.path()).expect("Failed to open file store");
        LocalStore::new(Box::new(kv))
    }

    mod layout_tests {
        use super::*;

        #[test]
        fn create_writes_set_and_index_keys() {
            let dir = TempDir::new().unwrap();
            let set = open_file_store(&dir).create_study_set(capitals()).unwrap();

            let kv = FileKeyValueStore::open(dir.path()).unwrap();
            let index: Vec<String> = serde_json::from_str(&kv.get(ALL_SETS_KEY).unwrap()).unwrap();
            assert_eq!(index, vec![set.id.clone()]);

            let stored: StudySet =
                serde_json::from_str(&kv.get(&format!("study-set:{}", set.id)).unwrap()).unwrap();
            assert_eq!(stored, set);
        }

        #[test]
        fn progress_key_layout() {
            let dir = TempDir::new().unwrap();
            let mut store = open_file_store(&dir);
            let set = store.create_study_set(capitals()).unwrap();
            store
                .save_user_progress(UserProgress::empty(&set.id, StudyMode::Write, 9))
                .unwrap();

            let kv = FileKeyValueStore::open(dir.path()).unwrap();
            assert!(kv.get(&format!("progress:{}:write", set.id)).is_some());
        }

        #[test]
        fn delete_removes_companion_keys() {
            let dir = TempDir::new().unwrap();
            let mut store = open_file_store(&dir);
            let set = store.create_study_set(capitals()).unwrap();
            store
                .save_user_progress(UserProgress::empty(&set.id, StudyMode::Quiz, 1))
                .unwrap();

            assert!(store.delete_study_set(&set.id).unwrap());

            let kv = FileKeyValueStore::open(dir.path()).unwrap();
            assert!(kv.get(&set_key(&set.id)).is_none());
            assert!(kv.get(&progress_key(&set.id, StudyMode::Quiz)).is_none());
            assert_eq!(kv.get(ALL_SETS_KEY).as_deref(), Some("[]"));
        }
    }

    mod reload_tests {
        use super::*;

        #[test]
        fn created_set_survives_reload() {
            let dir = TempDir::new().unwrap();
            let created = {
                let mut store = open_file_store(&dir);
                store.create_study_set(capitals()).unwrap()
            };

            let reloaded = open_file_store(&dir);
            let sets = reloaded.get_all_study_sets().unwrap();
            assert_eq!(sets, vec![created]);
        }

        #[test]
        fn progress_survives_reload() {
            let dir = TempDir::new().unwrap();
            let set_id = {
                let mut store = open_file_store(&dir);
                let set = store.create_study_set(capitals()).unwrap();
                let mut progress = UserProgress::empty(&set.id, StudyMode::Learn, 5);
                progress.correct_answers = 4;
                store.save_user_progress(progress).unwrap();
                set.id
            };

            let reloaded = open_file_store(&dir);
            let progress = reloaded
                .get_user_progress(&set_id, StudyMode::Learn)
                .unwrap()
                .unwrap();
            assert_eq!(progress.correct_answers, 4);
        }

        #[test]
        fn missing_indexed_set_is_skipped() {
            let mut kv = MemoryKeyValueStore::default();
            kv.set(ALL_SETS_KEY, r#"["ghost"]"#.to_string()).unwrap();

            let store = LocalStore::new(Box::new(kv));
            assert!(store.get_all_study_sets().unwrap().is_empty());
        }

        #[test]
        fn unreadable_set_is_skipped() {
            let mut kv = MemoryKeyValueStore::default();
            kv.set(ALL_SETS_KEY, r#"["bad"]"#.to_string()).unwrap();
            kv.set("study-set:bad", "{not json".to_string()).unwrap();

            let store = LocalStore::new(Box::new(kv));
            assert!(store.get_all_study_sets().unwrap().is_empty());
        }

        #[test]
        fn corrupt_index_is_an_error() {
            let mut kv = MemoryKeyValueStore::default();
            kv.set(ALL_SETS_KEY, "oops".to_string()).unwrap();

            let store = LocalStore::new(Box::new(kv));
            assert!(matches!(
                store.get_all_study_sets(),
                Err(Error::Corrupt { .. })
            ));
        }

        #[test]
        fn corrupt_store_file_is_an_error() {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join(STORE_FILE_NAME), "[1, 2").unwrap();
            assert!(FileKeyValueStore::open(dir.path()).is_err());
        }

        #[test]
        fn concurrent_handles_keep_each_others_keys() {
            let dir = TempDir::new().unwrap();
            let mut first = FileKeyValueStore::open(dir.path()).unwrap();
            let mut second = FileKeyValueStore::open(dir.path()).unwrap();

            first.set("study-set:a", "1".to_string()).unwrap();
            second.set("study-set:b", "2".to_string()).unwrap();
            first.remove("study-set:missing").unwrap();

            let kv = FileKeyValueStore::open(dir.path()).unwrap();
            assert_eq!(kv.get("study-set:a").as_deref(), Some("1"));
            assert_eq!(kv.get("study-set:b").as_deref(), Some("2"));
            assert_eq!(first.keys(), vec!["study-set:a", "study-set:b"]);
        }

        #[test]
        fn empty_store_file_opens() {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join(STORE_FILE_NAME), "").unwrap();
            let kv = FileKeyValueStore::open(dir.path()).unwrap();
            assert!(kv.keys().is_empty());
        }
    }
}
