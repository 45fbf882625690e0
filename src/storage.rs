use crate::model::{AppData, DeckSet, NoteBook, PomodoroStats, Profile, ThemeMode, TodoList};
use directories::ProjectDirs;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub const KEY_USERNAME: &str = "username";
pub const KEY_AGE: &str = "age";
pub const KEY_PURPOSES: &str = "purposes";
pub const KEY_TODOS: &str = "todos";
pub const KEY_DECKS: &str = "decks";
pub const KEY_NOTES: &str = "notes";
pub const KEY_STATS: &str = "pomodoro-stats";
pub const KEY_THEME: &str = "theme";

/// Every key the application recognizes; `clear` removes exactly these.
pub const KEYS: [&str; 8] = [
    KEY_USERNAME,
    KEY_AGE,
    KEY_PURPOSES,
    KEY_TODOS,
    KEY_DECKS,
    KEY_NOTES,
    KEY_STATS,
    KEY_THEME,
];

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encode: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no data directory available")]
    NoDataDir,
}

/// Synchronous key-value storage. Values are serialized JSON text; keys are
/// the fixed identifiers above.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Removes all recognized keys. Irreversible; callers gate this behind
    /// an explicit confirmation.
    fn clear(&mut self) -> Result<(), StorageError> {
        for key in KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// One `<key>.json` file per key under the platform data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn open() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("", "", "daybook").ok_or(StorageError::NoDataDir)?;
        FileStore::new(dirs.data_dir())
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store: the injected test seam, no filesystem involved.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemStore(std::collections::BTreeMap<String, String>);

#[cfg(test)]
impl Store for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.0.remove(key);
        Ok(())
    }
}

/// Returns the stored value, or `default` when the key is absent or the
/// stored text does not parse. Never fails: an unreadable value behaves
/// exactly like a missing one (and is logged, since it means data loss).
pub fn load<T: DeserializeOwned>(store: &dyn Store, key: &str, default: T) -> T {
    let Some(raw) = store.get(key) else {
        return default;
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("discarding unreadable value under \"{key}\": {err}");
            default
        }
    }
}

/// Serializes and writes one key. Failure is reported, not retried; the
/// caller's in-memory state stays authoritative either way.
pub fn save<T: Serialize>(store: &mut dyn Store, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

pub fn load_app_data(store: &dyn Store) -> AppData {
    AppData {
        profile: load_profile(store),
        todos: load(store, KEY_TODOS, TodoList::default()),
        decks: load(store, KEY_DECKS, DeckSet::default()),
        notes: load(store, KEY_NOTES, NoteBook::default()),
        stats: load(store, KEY_STATS, PomodoroStats::default()),
        theme: load(store, KEY_THEME, ThemeMode::default()),
    }
}

pub fn load_profile(store: &dyn Store) -> Profile {
    Profile {
        name: load(store, KEY_USERNAME, String::new()),
        age: load(store, KEY_AGE, String::new()),
        purposes: load(store, KEY_PURPOSES, Vec::new()),
    }
}

pub fn save_profile(store: &mut dyn Store, profile: &Profile) -> Result<(), StorageError> {
    save(store, KEY_USERNAME, &profile.name)?;
    save(store, KEY_AGE, &profile.age)?;
    save(store, KEY_PURPOSES, &profile.purposes)
}

pub fn save_todos(store: &mut dyn Store, todos: &TodoList) -> Result<(), StorageError> {
    save(store, KEY_TODOS, todos)
}

pub fn save_decks(store: &mut dyn Store, decks: &DeckSet) -> Result<(), StorageError> {
    save(store, KEY_DECKS, decks)
}

pub fn save_notes(store: &mut dyn Store, notes: &NoteBook) -> Result<(), StorageError> {
    save(store, KEY_NOTES, notes)
}

pub fn save_stats(store: &mut dyn Store, stats: &PomodoroStats) -> Result<(), StorageError> {
    save(store, KEY_STATS, stats)
}

pub fn save_theme(store: &mut dyn Store, theme: ThemeMode) -> Result<(), StorageError> {
    save(store, KEY_THEME, &theme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_yields_default() {
        let store = MemStore::default();
        let todos: TodoList = load(&store, KEY_TODOS, TodoList::default());
        assert!(todos.is_empty());
    }

    #[test]
    fn unparseable_value_yields_default() {
        let mut store = MemStore::default();
        store.set(KEY_TODOS, "{not json").unwrap();
        let todos: TodoList = load(&store, KEY_TODOS, TodoList::default());
        assert!(todos.is_empty());
    }

    #[test]
    fn wrong_shape_yields_default() {
        let mut store = MemStore::default();
        store.set(KEY_STATS, "[1,2,3]").unwrap();
        let stats: PomodoroStats = load(&store, KEY_STATS, PomodoroStats::default());
        assert_eq!(stats, PomodoroStats::default());
    }

    #[test]
    fn persisted_collection_equals_in_memory_after_each_mutation() {
        let mut store = MemStore::default();
        let mut todos = TodoList::default();

        todos.add("one").unwrap();
        save_todos(&mut store, &todos).unwrap();
        let reloaded: TodoList = load(&store, KEY_TODOS, TodoList::default());
        assert_eq!(reloaded.iter().collect::<Vec<_>>(), vec!["one"]);

        todos.add("two").unwrap();
        todos.remove(0);
        save_todos(&mut store, &todos).unwrap();
        let reloaded: TodoList = load(&store, KEY_TODOS, TodoList::default());
        assert_eq!(reloaded.iter().collect::<Vec<_>>(), vec!["two"]);
    }

    #[test]
    fn decks_round_trip_through_json() {
        let mut store = MemStore::default();
        let mut decks = DeckSet::default();
        decks.create("spanish").unwrap();
        decks.add_card("spanish", "hola", "hello").unwrap();
        save_decks(&mut store, &decks).unwrap();

        let reloaded: DeckSet = load(&store, KEY_DECKS, DeckSet::default());
        assert_eq!(reloaded.cards("spanish").unwrap()[0].front, "hola");
    }

    #[test]
    fn theme_serializes_as_lowercase_name() {
        let mut store = MemStore::default();
        save_theme(&mut store, ThemeMode::Dark).unwrap();
        assert_eq!(store.get(KEY_THEME).as_deref(), Some("\"dark\""));
        assert_eq!(
            load::<ThemeMode>(&store, KEY_THEME, ThemeMode::default()),
            ThemeMode::Dark
        );
    }

    #[test]
    fn file_store_round_trips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        let mut data = AppData::default();
        data.profile = Profile {
            name: "ada".to_string(),
            age: "30".to_string(),
            purposes: vec!["study".to_string(), "work".to_string()],
        };
        data.todos.add("water the plants").unwrap();
        data.decks.create("spanish").unwrap();
        data.decks.add_card("spanish", "hola", "hello").unwrap();
        data.notes.save(42, "note", "<b>body</b>", "tag", true).unwrap();
        data.stats.record_session(1500);
        data.theme = ThemeMode::Dark;

        save_profile(&mut store, &data.profile).unwrap();
        save_todos(&mut store, &data.todos).unwrap();
        save_decks(&mut store, &data.decks).unwrap();
        save_notes(&mut store, &data.notes).unwrap();
        save_stats(&mut store, &data.stats).unwrap();
        save_theme(&mut store, data.theme).unwrap();

        // a second store over the same directory sees the same state
        let reopened = FileStore::new(dir.path()).unwrap();
        let loaded = load_app_data(&reopened);
        assert_eq!(loaded.profile, data.profile);
        assert_eq!(
            loaded.todos.iter().collect::<Vec<_>>(),
            data.todos.iter().collect::<Vec<_>>()
        );
        assert_eq!(loaded.decks.cards("spanish"), data.decks.cards("spanish"));
        assert_eq!(loaded.notes.get(42), data.notes.get(42));
        assert_eq!(loaded.stats, data.stats);
        assert_eq!(loaded.theme, ThemeMode::Dark);
    }

    #[test]
    fn file_store_treats_corrupt_files_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("todos.json"), "{oops").unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let todos: TodoList = load(&store, KEY_TODOS, TodoList::default());
        assert!(todos.is_empty());
    }

    #[test]
    fn first_run_yields_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let data = load_app_data(&store);
        assert!(!data.profile.is_onboarded());
        assert!(data.todos.is_empty());
        assert!(data.decks.is_empty());
        assert!(data.notes.is_empty());
        assert_eq!(data.stats, PomodoroStats::default());
        assert_eq!(data.theme, ThemeMode::Light);
    }

    #[test]
    fn file_store_clear_removes_the_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        let mut todos = TodoList::default();
        todos.add("task").unwrap();
        save_todos(&mut store, &todos).unwrap();
        assert!(dir.path().join("todos.json").exists());

        store.clear().unwrap();
        assert!(!dir.path().join("todos.json").exists());
        assert!(store.get(KEY_TODOS).is_none());
    }

    #[test]
    fn clear_removes_every_recognized_key() {
        let mut store = MemStore::default();
        let mut todos = TodoList::default();
        todos.add("task").unwrap();
        save_todos(&mut store, &todos).unwrap();
        save_theme(&mut store, ThemeMode::Dark).unwrap();
        save_profile(
            &mut store,
            &Profile {
                name: "ada".to_string(),
                age: "30".to_string(),
                purposes: vec!["study".to_string()],
            },
        )
        .unwrap();

        store.clear().unwrap();
        for key in KEYS {
            assert!(store.get(key).is_none(), "key {key} survived clear");
        }
    }
}
