//! Durable record of which competitions were already announced.
//!
//! The on-disk format is a bare JSON array of event ids. Order carries no
//! meaning; ids are written sorted so the file diffs cleanly.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use ctftime_source::EventId;
use thiserror::Error;
use tracing::{error, info, warn};

/// Default state file location, relative to the working directory.
pub const DEFAULT_KNOWN_EVENTS_FILE: &str = "data/known_events.json";

const TEMP_SUFFIX: &str = ".tmp";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed state file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Set of announced event ids. Ids are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownEvents {
    ids: BTreeSet<EventId>,
}

impl KnownEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    /// Mark an id as announced. Returns `true` if it was not known before.
    pub fn insert(&mut self, id: EventId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EventId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<EventId> for KnownEvents {
    fn from_iter<I: IntoIterator<Item = EventId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Persistence for [`KnownEvents`]. Only the pipeline writes.
pub trait KnownEventStore: Send + Sync {
    /// Read the persisted set. `Ok(None)` when nothing was ever saved.
    fn load(&self) -> StoreResult<Option<KnownEvents>>;

    /// Replace the persisted set.
    fn save(&self, known: &KnownEvents) -> StoreResult<()>;
}

/// Load the persisted set for process start.
///
/// A missing file yields an empty set and an empty file is written right
/// away. An unreadable or malformed file is logged and treated as empty, but
/// left on disk untouched until the next successful save.
pub fn load_or_init<K: KnownEventStore + ?Sized>(store: &K) -> KnownEvents {
    match store.load() {
        Ok(Some(known)) => {
            info!(count = known.len(), "Loaded known events");
            known
        }
        Ok(None) => {
            info!("No known events found, creating an empty state file");
            let known = KnownEvents::new();
            if let Err(e) = store.save(&known) {
                error!(error = %e, "Failed to create state file");
            }
            known
        }
        Err(e) => {
            error!(error = %e, "Failed to load known events, starting empty");
            warn!("Events announced before this restart may be announced again");
            KnownEvents::new()
        }
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Temp file + rename so a crash mid-write never leaves a truncated file.
    fn atomic_write(&self, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        fs::rename(&temp_path, &self.path)
    }
}

impl KnownEventStore for JsonFileStore {
    fn load(&self) -> StoreResult<Option<KnownEvents>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let ids: Vec<EventId> = serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(ids.into_iter().collect()))
    }

    fn save(&self, known: &KnownEvents) -> StoreResult<()> {
        let ids: Vec<EventId> = known.iter().collect();
        let json = serde_json::to_vec(&ids).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        self.atomic_write(&json).map_err(|e| self.io_error(e))?;
        info!(count = known.len(), path = %self.path.display(), "Saved known events");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use testing::MemoryStore;

    fn ids(values: &[u64]) -> KnownEvents {
        values.iter().copied().map(EventId).collect()
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut known = KnownEvents::new();
        assert!(known.insert(EventId(1)));
        assert!(!known.insert(EventId(1)));
        assert!(known.contains(EventId(1)));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_save_then_load_is_order_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("known_events.json"));

        store.save(&ids(&[3, 1, 2])).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, ids(&[1, 2, 3]));
    }

    #[test]
    fn test_load_accepts_unsorted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_events.json");
        fs::write(&path, "[2500, 17, 900]").unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded, ids(&[17, 900, 2500]));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("known_events.json");
        let store = JsonFileStore::new(&path);

        store.save(&ids(&[5])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[5]");
        assert!(!path.with_file_name("known_events.json.tmp").exists());
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_events.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[test]
    fn test_load_or_init_writes_empty_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("known_events.json");
        let store = JsonFileStore::new(&path);

        let known = load_or_init(&store);
        assert!(known.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_load_or_init_keeps_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_events.json");
        fs::write(&path, "garbage").unwrap();

        let known = load_or_init(&JsonFileStore::new(&path));
        assert!(known.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn test_load_or_init_existing_set_does_not_write() {
        let store = MemoryStore::with(ids(&[1, 2]));
        let known = load_or_init(&store);
        assert_eq!(known, ids(&[1, 2]));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_load_or_init_survives_failed_bootstrap_write() {
        let store = MemoryStore {
            fail_saves: true,
            ..MemoryStore::default()
        };
        let known = load_or_init(&store);
        assert!(known.is_empty());
        assert_eq!(store.save_count(), 1);
    }
}
