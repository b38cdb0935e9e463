use log::{info, warn};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::{Selection, VoteRecord};
use crate::voting::apply_selections;

// No locking: two racing `apply` calls can lose an increment.
pub trait VoteStore: Send + Sync {
    // Zero record when nothing usable is persisted.
    fn load(&self) -> VoteRecord;

    fn save(&self, record: &VoteRecord) -> Result<(), StoreError>;

    fn apply(&self, selection: &Selection) -> Result<VoteRecord, StoreError> {
        let next = apply_selections(&self.load(), selection);
        self.save(&next)?;
        Ok(next)
    }
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl VoteStore for JsonFileStore {
    fn load(&self) -> VoteRecord {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No vote file at {}, starting from zero", self.path.display());
                return VoteRecord::default();
            }
            Err(e) => {
                warn!("Failed to read vote file {}: {}", self.path.display(), e);
                return VoteRecord::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Vote file {} is corrupt, starting from zero: {}", self.path.display(), e);
            VoteRecord::default()
        })
    }

    fn save(&self, record: &VoteRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Four-space indentation keeps the file diff-friendly with hand edits
        let mut buf = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        record.serialize(&mut serializer)?;

        fs::write(&self.path, buf).map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_zero_record() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("votes.json"));
        assert_eq!(store.load(), VoteRecord::default());
    }

    #[test]
    fn corrupt_file_loads_zero_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("votes.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert_eq!(store.load(), VoteRecord::default());
    }

    #[test]
    fn save_then_load_keeps_counts() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("votes.json"));

        let mut record = VoteRecord::default();
        record.set_count(ItemId::parse("item7").unwrap(), 5);
        record.total = 2;
        store.save(&record).unwrap();

        assert_eq!(store.load(), record);
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n    \"item7\": 5,"));
    }

    #[test]
    fn apply_persists_each_submission() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("votes.json"));
        let selection = Selection::new(&["item1", "item2", "item3"]).unwrap();

        store.apply(&selection).unwrap();
        let record = store.apply(&selection).unwrap();

        assert_eq!(record.total, 2);
        assert_eq!(record.count(ItemId::parse("item2").unwrap()), 2);
        assert_eq!(store.load(), record);
    }
}
