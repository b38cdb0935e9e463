use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::TranslationError;
use crate::models::{ItemId, LanguageCode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TranslationTable {
    entries: BTreeMap<String, String>,
}

impl TranslationTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    // Untranslated items read `Item itemN`.
    pub fn label(&self, item: ItemId) -> String {
        let key = item.key();
        match self.get(&key) {
            Some(label) => label.to_string(),
            None => format!("Item {}", key),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, String>> for TranslationTable {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

pub fn load_table(dir: &Path, language: &LanguageCode) -> Result<TranslationTable, TranslationError> {
    let path = dir.join(format!("{}.json", language));

    let contents = fs::read_to_string(&path).map_err(|source| TranslationError::Io {
        path: path.clone(),
        source,
    })?;

    let entries: BTreeMap<String, String> =
        serde_json::from_str(&contents).map_err(|source| TranslationError::Parse { path, source })?;

    Ok(TranslationTable::from(entries))
}

// Requested language, then the default language, then an empty table.
pub fn resolve_table(dir: &Path, language: &LanguageCode) -> TranslationTable {
    match load_table(dir, language) {
        Ok(table) => return table,
        Err(e) => warn!("{}; falling back to default language", e),
    }

    if language.is_default() {
        return TranslationTable::default();
    }

    load_table(dir, &LanguageCode::default_language()).unwrap_or_else(|e| {
        warn!("{}; item labels will be placeholders", e);
        TranslationTable::default()
    })
}
