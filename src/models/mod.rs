use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::AppError;

pub const ITEM_COUNT: usize = 12;
pub const TOTAL_KEY: &str = "totalvotes";
pub const SELECTION_SIZE: usize = 3;

pub const LANGUAGES: [&str; 3] = ["en", "he", "ar"];
pub const DEFAULT_LANGUAGE: &str = "en";

lazy_static! {
    // Language tags end up in file names, so nothing outside this shape gets through.
    static ref LANGUAGE_RE: Regex = Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u8);

impl ItemId {
    pub fn all() -> impl Iterator<Item = ItemId> {
        (1..=ITEM_COUNT as u8).map(ItemId)
    }

    pub fn parse(key: &str) -> Option<ItemId> {
        let number: u8 = key.strip_prefix("item")?.parse().ok()?;
        // Reject "item01" and friends so the key round-trips exactly
        if (1..=ITEM_COUNT as u8).contains(&number) && key == format!("item{}", number) {
            Some(ItemId(number))
        } else {
            None
        }
    }

    pub fn key(&self) -> String {
        format!("item{}", self.0)
    }

    fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item{}", self.0)
    }
}

// `total` counts submissions, not item increments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteRecord {
    counts: [u64; ITEM_COUNT],
    pub total: u64,
}

impl VoteRecord {
    pub fn count(&self, item: ItemId) -> u64 {
        self.counts[item.index()]
    }

    pub fn set_count(&mut self, item: ItemId, count: u64) {
        self.counts[item.index()] = count;
    }

    pub fn increment(&mut self, item: ItemId) {
        self.counts[item.index()] += 1;
    }

    pub fn item_sum(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u64)> + '_ {
        ItemId::all().map(move |item| (item, self.count(item)))
    }
}

impl Serialize for VoteRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ITEM_COUNT + 1))?;
        for (item, count) in self.iter() {
            map.serialize_entry(&item.key(), &count)?;
        }
        map.serialize_entry(TOTAL_KEY, &self.total)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for VoteRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = VoteRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of item counters and totalvotes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VoteRecord, A::Error> {
                let mut record = VoteRecord::default();
                while let Some(key) = access.next_key::<String>()? {
                    if key == TOTAL_KEY {
                        record.total = access.next_value()?;
                    } else if let Some(item) = ItemId::parse(&key) {
                        record.set_count(item, access.next_value()?);
                    } else {
                        // Unknown keys are carried by older files; skip them
                        access.next_value::<serde::de::IgnoredAny>()?;
                    }
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

// Unknown ids are kept so the selection size matches what was sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectedItem {
    Known(ItemId),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    items: Vec<SelectedItem>,
}

impl Selection {
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Result<Self, AppError> {
        let distinct: HashSet<&str> = raw.iter().map(|s| s.as_ref()).collect();
        if raw.len() != SELECTION_SIZE || distinct.len() != SELECTION_SIZE {
            return Err(AppError::InvalidSelection { got: raw.len() });
        }

        let items = raw
            .iter()
            .map(|s| match ItemId::parse(s.as_ref()) {
                Some(item) => SelectedItem::Known(item),
                None => SelectedItem::Unknown(s.as_ref().to_string()),
            })
            .collect();

        Ok(Self { items })
    }

    pub fn known(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().filter_map(|entry| match entry {
            SelectedItem::Known(item) => Some(*item),
            SelectedItem::Unknown(_) => None,
        })
    }

    pub fn unknown(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().filter_map(|entry| match entry {
            SelectedItem::Unknown(raw) => Some(raw.as_str()),
            SelectedItem::Known(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if LANGUAGE_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::InvalidLanguage(raw.to_string()))
        }
    }

    pub fn default_language() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }

    pub fn known() -> impl Iterator<Item = LanguageCode> {
        LANGUAGES.iter().map(|code| LanguageCode(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_LANGUAGE
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_parse_only_canonical_keys() {
        assert_eq!(ItemId::parse("item1").map(|i| i.key()), Some("item1".to_string()));
        assert_eq!(ItemId::parse("item12").map(|i| i.key()), Some("item12".to_string()));
        assert!(ItemId::parse("item0").is_none());
        assert!(ItemId::parse("item13").is_none());
        assert!(ItemId::parse("item01").is_none());
        assert!(ItemId::parse("totalvotes").is_none());
        assert_eq!(ItemId::all().count(), ITEM_COUNT);
    }

    #[test]
    fn record_serializes_with_fixed_keys_in_order() {
        let mut record = VoteRecord::default();
        record.set_count(ItemId::parse("item2").unwrap(), 7);
        record.total = 3;

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"item1":0,"item2":7,"item3":0"#));
        assert!(json.ends_with(r#""item12":0,"totalvotes":3}"#));
    }

    #[test]
    fn record_deserialization_tolerates_missing_and_extra_keys() {
        let record: VoteRecord =
            serde_json::from_str(r#"{"item3": 4, "legacy": "x", "totalvotes": 2}"#).unwrap();
        assert_eq!(record.count(ItemId::parse("item3").unwrap()), 4);
        assert_eq!(record.count(ItemId::parse("item1").unwrap()), 0);
        assert_eq!(record.total, 2);
        assert_eq!(record.item_sum(), 4);
    }

    #[test]
    fn selection_requires_three_distinct_entries() {
        assert!(Selection::new(&["item1", "item2"]).is_err());
        assert!(Selection::new(&["item1", "item2", "item3", "item4"]).is_err());
        assert!(Selection::new(&["item1", "item1", "item2"]).is_err());

        let selection = Selection::new(&["item1", "bogus", "item5"]).unwrap();
        let known: Vec<String> = selection.known().map(|i| i.key()).collect();
        assert_eq!(known, vec!["item1", "item5"]);
        assert_eq!(selection.unknown().collect::<Vec<_>>(), vec!["bogus"]);
    }

    #[test]
    fn language_codes_reject_path_like_input() {
        assert!(LanguageCode::parse("en").is_ok());
        assert!(LanguageCode::parse("pt-BR").is_ok());
        assert!(LanguageCode::parse("../en").is_err());
        assert!(LanguageCode::parse("").is_err());
        assert!(LanguageCode::parse("en.json").is_err());
        assert!(LanguageCode::default_language().is_default());
    }
}
