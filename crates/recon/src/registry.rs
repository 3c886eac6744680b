//! In-memory dataset store keyed by `source::sheet` and merge keys.
//!
//! The registry is an owned value; every engine operation takes it
//! explicitly. Writes need `&mut Registry`, so a reader can never observe a
//! half-written entry. Callers sharing one registry across threads wrap it
//! in a lock.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ReconError, Result};
use crate::model::{ColumnKind, Dataset};

/// Separator between source and sheet in a primary key.
pub const KEY_SEPARATOR: &str = "::";

/// Upper bound on rows returned by [`Registry::preview`].
pub const MAX_PREVIEW_ROWS: usize = 50;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

pub fn sheet_key(source: &str, sheet: &str) -> String {
    format!("{source}{KEY_SEPARATOR}{sheet}")
}

/// Source part of a key (the whole key when it has no separator).
pub fn source_of(key: &str) -> &str {
    key.split_once(KEY_SEPARATOR).map(|(s, _)| s).unwrap_or(key)
}

/// Sheet part of a primary key.
pub fn sheet_of(key: &str) -> Option<&str> {
    key.split_once(KEY_SEPARATOR).map(|(_, s)| s)
}

/// Deterministic key for the reconciliation of two primary keys.
pub fn merge_key(target_key: &str, actual_key: &str) -> String {
    format!("merged_{}_{}", source_of(target_key), source_of(actual_key))
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// How an entry came to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    Loaded,
    Merged { target_key: String, actual_key: String },
}

impl Origin {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    dataset: Dataset,
    origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// Shape of one registry entry, for browsing surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub key: String,
    pub rows: usize,
    pub columns_count: usize,
    pub columns: Vec<ColumnInfo>,
    #[serde(flatten)]
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetPreview {
    #[serde(flatten)]
    pub info: DatasetInfo,
    pub sample_data: Vec<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Entries keep insertion order; overwriting a key keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a loaded dataset, replacing any earlier load under `key`.
    /// Returns the replaced dataset.
    pub fn insert(&mut self, key: impl Into<String>, dataset: Dataset) -> Result<Option<Dataset>> {
        let key = key.into();
        if self.origin(&key).is_some_and(Origin::is_merged) {
            return Err(ReconError::ReadOnlyKey(key));
        }
        Ok(self.put(key, dataset, Origin::Loaded))
    }

    pub fn insert_sheet(&mut self, source: &str, sheet: &str, dataset: Dataset) -> Result<Option<Dataset>> {
        self.insert(sheet_key(source, sheet), dataset)
    }

    /// Reconciliation results go through here; a later reconciliation of
    /// the same pair fully replaces the entry.
    pub(crate) fn insert_merged(&mut self, key: String, dataset: Dataset, origin: Origin) -> Option<Dataset> {
        self.put(key, dataset, origin)
    }

    fn put(&mut self, key: String, dataset: Dataset, origin: Origin) -> Option<Dataset> {
        log::info!(
            "registry: store '{}' ({} rows x {} columns)",
            key,
            dataset.row_count(),
            dataset.column_count()
        );
        match self.index.get(&key) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.origin = origin;
                Some(std::mem::replace(&mut entry.dataset, dataset))
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(Entry { key, dataset, origin });
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Dataset> {
        self.entry(key).map(|e| &e.dataset)
    }

    pub fn require(&self, key: &str) -> Result<&Dataset> {
        self.get(key).ok_or_else(|| ReconError::NotFound { key: key.to_string() })
    }

    pub fn origin(&self, key: &str) -> Option<&Origin> {
        self.entry(key).map(|e| &e.origin)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct sources of loaded entries, in insertion order.
    pub fn sources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.entries.iter().filter(|e| !e.origin.is_merged()) {
            let source = source_of(&e.key);
            if !out.contains(&source) {
                out.push(source);
            }
        }
        out
    }

    /// `(sheet, dataset)` pairs of one source, in stored order.
    pub fn sheets(&self, source: &str) -> Vec<(&str, &Dataset)> {
        self.entries
            .iter()
            .filter(|e| !e.origin.is_merged())
            .filter_map(|e| {
                let (s, sheet) = e.key.split_once(KEY_SEPARATOR)?;
                (s == source).then_some((sheet, &e.dataset))
            })
            .collect()
    }

    pub fn describe(&self, key: &str) -> Result<DatasetInfo> {
        let entry = self
            .entry(key)
            .ok_or_else(|| ReconError::NotFound { key: key.to_string() })?;
        let ds = &entry.dataset;
        Ok(DatasetInfo {
            key: entry.key.clone(),
            rows: ds.row_count(),
            columns_count: ds.column_count(),
            columns: ds
                .columns()
                .iter()
                .enumerate()
                .map(|(i, name)| ColumnInfo {
                    name: name.clone(),
                    kind: ds.column_kind(i),
                })
                .collect(),
            origin: entry.origin.clone(),
        })
    }

    /// Shape plus the first `min(rows, MAX_PREVIEW_ROWS)` rows.
    pub fn preview(&self, key: &str, rows: usize) -> Result<DatasetPreview> {
        let info = self.describe(key)?;
        let ds = self.require(key)?;
        Ok(DatasetPreview {
            info,
            sample_data: ds.head(rows.min(MAX_PREVIEW_ROWS)),
        })
    }

    pub fn list(&self) -> Vec<DatasetInfo> {
        self.entries
            .iter()
            .filter_map(|e| self.describe(&e.key).ok())
            .collect()
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }
}
