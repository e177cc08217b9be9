//! Manifest model: parsing DAP link lists into keyed download items.
//!
//! A manifest is a line-oriented text file. `https...` lines set the current
//! URL and each following `dir=<path>` (or blank) line emits one
//! [`DownloadItem`]. Items are keyed by the URL path after the project prefix
//! and kept in first-seen order with a key index for lookups.

mod error;
mod filter;
mod item;
mod parse;
mod sanitize;

pub use error::{FilterError, ItemError, ManifestError};
pub use filter::KeyFilter;
pub use item::{Collapse, DownloadItem};
pub use parse::parse_manifest;
pub use sanitize::strip_spaces;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// What to do when two manifest entries derive the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The later entry replaces the earlier one (keeping its position).
    #[default]
    Overwrite,
    /// A repeated key is a manifest error.
    Reject,
}

/// Ordered download items with a key index.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<DownloadItem>,
    index: HashMap<String, usize>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DownloadItem> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[DownloadItem] {
        &self.items
    }

    /// Mutable access for the fetcher; keys must not be changed through it.
    pub fn items_mut(&mut self) -> &mut [DownloadItem] {
        &mut self.items
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.key.as_str())
    }

    pub fn into_items(self) -> Vec<DownloadItem> {
        self.items
    }

    /// Adds an item, resolving a key collision according to `policy`.
    fn insert(
        &mut self,
        item: DownloadItem,
        line: usize,
        policy: DuplicatePolicy,
    ) -> Result<(), ManifestError> {
        match self.index.get(&item.key) {
            Some(&existing) => match policy {
                DuplicatePolicy::Overwrite => {
                    tracing::warn!(key = %item.key, line, "duplicate key, later entry wins");
                    self.items[existing] = item;
                }
                DuplicatePolicy::Reject => {
                    return Err(ManifestError::DuplicateKey {
                        line,
                        key: item.key,
                    });
                }
            },
            None => {
                self.index.insert(item.key.clone(), self.items.len());
                self.items.push(item);
            }
        }
        Ok(())
    }

    /// Drops every item whose key does not match `filter`. Returns the number removed.
    pub fn retain_matching(&mut self, filter: &KeyFilter) -> usize {
        let before = self.items.len();
        self.items.retain(|item| filter.matches(&item.key));
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key.clone(), i))
            .collect();
        before - self.items.len()
    }
}

/// Reads and parses a manifest file.
pub fn read_manifest(
    path: &Path,
    collapse: Collapse,
    duplicates: DuplicatePolicy,
) -> Result<Manifest, ManifestError> {
    let text = std::fs::read_to_string(path)?;
    parse_manifest(&text, collapse, duplicates)
}
