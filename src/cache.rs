// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Persistent cache of remotely resolved titles

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

/// Maps an external identifier to its raw (not yet normalized) title.
///
/// Entries are only ever added during a pass; [`ResolverCache::flush`] writes
/// the whole map back to disk.
#[derive(Debug, Default)]
pub struct ResolverCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ResolverCache {
    /// A cache that is never written anywhere
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache file, starting empty if it is missing or unreadable
    pub fn load(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("No valid title cache in {:?} ({}), starting from scratch", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} cached titles from {:?}", entries.len(), path);
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, id: impl Into<String>, raw_title: impl Into<String>) {
        self.entries.insert(id.into(), raw_title.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop every entry (the file is rewritten on the next flush)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write the cache to its file, if it has one
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, content)?;
        debug!("Saved {} cached titles to {:?}", self.entries.len(), path);
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
