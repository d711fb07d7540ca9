// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename journal for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{PicnameError, Result};

/// A single applied rename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub undone: bool,
}

impl JournalEntry {
    pub fn new(original_path: PathBuf, new_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            undone: false,
        }
    }
}

/// Outcome of undoing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoStatus {
    Undone,
    WouldUndo,
    /// The renamed file is gone
    Missing,
    /// Something else now lives at the original path
    Occupied,
}

/// What an undo run did, entry by entry.
///
/// `error` is set when an undo stopped midway; `results` still lists every
/// entry handled before it.
#[derive(Debug)]
pub struct UndoReport {
    pub results: Vec<(JournalEntry, UndoStatus)>,
    pub error: Option<PicnameError>,
}

impl UndoReport {
    pub fn undone(&self) -> usize {
        self.results.iter().filter(|(_, s)| *s == UndoStatus::Undone).count()
    }
}

/// Append-only JSON-lines log of renames
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the journal
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all journal entries, oldest first
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Failed to parse journal entry: {}", e),
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark an entry as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if entry.id == id {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Entries that haven't been undone, oldest first
    pub fn get_undoable(&self) -> Result<Vec<JournalEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Move the `count` most recent renames back, newest first.
    ///
    /// Stops at the first rename that fails. Only reading the journal fails
    /// the whole call; anything later is reported in the [`UndoReport`].
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<UndoReport> {
        let to_undo: Vec<_> = self.get_undoable()?.into_iter().rev().take(count).collect();
        let mut report = UndoReport {
            results: Vec::with_capacity(to_undo.len()),
            error: None,
        };

        for entry in to_undo {
            let status = if !entry.new_path.exists() {
                warn!("File not found (may have been moved/deleted): {:?}", entry.new_path);
                UndoStatus::Missing
            } else if entry.original_path.exists() {
                warn!("Original path is taken, not undoing: {:?}", entry.original_path);
                UndoStatus::Occupied
            } else if dry_run {
                UndoStatus::WouldUndo
            } else {
                if let Err(source) = fs::rename(&entry.new_path, &entry.original_path) {
                    warn!("Undo of {:?} failed after {} undone: {}", entry.new_path, report.undone(), source);
                    report.error = Some(PicnameError::RenameFailed {
                        path: entry.new_path.clone(),
                        renamed: report.undone(),
                        source,
                    });
                    break;
                }
                if let Err(e) = self.mark_undone(&entry.id) {
                    warn!("Undid {:?} but could not record it: {}", entry.new_path, e);
                    report.results.push((entry, UndoStatus::Undone));
                    report.error = Some(e);
                    break;
                }
                UndoStatus::Undone
            };
            report.results.push((entry, status));
        }

        Ok(report)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
