// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Applying a rename plan to disk

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::history::{Journal, JournalEntry};
use crate::plan::{PlanEntry, RenamePlan};
use crate::{PicnameError, Result};

/// Plan entries in the order they can be renamed safely.
///
/// Plan order is kept, except that an entry whose destination is still the
/// source of a pending entry waits until that source has moved.
fn execution_order(plan: &RenamePlan) -> Vec<&PlanEntry> {
    let mut pending: Vec<&PlanEntry> = plan.iter().collect();
    let mut sources: HashSet<&Path> = pending.iter().map(|e| e.original.as_path()).collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|e| !sources.contains(e.destination.as_path()))
            // Only a cycle is left; take it in plan order and let the rename report it
            .unwrap_or(0);
        let entry = pending.remove(ready);
        sources.remove(entry.original.as_path());
        ordered.push(entry);
    }

    ordered
}

/// A destination that only differs from the source by case is the same file
/// on case-insensitive file systems
fn same_name_ignoring_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
}

fn rename_entry(entry: &PlanEntry) -> io::Result<()> {
    if entry.destination.exists() && !same_name_ignoring_case(&entry.original, &entry.destination) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{:?} already exists", entry.destination),
        ));
    }
    std::fs::rename(&entry.original, &entry.destination)
}

/// Rename every file in `plan`, returning how many were renamed.
///
/// Stops at the first entry that cannot be renamed and reports it as
/// [`PicnameError::RenameFailed`] together with the number renamed so far.
/// Nothing is rolled back. Successful renames are recorded in `journal`.
pub fn apply(plan: &RenamePlan, journal: Option<&Journal>) -> Result<usize> {
    let mut renamed = 0;

    for entry in execution_order(plan) {
        if let Err(source) = rename_entry(entry) {
            warn!("Rename of {:?} failed after {} renames: {}", entry.original, renamed, source);
            return Err(PicnameError::RenameFailed {
                path: entry.original.clone(),
                renamed,
                source,
            });
        }
        renamed += 1;
        info!("Renamed {:?} -> {:?}", entry.original, entry.destination);

        if let Some(journal) = journal {
            let record = JournalEntry::new(entry.original.clone(), entry.destination.clone());
            if let Err(e) = journal.append(&record) {
                warn!("Failed to record rename in journal: {}", e);
            }
        }
    }

    Ok(renamed)
}

/// Paths of files renamed by a failed [`apply`], for reporting
pub fn renamed_before(plan: &RenamePlan, failed: &Path) -> Vec<PathBuf> {
    execution_order(plan)
        .into_iter()
        .take_while(|e| e.original != failed)
        .map(|e| e.original.clone())
        .collect()
}
