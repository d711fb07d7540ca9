// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Destination collision handling

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Return `candidate`, or the first `name (n).ext` variant not yet planned.
///
/// `n` counts up from 1 and the marker goes before the last extension, so
/// `42.jpg.png` becomes `42.jpg (1).png`.
pub fn resolve_collision(candidate: &Path, planned: &HashSet<PathBuf>) -> PathBuf {
    if !planned.contains(candidate) {
        return candidate.to_path_buf();
    }

    let file_name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let path = candidate.with_file_name(numbered_name(&file_name, n));
        if !planned.contains(&path) {
            return path;
        }
        n += 1;
    }
}

fn numbered_name(file_name: &str, n: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((base, ext)) => format!("{} ({}).{}", base, n, ext),
        None => format!("{} ({})", file_name, n),
    }
}
