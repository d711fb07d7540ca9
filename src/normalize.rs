// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filename normalization
//!
//! Turns a raw image filename into a tidy one: separators collapsed into the
//! configured delimiter, optional word capitalization, lower-case extension.

use crate::config::{Delimiter, Settings};
use crate::{PicnameError, Result};

/// Extensions recognized as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "tga", "gif"];

/// Check whether a filename ends in a recognized image extension
pub fn is_image(filename: &str) -> bool {
    match split_extension(filename) {
        Some((_, ext)) => IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Split at the last `.` into (base, extension)
pub fn split_extension(filename: &str) -> Option<(&str, &str)> {
    filename.rsplit_once('.')
}

/// Compute the normalized name for `filename`.
///
/// Fails with [`PicnameError::NoExtension`] when there is no `.` at all and with
/// [`PicnameError::NotAnImage`] when the extension is not an image one.
pub fn normalize(filename: &str, settings: &Settings) -> Result<String> {
    let (base, ext) = split_extension(filename)
        .ok_or_else(|| PicnameError::NoExtension(filename.to_string()))?;
    if !IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return Err(PicnameError::NotAnImage(filename.to_string()));
    }

    let mut base = collapse_delimiters(base, settings.delimiter);
    if settings.capitalize_words {
        base = title_case(&base);
    }

    Ok(format!("{}.{}", base, ext.to_lowercase()))
}

/// Strip separators from both ends and replace every inner run with one delimiter
fn collapse_delimiters(base: &str, delimiter: Delimiter) -> String {
    let trimmed = base.trim_matches(Delimiter::is_delimiter_char);
    let mut out = String::with_capacity(trimmed.len());
    let mut in_run = false;

    for c in trimmed.chars() {
        if Delimiter::is_delimiter_char(c) {
            if !in_run {
                out.push(delimiter.as_char());
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }

    out
}

/// Upper-case letters that start a word, lower-case the rest.
///
/// A word starts after any character that is not a letter, so digits and
/// punctuation split words too (`a7d7351d30` becomes `A7D7351D30`). When a
/// case mapping expands to several characters only the leading one keeps the
/// new case (`ß` becomes `Ss`), and characters of the expansion that are not
/// letters are dropped, so the result maps to itself.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;

    for c in s.chars() {
        if !c.is_alphabetic() {
            out.push(c);
            prev_is_letter = false;
            continue;
        }

        let mut mapped = if prev_is_letter {
            c.to_lowercase().collect::<Vec<_>>()
        } else {
            c.to_uppercase().collect::<Vec<_>>()
        }
        .into_iter();

        out.push(mapped.next().unwrap_or(c));
        out.extend(
            mapped
                .flat_map(char::to_lowercase)
                .filter(|m| m.is_alphabetic()),
        );
        prev_is_letter = true;
    }

    out
}
