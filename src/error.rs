// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for picname

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for picname operations
pub type Result<T> = std::result::Result<T, PicnameError>;

/// picname error types
#[derive(Error, Debug)]
pub enum PicnameError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid setting `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Filename has no extension: {0}")]
    NoExtension(String),

    #[error("Could not find a title for photo {id} after {attempts} attempts")]
    RemoteResolutionFailed { id: String, attempts: u32 },

    #[error("Failed to rename {path:?} ({renamed} renamed before the failure): {source}")]
    RenameFailed {
        path: PathBuf,
        renamed: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot connect to {host}: {message}. Disable remote name lookup or try again later")]
    NetworkUnavailable { host: String, message: String },

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PicnameError {
    /// Whether this error only means "leave the file alone"
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NotAnImage(_) | Self::NoExtension(_))
    }
}
