// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! picname: batch image renamer
//!
//! Walks a folder, computes a clean name for every image (normalized words,
//! one delimiter, optional capitalization) and, for photos saved from a photo
//! sharing site, looks up the photo's real title. Renames are planned first
//! and only applied on request.

pub mod cache;
pub mod collision;
pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod lookup;
pub mod normalize;
pub mod plan;
pub mod resolver;
pub mod session;

pub use cache::ResolverCache;
pub use config::{AppConfig, Delimiter, Settings, SettingsStore, SettingsUpdate};
pub use error::{PicnameError, Result};
pub use history::{Journal, JournalEntry, UndoReport, UndoStatus};
pub use lookup::{FlickrClient, TitleLookup};
pub use plan::{BuildOutcome, CancellationFlag, PlanBuilder, PlanEntry, RenamePlan};
pub use resolver::RemoteNameResolver;
pub use session::RenameSession;
