// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for picname
//!
//! Two files live here. [`AppConfig`] is the engine configuration (where state
//! is stored, how the remote lookup behaves). [`Settings`] is the small user
//! record (`delimiter`, `capital`, `flickr`, `lastPath`) kept by [`SettingsStore`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::{PicnameError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Where the user settings record is kept
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Where resolved remote titles are cached
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Rename journal used for undo
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Remote title lookup
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LookupConfig {
    /// Host answering `/photo.gne?id=<id>` with a redirect
    #[serde(default = "default_lookup_host")]
    pub lookup_host: String,
    /// Host serving the photo pages the redirect points to
    #[serde(default = "default_page_host")]
    pub page_host: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Bytes of the page read on the first attempt
    #[serde(default = "default_base_window")]
    pub base_window: usize,
    /// Extra bytes read on every retry
    #[serde(default = "default_window_growth")]
    pub window_growth: usize,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// A redirect containing this goes to a login page
    #[serde(default = "default_sign_in_marker")]
    pub sign_in_marker: String,
    /// Site name following the photo title inside `<title>`
    #[serde(default = "default_title_suffix")]
    pub title_suffix: String,
    /// Page bodies containing any of these have no usable title
    #[serde(default = "default_inactive_markers")]
    pub inactive_markers: Vec<String>,
}

// Default value functions
fn default_lookup_host() -> String { "flickr.com".to_string() }
fn default_page_host() -> String { "www.flickr.com".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_base_window() -> usize { 350 }
fn default_window_growth() -> usize { 50 }
fn default_retries() -> u32 { 3 }
fn default_sign_in_marker() -> String { "signin".to_string() }
fn default_title_suffix() -> String { " | Flickr".to_string() }

fn default_inactive_markers() -> Vec<String> {
    vec!["This photo is no longer active", "Please wait"]
        .into_iter().map(String::from).collect()
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("picname"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_settings_path() -> PathBuf { data_dir().join("settings.json") }
fn default_cache_path() -> PathBuf { data_dir().join("flickr_titles.json") }
fn default_journal_path() -> PathBuf { data_dir().join("picname_history.jsonl") }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            cache_path: default_cache_path(),
            journal_path: default_journal_path(),
            lookup: LookupConfig::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            lookup_host: default_lookup_host(),
            page_host: default_page_host(),
            timeout_secs: default_timeout(),
            base_window: default_base_window(),
            window_growth: default_window_growth(),
            max_retries: default_retries(),
            sign_in_marker: default_sign_in_marker(),
            title_suffix: default_title_suffix(),
            inactive_markers: default_inactive_markers(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| PicnameError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Separator placed between words of a normalized name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Delimiter {
    #[default]
    Space,
    Underscore,
    Hyphen,
    Period,
}

impl Delimiter {
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Space,
        Delimiter::Underscore,
        Delimiter::Hyphen,
        Delimiter::Period,
    ];

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Space => ' ',
            Delimiter::Underscore => '_',
            Delimiter::Hyphen => '-',
            Delimiter::Period => '.',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Space => "space",
            Delimiter::Underscore => "underscore",
            Delimiter::Hyphen => "hyphen",
            Delimiter::Period => "period",
        }
    }

    /// Any character that counts as a word separator in a raw filename
    pub fn is_delimiter_char(c: char) -> bool {
        matches!(c, ' ' | '_' | '-' | '.')
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Delimiter {
    type Err = PicnameError;

    /// Accepts either the literal character or its name
    fn from_str(s: &str) -> Result<Self> {
        Delimiter::ALL
            .into_iter()
            .find(|d| (s.len() == 1 && s.starts_with(d.as_char())) || s.eq_ignore_ascii_case(d.name()))
            .ok_or_else(|| PicnameError::Validation {
                field: "delimiter",
                message: format!("{:?} is not one of space, underscore, hyphen, period", s),
            })
    }
}

impl TryFrom<String> for Delimiter {
    type Error = PicnameError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Delimiter> for String {
    fn from(value: Delimiter) -> Self {
        value.as_char().to_string()
    }
}

/// User settings controlling how names are computed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub delimiter: Delimiter,
    #[serde(rename = "capital")]
    pub capitalize_words: bool,
    #[serde(rename = "flickr")]
    pub resolve_remote_names: bool,
    #[serde(rename = "lastPath", default)]
    pub last_path: String,
}

impl Settings {
    /// Build settings from a loosely-typed JSON record.
    ///
    /// Every field is checked on its own; a missing or invalid field falls back
    /// to its default with a warning instead of rejecting the whole record.
    pub fn from_value_lenient(value: &Value) -> Self {
        let defaults = Self::default();

        let delimiter = match value.get("delimiter") {
            Some(Value::String(s)) => match s.parse() {
                Ok(d) => d,
                Err(e) => {
                    warn!("{}, using {}", e, defaults.delimiter);
                    defaults.delimiter
                }
            },
            other => {
                warn!("Setting `delimiter` missing or not a string ({:?}), using {}", other, defaults.delimiter);
                defaults.delimiter
            }
        };

        Self {
            delimiter,
            capitalize_words: lenient_bool(value, "capital", defaults.capitalize_words),
            resolve_remote_names: lenient_bool(value, "flickr", defaults.resolve_remote_names),
            last_path: match value.get("lastPath") {
                Some(Value::String(s)) => s.clone(),
                None => defaults.last_path,
                Some(other) => {
                    warn!("Setting `lastPath` is not a string ({}), ignoring it", other);
                    defaults.last_path
                }
            },
        }
    }

    /// Apply a validated update, keeping `last_path`
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<()> {
        let delimiter = match &update.delimiter {
            Some(raw) => raw.parse()?,
            None => self.delimiter,
        };
        self.delimiter = delimiter;
        if let Some(capital) = update.capitalize_words {
            self.capitalize_words = capital;
        }
        if let Some(remote) = update.resolve_remote_names {
            self.resolve_remote_names = remote;
        }
        Ok(())
    }
}

fn lenient_bool(value: &Value, field: &str, default: bool) -> bool {
    match value.get(field) {
        Some(Value::Bool(b)) => *b,
        other => {
            warn!("Setting `{}` missing or not a boolean ({:?}), using {}", field, other, default);
            default
        }
    }
}

/// A settings change requested from outside (CLI flags, a front end).
///
/// The delimiter stays a raw string until [`Settings::apply`] validates it.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub delimiter: Option<String>,
    pub capitalize_words: Option<bool>,
    pub resolve_remote_names: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.delimiter.is_none() && self.capitalize_words.is_none() && self.resolve_remote_names.is_none()
    }
}

/// Persists [`Settings`] as a single JSON record
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load settings, substituting defaults for anything unusable.
    ///
    /// Never fails on bad content; only an unreadable existing file is an error.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            info!("No settings at {:?}, starting from defaults", self.path);
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => Ok(Settings::from_value_lenient(&value)),
            Err(e) => {
                warn!("No valid settings data in {:?} ({}), starting from scratch", self.path, e);
                Ok(Settings::default())
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
