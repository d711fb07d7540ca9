// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo title resolution for files saved from a photo sharing site
//!
//! Files downloaded from the site are named `<photo id>_<secret>_<size>.jpg`.
//! For those, the photo page title makes a far better name. Titles are cached
//! by photo id so each page is only fetched once, ever.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::cache::ResolverCache;
use crate::config::{LookupConfig, Settings};
use crate::lookup::TitleLookup;
use crate::normalize::{normalize, split_extension};
use crate::{PicnameError, Result};

static PHOTO_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{6,10})_[0-9a-f]{6,10}[._]")
        .expect("failed to compile photo filename regex")
});

static NON_TITLE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w _-]").expect("failed to compile title cleanup regex")
});

/// Extract the photo id from a filename following the site's naming scheme.
///
/// Only applies to jpg/jpeg files and only when remote names are enabled.
pub fn detect_external_id(filename: &str, settings: &Settings) -> Option<String> {
    if !settings.resolve_remote_names {
        return None;
    }

    let (_, ext) = split_extension(filename)?;
    if !(ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg")) {
        return None;
    }

    PHOTO_FILENAME
        .captures(&filename.to_lowercase())
        .map(|caps| caps[1].to_string())
}

/// Drop everything but word characters, spaces, underscores and hyphens
pub fn clean_title(title: &str) -> String {
    NON_TITLE_CHARS.replace_all(title, "").into_owned()
}

/// Decides what a redirect target or page prefix means.
///
/// These checks depend on the site's markup at any given time, so they are
/// kept apart from the resolution sequence itself.
pub trait PagePolicy: Send + Sync {
    /// The redirect points at a login wall
    fn is_sign_in(&self, location: &str) -> bool;

    /// The page says the photo is gone or not rendered yet
    fn is_unavailable(&self, body: &str) -> bool;

    /// The photo title, if the page prefix contains it
    fn extract_title(&self, body: &str) -> Option<String>;
}

/// [`PagePolicy`] driven by the markers in [`LookupConfig`]
pub struct MarkerPolicy {
    sign_in_marker: String,
    inactive_markers: Vec<String>,
    title: Regex,
}

impl MarkerPolicy {
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        let pattern = format!(r"<title>(.*){}.*</title>", regex::escape(&config.title_suffix));
        let title = Regex::new(&pattern)
            .map_err(|e| PicnameError::Config(format!("Invalid title pattern: {}", e)))?;

        Ok(Self {
            sign_in_marker: config.sign_in_marker.clone(),
            inactive_markers: config.inactive_markers.iter().map(|m| m.to_lowercase()).collect(),
            title,
        })
    }
}

impl PagePolicy for MarkerPolicy {
    fn is_sign_in(&self, location: &str) -> bool {
        !self.sign_in_marker.is_empty() && location.contains(&self.sign_in_marker)
    }

    fn is_unavailable(&self, body: &str) -> bool {
        let body = body.to_lowercase();
        self.inactive_markers.iter().any(|m| !m.is_empty() && body.contains(m.as_str()))
    }

    fn extract_title(&self, body: &str) -> Option<String> {
        self.title.captures(body).map(|caps| caps[1].to_string())
    }
}

/// How much of a page to read, and how often to try again
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_window: usize,
    pub window_growth: usize,
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Bytes to read on the given attempt (0 is the first try)
    pub fn window(&self, attempt: u32) -> usize {
        self.base_window + self.window_growth * attempt as usize
    }
}

impl From<&LookupConfig> for RetryPolicy {
    fn from(config: &LookupConfig) -> Self {
        Self {
            base_window: config.base_window,
            window_growth: config.window_growth,
            max_retries: config.max_retries,
        }
    }
}

/// Resolves photo titles through a [`TitleLookup`]
pub struct RemoteNameResolver<L> {
    lookup: L,
    retry: RetryPolicy,
    policy: Box<dyn PagePolicy>,
}

impl<L: TitleLookup> RemoteNameResolver<L> {
    pub fn new(lookup: L, config: &LookupConfig) -> Result<Self> {
        let policy = MarkerPolicy::from_config(config)?;
        Ok(Self::with_policy(lookup, RetryPolicy::from(config), Box::new(policy)))
    }

    pub fn with_policy(lookup: L, retry: RetryPolicy, policy: Box<dyn PagePolicy>) -> Self {
        Self { lookup, retry, policy }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// The new name for one file: a resolved title when the name carries a
    /// photo id, the normalized name otherwise
    pub async fn candidate_name(
        &self,
        filename: &str,
        settings: &Settings,
        cache: &mut ResolverCache,
    ) -> Result<String> {
        match detect_external_id(filename, settings) {
            Some(id) => self.resolve(filename, &id, settings, cache).await,
            None => normalize(filename, settings),
        }
    }

    /// Resolve the title for photo `id`, falling back to the normalized
    /// `filename` when the photo is missing, private or gone.
    ///
    /// Fails with [`PicnameError::RemoteResolutionFailed`] only when every read
    /// window came back without a title.
    pub async fn resolve(
        &self,
        filename: &str,
        id: &str,
        settings: &Settings,
        cache: &mut ResolverCache,
    ) -> Result<String> {
        if let Some(raw) = cache.get(id) {
            debug!("Using cached title for photo {}: {:?}", id, raw);
            return normalize(raw, settings);
        }

        let (_, ext) = split_extension(filename)
            .ok_or_else(|| PicnameError::NoExtension(filename.to_string()))?;

        let location = match self.lookup.redirect_location(id).await? {
            Some(location) if self.policy.is_sign_in(&location) => {
                debug!("Photo {} is private ({}), keeping local name", id, location);
                return normalize(filename, settings);
            }
            Some(location) => location,
            None => {
                debug!("Photo {} not found, keeping local name", id);
                return normalize(filename, settings);
            }
        };

        for attempt in 0..=self.retry.max_retries {
            let window = self.retry.window(attempt);
            let body = self.lookup.fetch_page_prefix(&location, window).await?;

            if self.policy.is_unavailable(&body) {
                debug!("Photo {} is no longer available, keeping local name", id);
                return normalize(filename, settings);
            }

            if let Some(title) = self.policy.extract_title(&body) {
                let raw = format!("{}.{}", clean_title(&title), ext.to_lowercase());
                info!("Photo {} is titled {:?}", id, raw);
                cache.insert(id, raw.as_str());
                return normalize(&raw, settings);
            }

            warn!(
                "No title in the first {} bytes of {} (attempt {} of {})",
                window,
                location,
                attempt + 1,
                self.retry.max_retries + 1
            );
        }

        Err(PicnameError::RemoteResolutionFailed {
            id: id.to_string(),
            attempts: self.retry.max_retries + 1,
        })
    }
}
