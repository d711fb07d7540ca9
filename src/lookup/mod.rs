// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Remote title lookup
//!
//! The resolver only needs two things from the photo site: where the short
//! `photo.gne` link redirects to, and the first bytes of the page found there.

pub mod flickr;

#[cfg(test)]
pub(crate) mod fixture;

use async_trait::async_trait;

use crate::Result;

pub use flickr::FlickrClient;

/// Access to the photo sharing site
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleLookup: Send + Sync {
    /// The redirect target for a photo id, or `None` when there is none
    async fn redirect_location(&self, id: &str) -> Result<Option<String>>;

    /// At most `max_bytes` bytes of the page at `location`, decoded lossily
    async fn fetch_page_prefix(&self, location: &str, max_bytes: usize) -> Result<String>;
}
