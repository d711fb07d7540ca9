// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTTP client for the photo site's short links and pages

use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use std::time::Duration;
use tracing::debug;

use super::TitleLookup;
use crate::config::LookupConfig;
use crate::{PicnameError, Result};

/// Talks to the lookup host (redirects) and the page host (photo pages)
pub struct FlickrClient {
    client: Client,
    lookup_host: String,
    page_host: String,
}

impl FlickrClient {
    /// Create a new client; redirects are never followed
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client, config: &LookupConfig) -> Self {
        Self {
            client,
            lookup_host: config.lookup_host.clone(),
            page_host: config.page_host.clone(),
        }
    }

    /// Absolute URL for a redirect target that may be host-relative
    fn page_url(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("http://{}/{}", self.page_host, location.trim_start_matches('/'))
        }
    }

    /// Connection problems get their own error so callers can suggest going offline
    fn request_error(host: &str, e: reqwest::Error) -> PicnameError {
        if e.is_connect() || e.is_timeout() {
            PicnameError::NetworkUnavailable {
                host: host.to_string(),
                message: e.to_string(),
            }
        } else {
            PicnameError::Api(e)
        }
    }
}

#[async_trait]
impl TitleLookup for FlickrClient {
    async fn redirect_location(&self, id: &str) -> Result<Option<String>> {
        let url = format!("http://{}/photo.gne?id={}", self.lookup_host, id);
        debug!("HEAD {}", url);

        let response = self.client
            .head(&url)
            .send()
            .await
            .map_err(|e| Self::request_error(&self.lookup_host, e))?;

        // A trailing slash makes the page host answer with another redirect
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|l| l.trim_end_matches('/').to_string())
            .filter(|l| !l.is_empty());

        debug!("Photo {} redirects to {:?} (status {})", id, location, response.status());
        Ok(location)
    }

    async fn fetch_page_prefix(&self, location: &str, max_bytes: usize) -> Result<String> {
        let url = self.page_url(location);
        debug!("GET {} (first {} bytes)", url, max_bytes);

        let mut response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::request_error(&self.page_host, e))?;

        let mut body = Vec::with_capacity(max_bytes);
        while body.len() < max_bytes {
            match response.chunk().await.map_err(|e| Self::request_error(&self.page_host, e))? {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }
        body.truncate(max_bytes);

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
