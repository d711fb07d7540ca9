// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Canned photo site used by the resolver and plan tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::TitleLookup;
use crate::Result;

pub(crate) struct FixtureLookup {
    locations: HashMap<&'static str, &'static str>,
    pages: HashMap<&'static str, String>,
    redirect_calls: AtomicUsize,
    windows: Mutex<Vec<usize>>,
}

impl FixtureLookup {
    pub(crate) fn new() -> Self {
        let locations = HashMap::from([
            ("2816803094", "/photos/30073770@N07/2816803094"),
            ("2816803022", "https://www.flickr.com/signin/?redir=photos%2F2816803022"),
            ("6795654383", "/photos/jimmyroq/6795654383"),
            ("6888049103", "/photos/karlsart/6888049103"),
            ("178933701", "/photos/lukas/178933701"),
            ("5550001234", "/photos/gone/5550001234"),
            ("1110001111", "/photos/slow/1110001111"),
            ("2220002222", "/photos/broken/2220002222"),
        ]);

        let head = "<!DOCTYPE html>\n<html lang=\"en-us\">\n<head>\n";
        let pages = HashMap::from([
            (
                "/photos/30073770@N07/2816803094",
                format!("{}<title>Harbour at dusk | Flickr - Photo Sharing!</title>", head),
            ),
            (
                "/photos/jimmyroq/6795654383",
                format!(
                    "{}<title>And loves the noblest frailty of the mind. John Dryden | Flickr - Photo Sharing!</title>",
                    head
                ),
            ),
            (
                "/photos/karlsart/6888049103",
                format!("{}<title>DughiTile - Oakwd - KARL | Flickr - Photo Sharing!</title>", head),
            ),
            (
                "/photos/lukas/178933701",
                format!("{}<title>apartment roof | Flickr - Photo Sharing!</title>", head),
            ),
            (
                "/photos/gone/5550001234",
                format!("{}<title>Flickr</title><p>This photo is no longer active.</p>", head),
            ),
            (
                "/photos/slow/1110001111",
                format!("{}<!--{}--><title>Late title | Flickr</title>", head, " ".repeat(300)),
            ),
            (
                "/photos/broken/2220002222",
                format!("{}{}", head, "<meta>".repeat(300)),
            ),
        ]);

        Self {
            locations,
            pages,
            redirect_calls: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// How many redirect lookups were issued
    pub(crate) fn redirect_calls(&self) -> usize {
        self.redirect_calls.load(Ordering::SeqCst)
    }

    /// Read windows requested from page fetches, in order
    pub(crate) fn windows(&self) -> Vec<usize> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TitleLookup for FixtureLookup {
    async fn redirect_location(&self, id: &str) -> Result<Option<String>> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.locations.get(id).map(|l| l.to_string()))
    }

    async fn fetch_page_prefix(&self, location: &str, max_bytes: usize) -> Result<String> {
        self.windows.lock().unwrap().push(max_bytes);
        let page = self.pages.get(location).map(String::as_bytes).unwrap_or_default();
        let end = page.len().min(max_bytes);
        Ok(String::from_utf8_lossy(&page[..end]).into_owned())
    }
}
