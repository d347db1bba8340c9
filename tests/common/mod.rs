//! Shared test fixtures: an in-memory fetcher and listing markup.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use listing_scraper::crawler::datascraper::{Page, PageFetcher};
use listing_scraper::error::FetchError;

enum Stub {
    Body(String),
    Status(u16),
    Slow(Duration, String),
    Panic,
}

/// Serves canned pages by URL; anything unknown is a 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, Stub>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Stub::Body(body.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Stub::Status(status));
        self
    }

    pub fn slow(mut self, url: &str, delay: Duration, body: &str) -> Self {
        self.pages.insert(url.to_string(), Stub::Slow(delay, body.to_string()));
        self
    }

    pub fn panics(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Stub::Panic);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Stub::Body(body)) => Ok(Page::new(url, body.as_str())),
            Some(Stub::Slow(delay, body)) => {
                tokio::time::sleep(*delay).await;
                Ok(Page::new(url, body.as_str()))
            }
            Some(Stub::Status(status)) => Err(FetchError::Status { url: url.to_string(), status: *status }),
            Some(Stub::Panic) => panic!("stub fetcher asked to panic for {url}"),
            None => Err(FetchError::Status { url: url.to_string(), status: 404 }),
        }
    }
}

/// A year-end list page: one row per album plus the packed points breakdown.
pub fn album_listing(rows: &[(&str, &str, &str, &[&str])], next: Option<&str>) -> String {
    let mut html = String::from("<html><head><title>List</title></head><body>");
    for (artist, album, points, misc) in rows {
        html.push_str(&format!(
            r#"<div class="albumListRow">
                 <div class="artistTitle">{artist}</div>
                 <div class="albumTitle"><a href="/album/{album}.php">{album}</a></div>
                 <div class="summaryPoints">{points}</div>"#
        ));
        for token in *misc {
            html.push_str(&format!(r#"<div class="summaryPointsMisc">{token}</div>"#));
        }
        html.push_str("</div>");
    }
    if let Some(next) = next {
        html.push_str(&format!(r#"<a class="next" href="{next}">Next</a>"#));
    }
    html.push_str("</body></html>");
    html
}
