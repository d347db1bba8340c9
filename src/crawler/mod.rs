use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub mod datascraper;
use datascraper::{Page, PageFetcher};

use crate::error::FetchError;

/// Why one entity's detail page has no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub reason: String,
}

impl FetchFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Visible text of a detail page, or why it could not be fetched.
pub type DetailOutcome = Result<String, FetchFailure>;

/// A listing page as the crawl left it.
#[derive(Debug)]
pub enum ListingPage {
    Fetched(Page),
    Failed { url: String, error: FetchError },
}

#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    request_pause: Duration,
    jitter_ms: u64,
    detail_concurrency: usize,
    detail_timeout: Duration,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            request_pause: Duration::ZERO,
            jitter_ms: 0,
            detail_concurrency: 8,
            detail_timeout: Duration::from_secs(15),
        }
    }

    /// Pause between listing requests, plus up to `jitter_ms` of random extra.
    pub fn with_pause(mut self, pause_ms: u64, jitter_ms: u64) -> Self {
        self.request_pause = Duration::from_millis(pause_ms);
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn with_detail_limits(mut self, concurrency: usize, timeout: Duration) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self.detail_timeout = timeout;
        self
    }

    async fn pause(&self) {
        let jitter = if self.jitter_ms > 0 { rand::rng().random_range(0..=self.jitter_ms) } else { 0 };
        let wait = self.request_pause + Duration::from_millis(jitter);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Fetches `start_url`, then keeps following the next-page link until it is
    /// absent, points back at a visited page, or `max_pages` have been fetched.
    ///
    /// A failed fetch ends the crawl; it is returned as the last entry.
    pub async fn crawl_listing(
        &self,
        start_url: &str,
        next_selector: Option<&str>,
        max_pages: usize,
    ) -> Vec<ListingPage> {
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(start_url.to_string());

        while let Some(url) = next.take() {
            if pages.len() >= max_pages { break; }
            if !visited.insert(url.clone()) {
                debug!("Next link points back to {}, stopping", url);
                break;
            }
            if !pages.is_empty() {
                self.pause().await;
            }

            info!("Crawling: {}", url);
            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(error) => {
                    warn!("  > [FAILED] {}: {}", url, error);
                    pages.push(ListingPage::Failed { url, error });
                    break;
                }
            };

            if let Some(selector) = next_selector {
                next = match page.link(selector) {
                    Ok(link) => link,
                    Err(e) => {
                        warn!("  > Could not look for next page on {}: {}", url, e);
                        None
                    }
                };
            }
            pages.push(ListingPage::Fetched(page));
        }

        pages
    }

    /// Fetches one detail page per entry, at most `detail_concurrency` at a time.
    ///
    /// The result lines up with `urls`: one outcome per entry, same order.
    /// A missing link, timeout or failed request only marks its own entry.
    pub async fn fetch_details(&self, urls: Vec<Option<String>>) -> Vec<DetailOutcome> {
        let mut outcomes: Vec<DetailOutcome> = (0..urls.len())
            .map(|_| Err(FetchFailure::new("detail worker aborted")))
            .collect();
        let mut pending = urls.into_iter().enumerate();
        let mut join_set = JoinSet::new();

        info!("Fetching {} detail pages with concurrency: {}", outcomes.len(), self.detail_concurrency);

        loop {
            while join_set.len() < self.detail_concurrency {
                let Some((index, url)) = pending.next() else { break };
                let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
                    outcomes[index] = Err(FetchFailure::new("missing link"));
                    continue;
                };

                debug!("Fetching detail: {}", url);
                let fetcher = Arc::clone(&self.fetcher);
                let timeout = self.detail_timeout;

                join_set.spawn(async move {
                    let outcome = match tokio::time::timeout(timeout, fetcher.fetch(&url)).await {
                        Ok(Ok(page)) => Ok(page.visible_text()),
                        Ok(Err(e)) => Err(FetchFailure::new(e.to_string())),
                        Err(_) => Err(FetchFailure::new(FetchError::Timeout(timeout).to_string())),
                    };
                    (index, url, outcome)
                });
            }

            let Some(joined) = join_set.join_next().await else { break };
            match joined {
                Ok((index, url, outcome)) => {
                    if let Err(failure) = &outcome {
                        warn!("  > [SKIP] {}: {}", url, failure);
                    }
                    outcomes[index] = outcome;
                }
                // The slot keeps its "aborted" marker.
                Err(e) => warn!("  > Detail worker failed: {}", e),
            }
        }

        outcomes
    }
}
