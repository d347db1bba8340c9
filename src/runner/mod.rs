use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tracing::{info, warn};

use crate::config::{DetailConfig, ScrapeConfig};
use crate::crawler::datascraper::{HttpFetcher, PageFetcher};
use crate::crawler::{Crawler, ListingPage};
use crate::error::{Result, ScrapeError};
use crate::reconstructor::{reconstruct_pages, EntityRecord, FieldValue, RawFieldTable};
use crate::sink::{self, RecordSink};

/// Counts from one scrape run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub records_written: usize,
    pub detail_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages fetched, {} failed, {} skipped; {} records written; {} detail fetches failed",
            self.pages_fetched, self.pages_failed, self.pages_skipped, self.records_written, self.detail_failures
        )
    }
}

/// Drives one configured scrape: crawl, reconstruct, enrich, persist.
pub struct Runner {
    config: ScrapeConfig,
    crawler: Crawler,
    sink: Arc<dyn RecordSink>,
}

impl Runner {
    pub fn new(config: ScrapeConfig, fetcher: Arc<dyn PageFetcher>, sink: Arc<dyn RecordSink>) -> Self {
        let mut crawler = Crawler::new(fetcher).with_pause(config.fetch.request_pause_ms, config.fetch.jitter_ms);
        if let Some(detail) = &config.detail {
            crawler = crawler.with_detail_limits(detail.concurrency, Duration::from_secs(detail.timeout_secs));
        }
        Self { config, crawler, sink }
    }

    /// Runs the scrape. A page that cannot be turned into records is logged
    /// and skipped; only sink failures end the run early.
    pub async fn run(&self) -> Result<RunSummary> {
        let listing = &self.config.listing;
        let mut summary = RunSummary::default();

        info!("--- 1. Crawling listing pages from {} ---", listing.start_url);
        let pages = self
            .crawler
            .crawl_listing(&listing.start_url, listing.next_page_selector.as_deref(), listing.max_pages)
            .await;

        let renamer = listing.renamer();
        let mut urls = Vec::with_capacity(pages.len());
        let mut tables: Vec<RawFieldTable> = Vec::with_capacity(pages.len());
        for page in pages {
            let page = match page {
                ListingPage::Fetched(page) => page,
                ListingPage::Failed { .. } => {
                    summary.pages_failed += 1;
                    continue;
                }
            };
            summary.pages_fetched += 1;

            let table = page
                .select_fields(&listing.fields)
                .map_err(ScrapeError::from)
                .and_then(|table| renamer.apply(table).map_err(ScrapeError::from));
            match table {
                Ok(table) => {
                    urls.push(page.url);
                    tables.push(table);
                }
                Err(e) => {
                    warn!("  > [SKIP] {}: {}", page.url, e);
                    summary.pages_skipped += 1;
                }
            }
        }

        info!("--- 2. Reconstructing records for {} pages ---", tables.len());
        let reconstructor = listing.reconstructor();
        let coercion = listing.coercion();
        // rayon does the page fan-out; keep it off the async workers.
        let (reconstructor, tables, outcomes) = task::spawn_blocking(move || {
            let outcomes = reconstruct_pages(&reconstructor, &tables);
            (reconstructor, tables, outcomes)
        })
        .await?;

        info!("--- 3. Storing records ---");
        let upsert_key = self.config.sink.upsert_key.clone();
        for ((url, table), outcome) in urls.iter().zip(&tables).zip(outcomes) {
            let simple_fields = reconstructor.simple_fields(table);
            let coerced = outcome.and_then(|mut records| {
                coercion.apply(&mut records, &simple_fields)?;
                Ok(records)
            });
            let mut records = match coerced {
                Ok(records) => records,
                Err(e) => {
                    warn!("  > [SKIP] {}: {}", url, e);
                    summary.pages_skipped += 1;
                    continue;
                }
            };

            if let Some(detail) = &self.config.detail {
                summary.detail_failures += self.attach_details(detail, &mut records).await;
            }

            let sink = Arc::clone(&self.sink);
            let key = upsert_key.clone();
            let written = task::spawn_blocking(move || sink.persist(&records, key.as_deref())).await??;
            summary.records_written += written;
            info!("  > Stored {} records from {}", written, url);
        }

        info!("Scrape complete: {}", summary);
        Ok(summary)
    }

    /// Fetches each record's detail page and stores its text, or a failure
    /// marker, under the output field. Returns the number of failures.
    async fn attach_details(&self, detail: &DetailConfig, records: &mut [EntityRecord]) -> usize {
        let links = records
            .iter()
            .map(|record| record.get_text(&detail.link_field).map(str::to_string))
            .collect();
        let outcomes = self.crawler.fetch_details(links).await;

        let mut failures = 0;
        for (record, outcome) in records.iter_mut().zip(outcomes) {
            let value = match outcome {
                Ok(text) => FieldValue::Text(text),
                Err(failure) => {
                    failures += 1;
                    FieldValue::FetchFailed { fetch_failed: failure.reason }
                }
            };
            record.insert(detail.output_field.as_str(), value);
        }
        failures
    }
}

/// Runs `config` against the live web with the sink it names.
pub async fn run_scrape(config: ScrapeConfig) -> Result<RunSummary> {
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let sink = sink::open(&config.sink)?;
    Runner::new(config, fetcher, sink).run().await
}
