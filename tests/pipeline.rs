//! End-to-end runs of the runner with a stub fetcher and real sinks.

mod common;

use std::sync::Arc;

use common::{album_listing, StubFetcher};
use listing_scraper::config::ScrapeConfig;
use listing_scraper::records::{FromRecord, JobPosting, RankedAlbum};
use listing_scraper::runner::{RunSummary, Runner};
use listing_scraper::sink::{JsonFileSink, MemorySink, RecordSink};
use listing_scraper::FieldValue;

const BASE: &str = "https://www.example.org/list/summary/2016/";

fn album_config(sink: &str) -> ScrapeConfig {
    let json = format!(
        r#"{{
            "listing": {{
                "start_url": "{BASE}",
                "next_page_selector": "a.next",
                "max_pages": 5,
                "fields": [
                    {{ "selector": ".artistTitle" }},
                    {{ "selector": ".albumTitle" }},
                    {{ "selector": ".summaryPoints" }},
                    {{ "selector": ".summaryPointsMisc" }}
                ],
                "renames": {{
                    ".artistTitle": "Artist Title",
                    ".albumTitle": "Album Title",
                    ".summaryPoints": "Summary Points",
                    ".summaryPointsMisc": "Summary Points Misc"
                }},
                "packed_field_name": "Summary Points Misc",
                "first_word_fields": ["Summary Points"],
                "numeric_fields": ["Summary Points"],
                "coerce_packed_values": true
            }},
            "fetch": {{ "request_pause_ms": 0, "jitter_ms": 0 }},
            "sink": {sink}
        }}"#
    );
    ScrapeConfig::from_json(&json).unwrap()
}

fn two_page_fetcher() -> StubFetcher {
    StubFetcher::new()
        .page(
            BASE,
            &album_listing(
                &[
                    ("David Bowie", "Blackstar", "312 points", &["#1 (3)", "Top 10 (9)", "Other (2)"]),
                    ("Beyonce", "Lemonade", "290 points", &["Top 10 (11)", "Other (4)"]),
                ],
                Some("?page=2"),
            ),
        )
        .page(
            &format!("{BASE}?page=2"),
            &album_listing(&[("Radiohead", "A Moon Shaped Pool", "1,050 points", &["Other (7)"])], None),
        )
}

#[tokio::test]
async fn album_pages_become_typed_records() {
    let sink = Arc::new(MemorySink::new());
    let runner = Runner::new(album_config(r#"{ "kind": "memory" }"#), Arc::new(two_page_fetcher()), sink.clone());

    let summary = runner.run().await.unwrap();
    assert_eq!(
        summary,
        RunSummary { pages_fetched: 2, records_written: 3, ..RunSummary::default() }
    );

    let albums: Vec<RankedAlbum> = sink
        .records()
        .iter()
        .map(|r| RankedAlbum::from_record(r).unwrap())
        .collect();
    assert_eq!(albums[0].title, "Blackstar");
    assert_eq!(albums[0].points, 312);
    assert_eq!(albums[0].breakdown.get("#1"), Some(&3));
    assert_eq!(albums[0].breakdown.get("Other"), Some(&2));
    assert_eq!(albums[1].breakdown.len(), 2);
    assert_eq!(albums[2].artist, "Radiohead");
    assert_eq!(albums[2].points, 1050);
}

#[tokio::test]
async fn malformed_page_is_skipped_and_others_stored() {
    let fetcher = StubFetcher::new()
        .page(
            BASE,
            // Second album's run never reaches the sentinel.
            &album_listing(
                &[
                    ("David Bowie", "Blackstar", "312 points", &["Other (2)"]),
                    ("Beyonce", "Lemonade", "290 points", &["Top 10 (11)"]),
                ],
                Some("?page=2"),
            ),
        )
        .page(
            &format!("{BASE}?page=2"),
            &album_listing(&[("Radiohead", "A Moon Shaped Pool", "250 points", &["Other (7)"])], None),
        );
    let sink = Arc::new(MemorySink::new());
    let runner = Runner::new(album_config(r#"{ "kind": "memory" }"#), Arc::new(fetcher), sink.clone());

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.records_written, 1);
    assert_eq!(sink.records()[0].get_text("Album Title"), Some("A Moon Shaped Pool"));
}

#[tokio::test]
async fn unmapped_field_skips_page_in_strict_mode() {
    let mut config = album_config(r#"{ "kind": "memory" }"#);
    config.listing.renames.remove(".summaryPoints");
    let sink = Arc::new(MemorySink::new());

    let summary = Runner::new(config.clone(), Arc::new(two_page_fetcher()), sink.clone()).run().await.unwrap();
    assert_eq!(summary.pages_skipped, 2);
    assert!(sink.is_empty());

    // Lenient mode keeps the raw name, so the coercion targets go too.
    config.listing.strict_field_mapping = false;
    config.listing.numeric_fields.clear();
    config.listing.first_word_fields.clear();
    let sink = Arc::new(MemorySink::new());
    let summary = Runner::new(config, Arc::new(two_page_fetcher()), sink.clone()).run().await.unwrap();
    assert_eq!(summary.records_written, 3);
    assert_eq!(sink.records()[0].get_text(".summaryPoints"), Some("312 points"));
}

#[tokio::test]
async fn upsert_into_json_file_merges_reruns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("albums.json");
    let sink_json = format!(
        r#"{{ "kind": "json", "path": {}, "upsert_key": "Album Title" }}"#,
        serde_json::to_string(&path).unwrap()
    );

    for _ in 0..2 {
        let config = album_config(&sink_json);
        let sink = listing_scraper::sink::open(&config.sink).unwrap();
        Runner::new(config, Arc::new(two_page_fetcher()), sink).run().await.unwrap();
    }

    let stored = JsonFileSink::open(&path).unwrap().records();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].get("Summary Points"), Some(&FieldValue::Number(312)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn csv_reruns_merge_on_numeric_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("albums.csv");
    let sink_json = format!(
        r#"{{ "kind": "csv", "path": {}, "upsert_key": "Summary Points" }}"#,
        serde_json::to_string(&path).unwrap()
    );

    for _ in 0..2 {
        let config = album_config(&sink_json);
        let sink = listing_scraper::sink::open(&config.sink).unwrap();
        let summary = Runner::new(config, Arc::new(two_page_fetcher()), sink).run().await.unwrap();
        assert_eq!(summary.records_written, 3);
    }

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(written.lines().nth(3).unwrap().starts_with("Radiohead,A Moon Shaped Pool,1050"));
}

const JOBS: &str = "https://jobs.example.org/search?q=data";

fn job_listing() -> String {
    r#"<html><body>
        <div class="job_result"><a class="job_title" href="/job/1">Data Engineer</a><span class="company">Acme</span></div>
        <div class="job_result"><a class="job_title" href="/job/2">Data Analyst</a><span class="company">Globex</span></div>
        <div class="job_result"><a class="job_title" href="/job/3">Data Scientist</a><span class="company">Initech</span></div>
    </body></html>"#
        .to_string()
}

#[tokio::test]
async fn detail_failures_are_marked_per_record() {
    let config = ScrapeConfig::from_json(&format!(
        r#"{{
            "listing": {{
                "start_url": "{JOBS}",
                "fields": [
                    {{ "selector": ".job_title" }},
                    {{ "selector": ".company" }},
                    {{ "selector": ".job_title", "attribute": "href", "resolve_links": true }}
                ],
                "renames": {{
                    ".job_title": "job_title",
                    ".company": "company",
                    ".job_title@href": "href"
                }}
            }},
            "detail": {{ "link_field": "href", "concurrency": 2 }},
            "fetch": {{ "request_pause_ms": 0, "jitter_ms": 0 }}
        }}"#
    ))
    .unwrap();

    let fetcher = StubFetcher::new()
        .page(JOBS, &job_listing())
        .page("https://jobs.example.org/job/1", "<body>Spark and Airflow</body>")
        .status("https://jobs.example.org/job/2", 502)
        .page("https://jobs.example.org/job/3", "<body>Statistics</body>");
    let sink = Arc::new(MemorySink::new());
    let summary = Runner::new(config, Arc::new(fetcher), sink.clone()).run().await.unwrap();

    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.detail_failures, 1);

    let jobs: Vec<JobPosting> = sink.records().iter().map(|r| JobPosting::from_record(r).unwrap()).collect();
    assert_eq!(jobs[0].posting, Ok("Spark and Airflow".to_string()));
    assert!(jobs[1].posting.as_ref().unwrap_err().contains("502"));
    assert_eq!(jobs[1].company, "Globex");
    assert_eq!(jobs[2].posting, Ok("Statistics".to_string()));
    assert_eq!(jobs[2].href, "https://jobs.example.org/job/3");
}

#[tokio::test]
async fn unreachable_start_page_is_counted_not_fatal() {
    let sink: Arc<dyn RecordSink> = Arc::new(MemorySink::new());
    let summary = Runner::new(album_config(r#"{ "kind": "memory" }"#), Arc::new(StubFetcher::new()), sink)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.records_written, 0);
}
