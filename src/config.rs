// src/config.rs

//! Scrape configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "listing": {
//!     "start_url": "https://www.example.org/list/summary/2016/",
//!     "fields": [
//!       { "selector": ".artistTitle" },
//!       { "selector": ".albumTitle" },
//!       { "selector": ".summaryPoints" },
//!       { "selector": ".summaryPointsMisc" }
//!     ],
//!     "renames": {
//!       ".artistTitle": "Artist Title",
//!       ".albumTitle": "Album Title",
//!       ".summaryPoints": "Summary Points",
//!       ".summaryPointsMisc": "Summary Points Misc"
//!     },
//!     "packed_field_name": "Summary Points Misc",
//!     "first_word_fields": ["Summary Points"],
//!     "numeric_fields": ["Summary Points"]
//!   },
//!   "sink": { "kind": "json", "path": "albums.json", "upsert_key": "Album Title" }
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crawler::datascraper::FieldSpec;
use crate::error::ConfigError;
use crate::reconstructor::coerce::ValueCoercion;
use crate::reconstructor::packed::DEFAULT_SENTINEL;
use crate::reconstructor::rename::FieldRenamer;
use crate::reconstructor::Reconstructor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub listing: ListingConfig,
    #[serde(default)]
    pub detail: Option<DetailConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub start_url: String,
    #[serde(default)]
    pub next_page_selector: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub renames: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub strict_field_mapping: bool,
    #[serde(default)]
    pub packed_field_name: Option<String>,
    #[serde(default = "default_sentinel")]
    pub sentinel_label: String,
    #[serde(default)]
    pub numeric_fields: Vec<String>,
    #[serde(default)]
    pub first_word_fields: Vec<String>,
    #[serde(default)]
    pub coerce_packed_values: bool,
}

impl ListingConfig {
    pub fn renamer(&self) -> FieldRenamer {
        FieldRenamer::new(self.renames.clone()).strict(self.strict_field_mapping)
    }

    pub fn reconstructor(&self) -> Reconstructor {
        Reconstructor::new(self.packed_field_name.clone()).with_sentinel(self.sentinel_label.clone())
    }

    pub fn coercion(&self) -> ValueCoercion {
        ValueCoercion::new()
            .numeric(self.numeric_fields.iter().cloned())
            .first_word(self.first_word_fields.iter().cloned())
            .packed_values(self.coerce_packed_values)
    }
}

/// Per-entity detail pages, linked from a field of each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailConfig {
    /// Record field (after renaming) holding the detail URL.
    pub link_field: String,
    #[serde(default = "default_output_field")]
    pub output_field: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_detail_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_pause")]
    pub request_pause_ms: u64,
    #[serde(default = "default_pause")]
    pub jitter_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            request_pause_ms: default_pause(),
            jitter_ms: default_pause(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Memory,
    Json,
    Csv,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub upsert_key: Option<String>,
    /// CSV only: text written for fields a record does not have.
    #[serde(default)]
    pub replace_nulls: Option<String>,
}

fn default_max_pages() -> usize { 1 }
fn default_true() -> bool { true }
fn default_sentinel() -> String { DEFAULT_SENTINEL.to_string() }
fn default_output_field() -> String { "posting_txt".to_string() }
fn default_concurrency() -> usize { 8 }
fn default_detail_timeout() -> u64 { 15 }
fn default_timeout() -> u64 { 10 }
fn default_pause() -> u64 { 250 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

impl ScrapeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ScrapeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        let listing = &self.listing;

        if listing.start_url.trim().is_empty() {
            return invalid("listing.start_url is empty");
        }
        if listing.fields.is_empty() {
            return invalid("listing.fields is empty");
        }
        let mut raw_names = HashSet::new();
        if let Some(spec) = listing.fields.iter().find(|spec| !raw_names.insert(spec.raw_name())) {
            return Err(ConfigError::Invalid(format!(
                "listing.fields has '{}' more than once",
                spec.raw_name()
            )));
        }
        if listing.max_pages == 0 {
            return invalid("listing.max_pages must be at least 1");
        }
        if listing.sentinel_label.trim().is_empty() {
            return invalid("listing.sentinel_label is empty");
        }
        if listing.packed_field_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return invalid("listing.packed_field_name is empty");
        }
        if listing.numeric_fields.iter().chain(&listing.first_word_fields).any(|f| f.trim().is_empty()) {
            return invalid("listing coercion field names must not be empty");
        }
        if let Some(detail) = &self.detail {
            if detail.concurrency == 0 {
                return invalid("detail.concurrency must be at least 1");
            }
            if detail.link_field.trim().is_empty() || detail.output_field.trim().is_empty() {
                return invalid("detail.link_field and detail.output_field must be set");
            }
        }
        if self.sink.kind != SinkKind::Memory && self.sink.path.is_none() {
            return invalid("sink.path is required for file sinks");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "listing": {
            "start_url": "https://www.example.org/list/",
            "fields": [{ "selector": ".title" }, { "selector": ".title a", "attribute": "href", "resolve_links": true }]
        }
    }"#;

    #[test]
    fn defaults_fill_in() {
        let config = ScrapeConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.listing.max_pages, 1);
        assert!(config.listing.strict_field_mapping);
        assert_eq!(config.listing.sentinel_label, "Other");
        assert_eq!(config.listing.fields[1].raw_name(), ".title a@href");
        assert!(config.listing.fields[1].resolve_links);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.sink.kind, SinkKind::Memory);
        assert!(config.detail.is_none());
    }

    #[test]
    fn file_sink_needs_a_path() {
        let json = MINIMAL.replacen("\"listing\"", "\"sink\": { \"kind\": \"csv\" }, \"listing\"", 1);
        let err = ScrapeConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("sink.path")));
    }

    #[test]
    fn zero_pages_is_rejected() {
        let json = MINIMAL.replacen("\"fields\"", "\"max_pages\": 0, \"fields\"", 1);
        assert!(matches!(ScrapeConfig::from_json(&json), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn detail_defaults() {
        let json = MINIMAL.replacen("\"listing\"", "\"detail\": { \"link_field\": \"href\" }, \"listing\"", 1);
        let config = ScrapeConfig::from_json(&json).unwrap();
        let detail = config.detail.unwrap();
        assert_eq!(detail.output_field, "posting_txt");
        assert_eq!(detail.concurrency, 8);
        assert_eq!(detail.timeout_secs, 15);
    }

    #[test]
    fn repeated_field_is_rejected() {
        let json = MINIMAL.replacen(
            "{ \"selector\": \".title\" }",
            "{ \"selector\": \".title\" }, { \"selector\": \".title\" }",
            1,
        );
        let err = ScrapeConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("'.title'")));

        // Same selector, different attribute: two distinct columns.
        let json = MINIMAL.replacen("{ \"selector\": \".title\" }", "{ \"selector\": \".title a\" }", 1);
        assert!(ScrapeConfig::from_json(&json).is_ok());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(ScrapeConfig::from_json("{"), Err(ConfigError::Json(_))));
    }
}
