// src/error.rs

//! Error taxonomy for the scraper.
//!
//! `RecordError` covers everything that can go wrong while turning one page's
//! extracted fields into records. Those errors are fatal for that page only;
//! the runner logs them and moves on to the next page.

use thiserror::Error;

/// Page-level failures raised while building records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A simple field does not have the same number of values as the others.
    #[error("field '{field}' has {found} values, expected {expected} (from '{reference}')")]
    SchemaMismatch {
        field: String,
        reference: String,
        expected: usize,
        found: usize,
    },

    /// The packed field ran out before the entity's run hit the sentinel.
    #[error("packed run for entity {entity} ended at token {cursor} without a sentinel")]
    MalformedPackedRun { entity: usize, cursor: usize },

    /// Tokens were left over after every entity consumed its run.
    #[error("{remaining} packed token(s) left unconsumed from position {cursor}")]
    TrailingPackedTokens { cursor: usize, remaining: usize },

    /// A packed token did not end in a parenthesized value.
    #[error("packed token {cursor} is not of the form '<category> (<value>)': {token:?}")]
    InvalidPackedToken { cursor: usize, token: String },

    /// A packed category has the same name as one of the page's simple fields.
    #[error("packed category '{category}' of entity {entity} collides with a simple field")]
    PackedCategoryCollision { entity: usize, category: String },

    /// A field name has no rename mapping under strict mode.
    #[error("no rename mapping for field '{field}'")]
    UnknownField { field: String },

    /// Two source fields were renamed to the same name.
    #[error("more than one field renamed to '{field}'")]
    DuplicateField { field: String },

    /// A field opted into numeric coercion held no number.
    #[error("field '{field}' is not numeric: {value:?}")]
    NotNumeric { field: String, value: String },

    /// A typed view needed a field the record does not have.
    #[error("record has no field '{field}'")]
    MissingField { field: String },
}

/// Errors from fetching or querying a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// Errors from persisting records.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Upsert was requested but a record lacks the key field.
    #[error("record {index} has no upsert key field '{key}'")]
    MissingUpsertKey { index: usize, key: String },
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A blocking stage (parallel reconstruction or a sink write) panicked.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
