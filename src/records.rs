// src/records.rs

//! Typed views over generic records.
//!
//! The reconstructor only knows field names; scrapers that want named,
//! typed fields convert with [`FromRecord`].

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::RecordError;
use crate::reconstructor::coerce::parse_num;
use crate::reconstructor::{EntityRecord, FieldValue};

pub trait FromRecord: Sized {
    fn from_record(record: &EntityRecord) -> Result<Self, RecordError>;
}

fn text(record: &EntityRecord, field: &str) -> Result<String, RecordError> {
    match record.get(field) {
        Some(FieldValue::Text(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(RecordError::MissingField { field: field.to_string() }),
    }
}

fn optional_text(record: &EntityRecord, field: &str) -> String {
    record.get(field).map(ToString::to_string).unwrap_or_default()
}

fn number(field: &str, value: &FieldValue) -> Result<i64, RecordError> {
    match value {
        FieldValue::Number(n) => Ok(*n),
        FieldValue::Text(s) => parse_num(s, 0).ok_or_else(|| RecordError::NotNumeric {
            field: field.to_string(),
            value: s.clone(),
        }),
        FieldValue::FetchFailed { fetch_failed } => Err(RecordError::NotNumeric {
            field: field.to_string(),
            value: fetch_failed.clone(),
        }),
    }
}

/// An album from a year-end ranking page, with its per-list point breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedAlbum {
    pub artist: String,
    pub title: String,
    pub points: i64,
    pub breakdown: IndexMap<String, i64>,
}

impl RankedAlbum {
    pub const ARTIST: &'static str = "Artist Title";
    pub const TITLE: &'static str = "Album Title";
    pub const POINTS: &'static str = "Summary Points";
}

impl FromRecord for RankedAlbum {
    /// Every field besides artist, title and points is a breakdown category.
    fn from_record(record: &EntityRecord) -> Result<Self, RecordError> {
        let points = record
            .get(Self::POINTS)
            .ok_or_else(|| RecordError::MissingField { field: Self::POINTS.to_string() })?;

        let mut breakdown = IndexMap::new();
        for (name, value) in record.iter() {
            if [Self::ARTIST, Self::TITLE, Self::POINTS].contains(&name) {
                continue;
            }
            breakdown.insert(name.to_string(), number(name, value)?);
        }

        Ok(Self {
            artist: text(record, Self::ARTIST)?,
            title: text(record, Self::TITLE)?,
            points: number(Self::POINTS, points)?,
            breakdown,
        })
    }
}

/// A job posting from a listing page, with the text of its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPosting {
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub href: String,
    /// Detail page text, or why it could not be fetched.
    pub posting: Result<String, String>,
}

impl JobPosting {
    pub const TITLE: &'static str = "job_title";
    pub const COMPANY: &'static str = "company";
    pub const LOCATION: &'static str = "location";
    pub const HREF: &'static str = "href";
    pub const POSTING: &'static str = "posting_txt";
}

impl FromRecord for JobPosting {
    fn from_record(record: &EntityRecord) -> Result<Self, RecordError> {
        let posting = match record.get(Self::POSTING) {
            Some(FieldValue::FetchFailed { fetch_failed }) => Err(fetch_failed.clone()),
            Some(value) => Ok(value.to_string()),
            None => return Err(RecordError::MissingField { field: Self::POSTING.to_string() }),
        };

        Ok(Self {
            job_title: text(record, Self::TITLE)?,
            company: optional_text(record, Self::COMPANY),
            location: optional_text(record, Self::LOCATION),
            href: optional_text(record, Self::HREF),
            posting,
        })
    }
}
