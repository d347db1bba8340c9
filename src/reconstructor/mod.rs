// src/reconstructor/mod.rs

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub mod coerce;
pub mod packed;
pub mod rename;

use crate::error::RecordError;
use self::packed::{RunScanner, DEFAULT_SENTINEL};

/// Ordered field name -> values scraped from one listing page.
///
/// Field order is kept; it becomes the column order of the output records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldTable {
    fields: IndexMap<String, Vec<String>>,
}

impl RawFieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier field of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.fields.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for RawFieldTable {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for RawFieldTable {
    type Item = (String, Vec<String>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A single value in an output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(i64),
    Text(String),
    /// The entity's detail page could not be fetched.
    FetchFailed { fetch_failed: String },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_fetch_failed(&self) -> bool {
        matches!(self, FieldValue::FetchFailed { .. })
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::FetchFailed { fetch_failed } => write!(f, "fetch failed: {fetch_failed}"),
        }
    }
}

/// One entity's flat record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord {
    fields: IndexMap<String, FieldValue>,
}

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field. An existing field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldValue)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overwrites or adds every field of `other`.
    pub fn merge(&mut self, other: &EntityRecord) {
        for (name, value) in other.iter() {
            self.insert(name, value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for EntityRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Result of reconstructing one page.
pub type PageOutcome = Result<Vec<EntityRecord>, RecordError>;

/// Turns a page's parallel field lists into one record per entity.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    packed_field: Option<String>,
    sentinel: String,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self {
            packed_field: None,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

impl Reconstructor {
    pub fn new(packed_field: Option<String>) -> Self {
        Self { packed_field, ..Self::default() }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn packed_field(&self) -> Option<&str> {
        self.packed_field.as_deref()
    }

    /// Names of the fields that hold exactly one value per entity.
    pub fn simple_fields<'t>(&self, table: &'t RawFieldTable) -> Vec<&'t str> {
        table
            .names()
            .filter(|name| Some(*name) != self.packed_field.as_deref())
            .collect()
    }

    /// Builds the records for one page.
    ///
    /// Simple fields must all have the same length N; the result has exactly
    /// N records in on-page order. Any error leaves no partial output.
    pub fn reconstruct(&self, table: &RawFieldTable) -> PageOutcome {
        let simple: Vec<(&str, &[String])> = table
            .iter()
            .filter(|(name, _)| Some(*name) != self.packed_field.as_deref())
            .collect();

        let entity_count = match simple.first() {
            Some((_, values)) => values.len(),
            None => 0,
        };
        if let Some((reference, _)) = simple.first() {
            for (name, values) in &simple[1..] {
                if values.len() != entity_count {
                    return Err(RecordError::SchemaMismatch {
                        field: name.to_string(),
                        reference: reference.to_string(),
                        expected: entity_count,
                        found: values.len(),
                    });
                }
            }
        }

        // A configured packed field that this page doesn't have is a plain zip.
        let mut scanner = self
            .packed_field
            .as_deref()
            .and_then(|name| table.get(name))
            .map(|tokens| RunScanner::new(tokens, &self.sentinel));

        let mut records = Vec::with_capacity(entity_count);
        for i in 0..entity_count {
            let mut record = EntityRecord::new();
            for (name, values) in &simple {
                record.insert(*name, values[i].as_str());
            }
            if let Some(scanner) = scanner.as_mut() {
                for token in scanner.next_run(i)? {
                    if simple.iter().any(|(name, _)| *name == token.category) {
                        return Err(RecordError::PackedCategoryCollision { entity: i, category: token.category });
                    }
                    record.insert(token.category, token.value);
                }
            }
            records.push(record);
        }

        if let Some(scanner) = scanner {
            scanner.finish()?;
        }
        Ok(records)
    }
}

/// Reconstructs `table` with the default `"Other"` sentinel.
pub fn reconstruct(table: &RawFieldTable, packed_field_name: Option<&str>) -> PageOutcome {
    Reconstructor::new(packed_field_name.map(str::to_string)).reconstruct(table)
}

/// Reconstructs independent pages in parallel, one outcome per page in input order.
pub fn reconstruct_pages(reconstructor: &Reconstructor, pages: &[RawFieldTable]) -> Vec<PageOutcome> {
    pages
        .par_iter()
        .map(|table| reconstructor.reconstruct(table))
        .collect()
}
