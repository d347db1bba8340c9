// src/sink/mod.rs

//! Record sinks: where finished records end up.
//!
//! Every sink either appends records, or upserts them by a key field: the
//! stored record with the same key value gets the new record's fields set
//! on it, and records with an unseen key are inserted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod csv_file;
mod json_file;

pub use csv_file::CsvFileSink;
pub use json_file::JsonFileSink;

use crate::config::{SinkConfig, SinkKind};
use crate::error::SinkError;
use crate::reconstructor::EntityRecord;

pub trait RecordSink: Send + Sync {
    /// Persists `records`, returning how many were written.
    fn persist(&self, records: &[EntityRecord], upsert_key: Option<&str>) -> Result<usize, SinkError>;
}

/// Opens the sink described by `config`.
pub fn open(config: &SinkConfig) -> Result<Arc<dyn RecordSink>, SinkError> {
    let path = || {
        config.path.clone().ok_or_else(|| {
            SinkError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "sink path not set"))
        })
    };
    let sink: Arc<dyn RecordSink> = match config.kind {
        SinkKind::Memory => Arc::new(MemorySink::new()),
        SinkKind::Json => Arc::new(JsonFileSink::open(path()?)?),
        SinkKind::Csv => Arc::new(CsvFileSink::open(path()?, config.replace_nulls.clone())?),
    };
    Ok(sink)
}

/// Applies `records` to `stored`, appending or upserting by `upsert_key`.
///
/// Key fields are checked before anything is changed, so a bad batch leaves
/// `stored` untouched.
pub(crate) fn apply_records(
    stored: &mut Vec<EntityRecord>,
    records: &[EntityRecord],
    upsert_key: Option<&str>,
) -> Result<usize, SinkError> {
    let Some(key) = upsert_key else {
        stored.extend_from_slice(records);
        return Ok(records.len());
    };

    if let Some(index) = records.iter().position(|r| !r.contains(key)) {
        return Err(SinkError::MissingUpsertKey { index, key: key.to_string() });
    }

    // Keys compare by their rendered text: file sinks reload numbers as text.
    for record in records {
        let key_value = record.get(key).map(ToString::to_string);
        match stored
            .iter_mut()
            .find(|existing| existing.get(key).map(ToString::to_string) == key_value)
        {
            Some(existing) => existing.merge(record),
            None => stored.push(record.clone()),
        }
    }
    Ok(records.len())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps records in memory. Useful for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<EntityRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything persisted so far.
    pub fn records(&self) -> Vec<EntityRecord> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }
}

impl RecordSink for MemorySink {
    fn persist(&self, records: &[EntityRecord], upsert_key: Option<&str>) -> Result<usize, SinkError> {
        let mut stored = lock(&self.records);
        apply_records(&mut stored, records, upsert_key)
    }
}
