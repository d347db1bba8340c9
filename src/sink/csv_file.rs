// src/sink/csv_file.rs

use std::path::PathBuf;
use std::sync::Mutex;

use indexmap::IndexSet;
use tracing::debug;

use super::{apply_records, lock, RecordSink};
use crate::error::SinkError;
use crate::reconstructor::EntityRecord;

/// Writes records as a CSV table, rewritten after each batch.
///
/// The header is every field name seen so far, in first-seen order. Cells a
/// record has no value for get `replace_nulls` (empty by default).
pub struct CsvFileSink {
    path: PathBuf,
    replace_nulls: String,
    records: Mutex<Vec<EntityRecord>>,
}

impl CsvFileSink {
    /// Opens `path`. Rows already in the file are loaded back as text; cells
    /// holding the null replacement are treated as absent.
    pub fn open(path: impl Into<PathBuf>, replace_nulls: Option<String>) -> Result<Self, SinkError> {
        let path = path.into();
        let replace_nulls = replace_nulls.unwrap_or_default();

        let mut records = Vec::new();
        if path.exists() {
            let mut reader = csv::Reader::from_path(&path)?;
            let headers = reader.headers()?.clone();
            for row in reader.records() {
                let row = row?;
                let record: EntityRecord = headers
                    .iter()
                    .zip(row.iter())
                    .filter(|(_, cell)| *cell != replace_nulls)
                    .collect();
                records.push(record);
            }
        }
        debug!("Opened {} with {} stored rows", path.display(), records.len());

        Ok(Self { path, replace_nulls, records: Mutex::new(records) })
    }

    pub fn records(&self) -> Vec<EntityRecord> {
        lock(&self.records).clone()
    }

    fn write(&self, records: &[EntityRecord]) -> Result<(), SinkError> {
        let headers: IndexSet<&str> = records.iter().flat_map(EntityRecord::names).collect();

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(&headers)?;
        for record in records {
            let row = headers.iter().map(|name| match record.get(name) {
                Some(value) => value.to_string(),
                None => self.replace_nulls.clone(),
            });
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for CsvFileSink {
    fn persist(&self, records: &[EntityRecord], upsert_key: Option<&str>) -> Result<usize, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut stored = lock(&self.records);
        let mut updated = stored.clone();
        let written = apply_records(&mut updated, records, upsert_key)?;
        self.write(&updated)?;
        *stored = updated;
        Ok(written)
    }
}
