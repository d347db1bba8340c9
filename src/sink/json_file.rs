// src/sink/json_file.rs

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use super::{apply_records, lock, RecordSink};
use crate::error::SinkError;
use crate::reconstructor::EntityRecord;

/// Keeps every record in one JSON array file, rewritten after each batch.
pub struct JsonFileSink {
    path: PathBuf,
    records: Mutex<Vec<EntityRecord>>,
}

impl JsonFileSink {
    /// Opens `path`, loading any records already stored there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let records = if path.exists() && fs::metadata(&path)?.len() > 0 {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            Vec::new()
        };
        debug!("Opened {} with {} stored records", path.display(), records.len());

        Ok(Self { path, records: Mutex::new(records) })
    }

    pub fn records(&self) -> Vec<EntityRecord> {
        lock(&self.records).clone()
    }

    fn write(&self, records: &[EntityRecord]) -> Result<(), SinkError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for JsonFileSink {
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
