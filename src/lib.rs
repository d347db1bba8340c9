// src/lib.rs

pub mod config;
pub mod crawler;
pub mod error;
pub mod reconstructor;
pub mod records;
pub mod runner;
pub mod sink;

pub use error::{RecordError, ScrapeError};
pub use reconstructor::{reconstruct, EntityRecord, FieldValue, RawFieldTable, Reconstructor};
