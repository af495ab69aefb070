//!
//! personas storage module
//! ------------------------
//! The dataset is a single CSV object at a fixed bucket/key. Every operation
//! fetches it whole and every write replaces it whole:
//!
//! - `read_dataset`: fetch, decode UTF-8, parse CSV rows. A missing object reads
//!   as a dataset holding only the header row.
//! - `write_dataset`: serialize all rows and overwrite the object unconditionally.
//! - `append_record`: read, push one row, write.
//! - `count_records`: rows minus the header, never below zero.
//!
//! Nothing is locked. Two appends racing on the same object can interleave their
//! read and write phases, and the later write drops the earlier record. The object
//! store's own put atomicity is the only guarantee a failed write leaves the prior
//! object intact.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::persona::PersonRecord;

pub mod client;
pub mod codec;

pub use client::{FetchOutcome, ObjectClient, ObjectLocation, ObjectStoreClient, StoreBackend};

pub const HEADER: [&str; 3] = ["name", "age", "height"];
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// One CSV row as opaque fields.
pub type Row = Vec<String>;

pub fn header_row() -> Row { HEADER.iter().map(|s| s.to_string()).collect() }

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read {location}: {source}")]
    Read { location: String, source: object_store::Error },
    #[error("failed to write {location}: {source}")]
    Write { location: String, source: object_store::Error },
    #[error("{location} is not valid UTF-8: {source}")]
    Encoding { location: String, source: std::str::Utf8Error },
    #[error("{location} is not valid CSV: {source}")]
    Csv { location: String, source: csv::Error },
    #[error("failed to serialize dataset for {location}: {source}")]
    Serialize { location: String, source: csv::Error },
}

/// The full persisted collection: header first (when non-empty), then one row per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDataset {
    rows: Vec<Row>,
}

impl CsvDataset {
    /// Dataset holding only the header row.
    pub fn empty() -> Self { Self { rows: vec![header_row()] } }

    pub fn from_rows(rows: Vec<Row>) -> Self { Self { rows } }

    pub fn rows(&self) -> &[Row] { &self.rows }

    pub fn into_rows(self) -> Vec<Row> { self.rows }

    /// Number of data rows, excluding the header.
    pub fn record_count(&self) -> usize { self.rows.len().saturating_sub(1) }

    /// Push a data row. An object that existed but was zero bytes has no header
    /// yet; it gets one first.
    pub fn push(&mut self, row: Row) {
        if self.rows.is_empty() { self.rows.push(header_row()); }
        self.rows.push(row);
    }
}

/// Accessor for the CSV dataset object. Cheap to clone; holds no dataset state.
#[derive(Clone)]
pub struct CsvStore {
    client: Arc<dyn ObjectClient>,
    location: ObjectLocation,
}

impl CsvStore {
    pub fn new(client: Arc<dyn ObjectClient>, location: ObjectLocation) -> Self {
        Self { client, location }
    }

    pub fn location(&self) -> &ObjectLocation { &self.location }

    pub async fn read_dataset(&self) -> Result<CsvDataset, StorageError> {
        let loc = &self.location;
        let outcome = self.client.get_object(loc).await
            .map_err(|source| StorageError::Read { location: loc.to_string(), source })?;
        let data = match outcome {
            FetchOutcome::Found(data) => data,
            FetchOutcome::NotFound => {
                debug!(target: "personas::storage", "read_dataset: '{}' absent, using header only", loc);
                return Ok(CsvDataset::empty());
            }
        };
        let text = std::str::from_utf8(&data)
            .map_err(|source| StorageError::Encoding { location: loc.to_string(), source })?;
        let rows = codec::decode_rows(text)
            .map_err(|source| StorageError::Csv { location: loc.to_string(), source })?;
        debug!(target: "personas::storage", "read_dataset: '{}' rows={}", loc, rows.len());
        Ok(CsvDataset::from_rows(rows))
    }

    pub async fn write_dataset(&self, rows: &[Row]) -> Result<(), StorageError> {
        let loc = &self.location;
        let body = codec::encode_rows(rows)
            .map_err(|source| StorageError::Serialize { location: loc.to_string(), source })?;
        debug!(target: "personas::storage", "write_dataset: '{}' rows={} bytes={}", loc, rows.len(), body.len());
        self.client.put_object(loc, Bytes::from(body), CSV_CONTENT_TYPE).await
            .map_err(|source| StorageError::Write { location: loc.to_string(), source })
    }

    /// Read, append one row, overwrite. Not atomic across the read and the write.
    pub async fn append_record(&self, record: PersonRecord) -> Result<PersonRecord, StorageError> {
        let mut dataset = self.read_dataset().await?;
        dataset.push(record.to_row());
        self.write_dataset(dataset.rows()).await?;
        Ok(record)
    }

    pub async fn count_records(&self) -> Result<usize, StorageError> {
        Ok(self.read_dataset().await?.record_count())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
