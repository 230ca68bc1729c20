//! In-process response table.
//!
//! Backs local runs and tests. Mirrors the behavior of a key-value table with
//! an optional secondary index on `downloadStatus`: queries against an index
//! that was never provisioned fail, and updates on an unknown id create the
//! record.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::types::{fields, DownloadStatus, Record, RecordFilter, RecordUpdate};
use crate::store::{ResponseStore, StoreError};

/// Thread-safe in-memory table of response records.
pub struct MemoryResponseStore {
    table: String,
    status_index: Option<String>,
    records: DashMap<String, Record>,
    calls: AtomicUsize,
}

impl MemoryResponseStore {
    /// Create an empty table without a status index.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            status_index: None,
            records: DashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provision a secondary index on `downloadStatus`.
    pub fn with_status_index(mut self, index: impl Into<String>) -> Self {
        self.status_index = Some(index.into());
        self
    }

    /// Insert or replace a record. The record must carry a string `id`.
    pub fn insert(&self, record: Record) -> Result<(), StoreError> {
        let id = record
            .id()
            .ok_or_else(|| StoreError::InvalidRecord("record has no string id".into()))?
            .to_string();
        self.records.insert(id, record);
        Ok(())
    }

    /// Load a JSON array of record objects.
    pub async fn load_seed(&self, path: &Path) -> Result<usize, StoreError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Backend(format!("reading {}: {e}", path.display())))?;
        let items: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        let count = items.len();
        for item in items {
            self.insert(Record::from_json(item)?)?;
        }
        tracing::info!(path = %path.display(), records = count, "Loaded seed records");
        Ok(count)
    }

    /// Read a record directly, bypassing the operation counter.
    pub fn peek(&self, id: &str) -> Option<Record> {
        self.records.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of store operations served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self, table: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if table == self.table {
            Ok(())
        } else {
            Err(StoreError::TableNotFound(table.to_string()))
        }
    }

    fn select<F>(&self, keep: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        let mut records: Vec<Record> = self
            .records
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.id().cmp(&b.id()));
        records
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn query_by_status(
        &self,
        table: &str,
        index: &str,
        status: DownloadStatus,
    ) -> Result<Vec<Record>, StoreError> {
        self.begin(table)?;
        if self.status_index.as_deref() != Some(index) {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        let filter = RecordFilter::DownloadStatus(status);
        Ok(self.select(|r| filter.matches(r)))
    }

    async fn scan_all(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        self.begin(table)?;
        Ok(self.select(|_| true))
    }

    async fn scan_filtered(
        &self,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError> {
        self.begin(table)?;
        Ok(self.select(|r| filter.matches(r)))
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Result<Option<Record>, StoreError> {
        self.begin(table)?;
        Ok(self.peek(id))
    }

    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        update: &RecordUpdate,
    ) -> Result<(), StoreError> {
        self.begin(table)?;
        self.records
            .entry(id.to_string())
            .or_insert_with(|| Record::new().with(fields::ID, id))
            .apply(update);
        Ok(())
    }
}
