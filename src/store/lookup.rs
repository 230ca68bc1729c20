//! Pending-record lookup strategy.
//!
//! Primary step queries the `downloadStatus` index. If that fails for any
//! reason (index missing, still backfilling, throttled) the lookup falls back
//! to a full scan with the same predicate and records the fallback.

use crate::observability::metrics;
use crate::store::types::{DownloadStatus, Record, RecordFilter};
use crate::store::{ResponseStore, StoreError};

/// Indexed query with a predicate-scan fallback.
#[derive(Debug, Clone)]
pub struct PendingLookup {
    index: String,
}

impl PendingLookup {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    /// Records whose `downloadStatus` is pending.
    pub async fn fetch(
        &self,
        store: &dyn ResponseStore,
        table: &str,
    ) -> Result<Vec<Record>, StoreError> {
        let status = DownloadStatus::Pending;
        match store.query_by_status(table, &self.index, status).await {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    index = %self.index,
                    "Status index query failed, falling back to scan"
                );
                metrics::record_index_fallback();
                store
                    .scan_filtered(table, &RecordFilter::DownloadStatus(status))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::fields;
    use crate::store::MemoryResponseStore;

    const TABLE: &str = "responses";

    fn store(index: Option<&str>) -> MemoryResponseStore {
        let store = MemoryResponseStore::new(TABLE);
        let store = match index {
            Some(index) => store.with_status_index(index),
            None => store,
        };
        for (id, status) in [("1", "pending"), ("2", "downloaded"), ("3", "pending")] {
            store
                .insert(Record::new().with(fields::ID, id).with(fields::DOWNLOAD_STATUS, status))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_uses_index_when_available() {
        let store = store(Some("ByStatus"));
        let records = PendingLookup::new("ByStatus").fetch(&store, TABLE).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_scan() {
        let store = store(None);
        let records = PendingLookup::new("ByStatus").fetch(&store, TABLE).await.unwrap();

        let ids: Vec<_> = records.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
        // failed query + fallback scan
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scan_failure_propagates() {
        let store = store(Some("ByStatus"));
        let result = PendingLookup::new("ByStatus").fetch(&store, "missing-table").await;
        assert!(matches!(result, Err(StoreError::TableNotFound(_))));
    }
}
