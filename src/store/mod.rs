//! Response record storage.
//!
//! # Data Flow
//! ```text
//! Route handler
//!     → lookup.rs (pending: indexed query, then filtered scan)
//!     → ResponseStore (query / scan / get / update)
//!         → memory.rs (in-process table)
//!     → types.rs (Record, AttributeValue, RecordUpdate)
//! ```
//!
//! # Design Decisions
//! - Records are schemaless attribute maps; handlers project the fields they expose
//! - Numbers stay decimals until serialization
//! - The store applies partial updates; it never re-checks record state

pub mod lookup;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use lookup::PendingLookup;
pub use memory::MemoryResponseStore;
pub use types::{AttributeValue, DownloadStatus, Record, RecordFilter, RecordUpdate};

/// Errors surfaced by a response store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Operations the API needs from the record table.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Query the status index for records in `status`.
    async fn query_by_status(
        &self,
        table: &str,
        index: &str,
        status: DownloadStatus,
    ) -> Result<Vec<Record>, StoreError>;

    /// Every record in the table.
    async fn scan_all(&self, table: &str) -> Result<Vec<Record>, StoreError>;

    /// Every record matching `filter`, without an index.
    async fn scan_filtered(
        &self,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError>;

    async fn get_by_id(&self, table: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Apply a partial update to the record with `id`.
    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        update: &RecordUpdate,
    ) -> Result<(), StoreError>;
}
