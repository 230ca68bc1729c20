//! Route handlers for response records.
//!
//! Each handler checks that a record table is configured before it touches
//! the store, then projects records into the fixed field sets the API exposes.
//! Attributes missing from a stored record are omitted from the projection.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ApiError;
use crate::http::response::iso_timestamp;
use crate::store::types::fields;
use crate::store::{AttributeValue, PendingLookup, Record, RecordUpdate, ResponseStore};

/// Value written to `downloadedBy` by the download route.
pub const DOWNLOADED_BY: &str = "external-api";

type Field = Option<AttributeValue>;

/// Fields shared by both list projections.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_id: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_version: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_title: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_adjusted_ms: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_status: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Field,
}

impl From<&Record> for ResponseSummary {
    fn from(r: &Record) -> Self {
        let f = |name: &str| r.get(name).cloned();
        Self {
            id: f(fields::ID),
            token_id: f(fields::TOKEN_ID),
            cuestionario_id: f(fields::CUESTIONARIO_ID),
            cuestionario_version: f(fields::CUESTIONARIO_VERSION),
            cuestionario_title: f(fields::CUESTIONARIO_TITLE),
            started_at: f(fields::STARTED_AT),
            finished_at: f(fields::FINISHED_AT),
            total_time_ms: f(fields::TOTAL_TIME_MS),
            total_time_adjusted_ms: f(fields::TOTAL_TIME_ADJUSTED_MS),
            status: f(fields::STATUS),
            download_status: f(fields::DOWNLOAD_STATUS),
            created_at: f(fields::CREATED_AT),
        }
    }
}

/// Summary plus download stamp, for the unfiltered listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseListing {
    #[serde(flatten)]
    pub summary: ResponseSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_by: Field,
}

impl From<&Record> for ResponseListing {
    fn from(r: &Record) -> Self {
        Self {
            summary: ResponseSummary::from(r),
            downloaded_at: r.get(fields::DOWNLOADED_AT).cloned(),
            downloaded_by: r.get(fields::DOWNLOADED_BY).cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListBody<T> {
    pub count: usize,
    pub responses: Vec<T>,
}

impl<T> From<Vec<T>> for ListBody<T> {
    fn from(responses: Vec<T>) -> Self {
        Self {
            count: responses.len(),
            responses,
        }
    }
}

/// Full record content returned by the download route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_id: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_version: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuestionario_title: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_adjusted_ms: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Field,
}

impl From<&Record> for ResponseDetail {
    fn from(r: &Record) -> Self {
        let f = |name: &str| r.get(name).cloned();
        Self {
            token_id: f(fields::TOKEN_ID),
            cuestionario_id: f(fields::CUESTIONARIO_ID),
            cuestionario_version: f(fields::CUESTIONARIO_VERSION),
            cuestionario_title: f(fields::CUESTIONARIO_TITLE),
            started_at: f(fields::STARTED_AT),
            finished_at: f(fields::FINISHED_AT),
            total_time_ms: f(fields::TOTAL_TIME_MS),
            total_time_adjusted_ms: f(fields::TOTAL_TIME_ADJUSTED_MS),
            status: f(fields::STATUS),
            answers: f(fields::ANSWERS),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    pub id: String,
    pub downloaded_at: String,
    pub response: ResponseDetail,
}

#[derive(Debug, Serialize)]
pub struct UnmarkBody {
    pub id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// Handlers bound to one record table.
pub struct ResponseHandlers {
    store: Arc<dyn ResponseStore>,
    table: Option<String>,
    pending: PendingLookup,
}

impl ResponseHandlers {
    pub fn new(store: Arc<dyn ResponseStore>, table: Option<String>, pending: PendingLookup) -> Self {
        Self {
            store,
            table,
            pending,
        }
    }

    fn table(&self) -> Result<&str, ApiError> {
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Configuration)
    }

    /// `GET /responses/pending`
    pub async fn list_pending(&self) -> Result<ListBody<ResponseSummary>, ApiError> {
        let table = self.table()?;
        let records = self.pending.fetch(self.store.as_ref(), table).await?;
        Ok(records.iter().map(ResponseSummary::from).collect::<Vec<_>>().into())
    }

    /// `GET /responses/all`
    pub async fn list_all(&self) -> Result<ListBody<ResponseListing>, ApiError> {
        let table = self.table()?;
        let records = self.store.scan_all(table).await?;
        Ok(records.iter().map(ResponseListing::from).collect::<Vec<_>>().into())
    }

    /// `GET /responses/{id}/download`
    ///
    /// Marks the record downloaded whatever its current status.
    pub async fn download(&self, id: &str) -> Result<DownloadBody, ApiError> {
        let table = self.table()?;
        let record = self
            .store
            .get_by_id(table, id)
            .await?
            .ok_or(ApiError::NotFound("Response not found"))?;

        let downloaded_at = iso_timestamp();
        self.store
            .update_by_id(table, id, &RecordUpdate::mark_downloaded(&downloaded_at, DOWNLOADED_BY))
            .await?;
        tracing::info!(id = %id, "Response downloaded successfully");

        Ok(DownloadBody {
            id: id.to_string(),
            downloaded_at,
            response: ResponseDetail::from(&record),
        })
    }

    /// `POST /responses/{id}/unmark`
    pub async fn unmark(&self, id: &str) -> Result<UnmarkBody, ApiError> {
        let table = self.table()?;
        self.store
            .update_by_id(table, id, &RecordUpdate::mark_pending())
            .await?;
        tracing::info!(id = %id, "Response unmarked");

        Ok(UnmarkBody {
            id: id.to_string(),
            status: "pending",
            message: "Response unmarked for re-download",
        })
    }
}
