//! Record types exchanged with the response store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::store::StoreError;

/// Attribute names of a response record.
pub mod fields {
    pub const ID: &str = "id";
    pub const TOKEN_ID: &str = "tokenId";
    pub const CUESTIONARIO_ID: &str = "cuestionarioId";
    pub const CUESTIONARIO_VERSION: &str = "cuestionarioVersion";
    pub const CUESTIONARIO_TITLE: &str = "cuestionarioTitle";
    pub const STARTED_AT: &str = "startedAt";
    pub const FINISHED_AT: &str = "finishedAt";
    pub const TOTAL_TIME_MS: &str = "totalTimeMs";
    pub const TOTAL_TIME_ADJUSTED_MS: &str = "totalTimeAdjustedMs";
    pub const STATUS: &str = "status";
    pub const DOWNLOAD_STATUS: &str = "downloadStatus";
    pub const DOWNLOADED_AT: &str = "downloadedAt";
    pub const DOWNLOADED_BY: &str = "downloadedBy";
    pub const CREATED_AT: &str = "createdAt";
    pub const ANSWERS: &str = "answersJson";
}

/// A stored attribute. Numbers are arbitrary-precision decimals.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    String(String),
    Number(Decimal),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON document into an attribute, reading numbers as decimals.
    pub fn from_json(value: serde_json::Value) -> Result<Self, StoreError> {
        Ok(match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::String(s) => AttributeValue::String(s),
            serde_json::Value::Number(n) => {
                let text = n.to_string();
                let decimal = Decimal::from_str_exact(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map_err(|e| StoreError::InvalidRecord(format!("number {text}: {e}")))?;
                AttributeValue::Number(decimal)
            }
            serde_json::Value::Array(items) => AttributeValue::List(
                items
                    .into_iter()
                    .map(AttributeValue::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => AttributeValue::Map(
                map.into_iter()
                    .map(|(k, v)| AttributeValue::from_json(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Null => serializer.serialize_unit(),
            AttributeValue::Bool(b) => serializer.serialize_bool(*b),
            AttributeValue::String(s) => serializer.serialize_str(s),
            AttributeValue::Number(d) => serialize_decimal(d, serializer),
            AttributeValue::List(items) => serializer.collect_seq(items),
            AttributeValue::Map(map) => serializer.collect_map(map),
        }
    }
}

/// Whole decimals are written as JSON integers, everything else as floats.
pub fn serialize_decimal<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return serializer.serialize_i64(i);
        }
        if let Some(u) = value.to_u64() {
            return serializer.serialize_u64(u);
        }
    }
    match value.to_f64() {
        Some(f) => serializer.serialize_f64(f),
        None => Err(S::Error::custom(format!("decimal {value} is not representable"))),
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<Decimal> for AttributeValue {
    fn from(value: Decimal) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(Decimal::from(value))
    }
}

/// Lifecycle of a record with respect to external download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloaded,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DownloadStatus::Pending),
            "downloaded" => Ok(DownloadStatus::Downloaded),
            other => Err(StoreError::InvalidRecord(format!("unknown download status '{other}'"))),
        }
    }
}

impl From<DownloadStatus> for AttributeValue {
    fn from(value: DownloadStatus) -> Self {
        AttributeValue::String(value.as_str().to_string())
    }
}

/// A schemaless response record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attribute value, or `Null` when absent.
    pub fn field(&self, name: &str) -> AttributeValue {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(fields::ID).and_then(AttributeValue::as_str)
    }

    pub fn download_status(&self) -> Option<DownloadStatus> {
        self.get(fields::DOWNLOAD_STATUS)
            .and_then(AttributeValue::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &RecordUpdate) {
        for (name, value) in &update.set {
            self.attributes.insert(name.clone(), value.clone());
        }
        for name in &update.remove {
            self.attributes.remove(name);
        }
    }

    /// Build a record from a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, StoreError> {
        match AttributeValue::from_json(value)? {
            AttributeValue::Map(attributes) => Ok(Self { attributes }),
            _ => Err(StoreError::InvalidRecord("record must be a JSON object".into())),
        }
    }
}

/// Partial update: attributes to set, then attributes to remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub set: BTreeMap<String, AttributeValue>,
    pub remove: Vec<String>,
}

impl RecordUpdate {
    pub fn set(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.set.insert(name.to_string(), value.into());
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.remove.push(name.to_string());
        self
    }

    /// pending → downloaded, stamping who and when.
    pub fn mark_downloaded(downloaded_at: &str, downloaded_by: &str) -> Self {
        Self::default()
            .set(fields::DOWNLOAD_STATUS, DownloadStatus::Downloaded)
            .set(fields::DOWNLOADED_AT, downloaded_at)
            .set(fields::DOWNLOADED_BY, downloaded_by)
    }

    /// downloaded → pending, clearing the download stamp.
    pub fn mark_pending() -> Self {
        Self::default()
            .set(fields::DOWNLOAD_STATUS, DownloadStatus::Pending)
            .remove(fields::DOWNLOADED_AT)
            .remove(fields::DOWNLOADED_BY)
    }
}

/// Predicate for filtered scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    DownloadStatus(DownloadStatus),
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordFilter::DownloadStatus(status) => record.download_status() == Some(*status),
        }
    }
}
