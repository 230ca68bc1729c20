//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use responses_api::config::{ApiConfig, SecretProvider};
use responses_api::lifecycle::startup::{self, RunningServer};
use responses_api::store::types::fields;
use responses_api::store::{DownloadStatus, MemoryResponseStore, Record};
use serde_json::json;

pub const API_KEY: &str = "test-key-7f3a9c21e8b44d06";
pub const TABLE: &str = "CuestionarioResponse-test";

/// A running server plus handles the tests assert against.
pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryResponseStore>,
    pub client: reqwest::Client,
    server: RunningServer,
    secret_file: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-api-key", API_KEY)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-api-key", API_KEY)
            .send()
            .await
            .unwrap()
    }

    pub async fn stop(self) {
        self.server.stop().await.unwrap();
        let _ = tokio::fs::remove_file(&self.secret_file).await;
    }
}

/// Default test configuration: ephemeral port, file-backed secret, table set.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.store.table_name = Some(TABLE.to_string());
    config
}

/// Start the server with `config`, a secret file holding `API_KEY`, and the
/// given records.
pub async fn spawn_app_with(mut config: ApiConfig, records: Vec<Record>) -> TestApp {
    let secret_file =
        std::env::temp_dir().join(format!("responses-api-secret-{}.json", uuid::Uuid::new_v4()));
    tokio::fs::write(&secret_file, json!({ "apiKey": API_KEY }).to_string())
        .await
        .unwrap();
    config.secrets.provider = SecretProvider::File;
    config.secrets.secret_id = Some(secret_file.display().to_string());

    let store = Arc::new(startup::memory_store(&config.store).await.unwrap());
    for record in records {
        store.insert(record).unwrap();
    }

    let server = startup::start(&config, startup::secret_source(&config.secrets), store.clone())
        .await
        .unwrap();

    TestApp {
        addr: server.local_addr,
        store,
        client: reqwest::Client::new(),
        server,
        secret_file,
    }
}

pub async fn spawn_app(records: Vec<Record>) -> TestApp {
    spawn_app_with(test_config(), records).await
}

/// A fully populated response record.
pub fn response_record(id: &str, status: DownloadStatus) -> Record {
    Record::from_json(json!({
        "id": id,
        "tokenId": format!("token-{id}"),
        "cuestionarioId": "cuestionario-1",
        "cuestionarioVersion": 2,
        "cuestionarioTitle": "Encuesta de salida",
        "startedAt": "2026-10-16T08:00:00.000Z",
        "finishedAt": "2026-10-16T08:05:30.000Z",
        "totalTimeMs": 330000,
        "totalTimeAdjustedMs": 329500.5,
        "status": "COMPLETED",
        "downloadStatus": status.as_str(),
        "createdAt": "2026-10-16T08:05:31.000Z",
        "answersJson": [{"questionId": "q1", "value": 5}, {"questionId": "q2", "value": "no"}]
    }))
    .unwrap()
}

pub fn downloaded_record(id: &str, at: &str) -> Record {
    response_record(id, DownloadStatus::Downloaded)
        .with(fields::DOWNLOADED_AT, at)
        .with(fields::DOWNLOADED_BY, "external-api")
}
