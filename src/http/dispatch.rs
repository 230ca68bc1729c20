//! Request dispatch.
//!
//! # Responsibilities
//! - Answer health checks and CORS preflight without credentials
//! - Authenticate, then rate limit, then route
//! - Normalize every outcome into the JSON envelope
//!
//! # Design Decisions
//! - Stages short-circuit on the first failure
//! - A request that outlives the timeout is answered with a 500 envelope
//! - Handler failures are caught here; clients only see the status and `error` string
//! - Rate-limit logs carry a credential prefix, never the full key

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::InvalidHeaderValue;
use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::audit;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::handlers::ResponseHandlers;
use crate::http::request::ApiRequest;
use crate::http::response::{iso_timestamp, ApiResponse, CorsHeaders};
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};
use crate::secrets::SecretSource;
use crate::security::rate_limit::masked_credential;
use crate::security::{Authenticator, RateLimiter, SecretCache};
use crate::store::{PendingLookup, ResponseStore};

const HEALTH_PATH: &str = "/health";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one request through health, preflight, auth, rate limit and routing.
pub struct Dispatcher {
    auth: Arc<Authenticator>,
    limiter: Arc<RateLimiter>,
    routes: RouteTable,
    handlers: ResponseHandlers,
    cors: CorsHeaders,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        auth: Arc<Authenticator>,
        limiter: Arc<RateLimiter>,
        handlers: ResponseHandlers,
        cors: CorsHeaders,
    ) -> Self {
        Self {
            auth,
            limiter,
            routes: RouteTable::new(),
            handlers,
            cors,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wire the security stages and handlers from configuration.
    pub fn from_config(
        config: &ApiConfig,
        secrets: Arc<dyn SecretSource>,
        store: Arc<dyn ResponseStore>,
    ) -> Result<Self, InvalidHeaderValue> {
        let cache = SecretCache::new(
            secrets,
            config.secrets.secret_id.clone(),
            Duration::from_secs(config.secrets.cache_ttl_secs),
        );
        let handlers = ResponseHandlers::new(
            store,
            config.store.table_name.clone(),
            PendingLookup::new(config.store.status_index.clone()),
        );
        Ok(Self::new(
            Arc::new(Authenticator::new(Arc::new(cache))),
            Arc::new(RateLimiter::new(&config.rate_limit)),
            handlers,
            CorsHeaders::new(&config.cors.allowed_origin)?,
        )
        .with_timeout(Duration::from_secs(config.listener.request_timeout_secs)))
    }

    pub async fn dispatch(&self, req: &ApiRequest) -> ApiResponse {
        let start = Instant::now();
        tracing::info!(method = %req.method, path = %req.path, "Request received");

        let (label, response) = match tokio::time::timeout(self.timeout, self.handle(req)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    method = %req.method,
                    path = %req.path,
                    timeout_secs = self.timeout.as_secs(),
                    "Request timed out"
                );
                (
                    "timeout",
                    ApiResponse::error(
                        &self.cors,
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error",
                    ),
                )
            }
        };
        metrics::record_request(label, response.status.as_u16(), start);
        response
    }

    async fn handle(&self, req: &ApiRequest) -> (&'static str, ApiResponse) {
        if req.method == Method::GET && req.path == HEALTH_PATH {
            let body = json!({ "status": "healthy", "timestamp": iso_timestamp() });
            return ("health", ApiResponse::new(StatusCode::OK, &self.cors, body));
        }

        if req.method == Method::OPTIONS {
            return ("preflight", ApiResponse::new(StatusCode::OK, &self.cors, json!({})));
        }

        let credential = req.credential();

        if !self.auth.validate(credential).await {
            audit!(path = %req.path, method = %req.method, "Authentication failed");
            metrics::record_auth_failure();
            return (
                "unauthorized",
                ApiResponse::error_with_message(
                    &self.cors,
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized",
                    "Invalid or missing API key",
                ),
            );
        }

        if !self.limiter.allow(credential) {
            tracing::warn!(
                api_key_prefix = %masked_credential(credential),
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            return (
                "rate_limited",
                ApiResponse::error_with_message(
                    &self.cors,
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests",
                    "Rate limit exceeded",
                ),
            );
        }

        let Some(route) = self.routes.resolve(req) else {
            tracing::warn!(path = %req.path, method = %req.method, "Route not found");
            return (
                "not_found",
                ApiResponse::error(&self.cors, StatusCode::NOT_FOUND, "Not found"),
            );
        };

        let label = route.name();
        let response = match self.run(route).await {
            Ok(response) => response,
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(error = %e, route = label, "Handler error");
                }
                e.to_response(&self.cors)
            }
        };
        (label, response)
    }

    async fn run(&self, route: Route) -> Result<ApiResponse, ApiError> {
        let cors = &self.cors;
        match route {
            Route::ListPending => {
                audit!("Listing pending responses");
                Ok(ApiResponse::ok(cors, &self.handlers.list_pending().await?))
            }
            Route::ListAll => {
                audit!("Listing all responses");
                Ok(ApiResponse::ok(cors, &self.handlers.list_all().await?))
            }
            Route::Download(id) => {
                audit!(id = %id, "Downloading response");
                Ok(ApiResponse::ok(cors, &self.handlers.download(&id).await?))
            }
            Route::Unmark(id) => {
                audit!(id = %id, "Unmarking response");
                Ok(ApiResponse::ok(cors, &self.handlers.unmark(&id).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::http::request::API_KEY_HEADER;
    use crate::secrets::{SecretError, SecretPayload};
    use crate::store::types::fields;
    use crate::store::{AttributeValue, DownloadStatus, MemoryResponseStore, Record, RecordUpdate};
    use async_trait::async_trait;
    use axum::http::header;

    const KEY: &str = "k3y-0123456789abcdef";
    const TABLE: &str = "responses";
    const INDEX: &str = "CuestionarioResponseByDownloadStatus";

    struct FixedSource(Option<String>);

    #[async_trait]
    impl SecretSource for FixedSource {
        async fn get_secret(&self, _id: &str) -> Result<SecretPayload, SecretError> {
            match &self.0 {
                Some(key) => Ok(SecretPayload {
                    api_key: Some(key.clone()),
                }),
                None => Err(SecretError::Fetch("unreachable".into())),
            }
        }
    }

    fn record(id: &str, status: DownloadStatus) -> Record {
        Record::new()
            .with(fields::ID, id)
            .with(fields::TOKEN_ID, format!("tok-{id}"))
            .with(fields::DOWNLOAD_STATUS, status)
            .with(fields::TOTAL_TIME_MS, 5_i64)
            .with(fields::ANSWERS, "[]")
    }

    fn build(
        source: FixedSource,
        table: Option<&str>,
    ) -> (Dispatcher, Arc<MemoryResponseStore>) {
        let store = Arc::new(MemoryResponseStore::new(TABLE).with_status_index(INDEX));
        store.insert(record("abc123", DownloadStatus::Pending)).unwrap();
        store.insert(record("def456", DownloadStatus::Pending)).unwrap();
        store.insert(record("old789", DownloadStatus::Downloaded)).unwrap();

        let cache = SecretCache::new(
            Arc::new(source),
            Some("api-key".to_string()),
            Duration::from_secs(300),
        );
        let handlers = ResponseHandlers::new(
            store.clone(),
            table.map(str::to_string),
            PendingLookup::new(INDEX),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(Authenticator::new(Arc::new(cache))),
            Arc::new(RateLimiter::new(&RateLimitConfig::default())),
            handlers,
            CorsHeaders::default(),
        );
        (dispatcher, store)
    }

    fn setup() -> (Dispatcher, Arc<MemoryResponseStore>) {
        build(FixedSource(Some(KEY.to_string())), Some(TABLE))
    }

    fn authed(method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, path).with_header(API_KEY_HEADER, KEY)
    }

    #[tokio::test]
    async fn test_health_and_preflight_need_no_credential() {
        let (dispatcher, store) = setup();

        let health = dispatcher.dispatch(&ApiRequest::new(Method::GET, "/health")).await;
        assert_eq!(health.status, StatusCode::OK);
        assert_eq!(health.body["status"], "healthy");
        assert!(health.body["timestamp"].as_str().unwrap().ends_with('Z'));

        let preflight = dispatcher
            .dispatch(&ApiRequest::new(Method::OPTIONS, "/responses/abc123/unmark"))
            .await;
        assert_eq!(preflight.status, StatusCode::OK);
        assert_eq!(preflight.body, json!({}));
        assert_eq!(preflight.header(&header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));

        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_before_store_access() {
        let (dispatcher, store) = setup();

        for req in [
            ApiRequest::new(Method::GET, "/responses/pending"),
            ApiRequest::new(Method::GET, "/responses/all").with_header("X-Api-Key", "wrong"),
            ApiRequest::new(Method::POST, "/responses/abc123/unmark")
                .with_header(API_KEY_HEADER, &KEY[..KEY.len() - 1]),
        ] {
            let resp = dispatcher.dispatch(&req).await;
            assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
            assert_eq!(
                resp.body,
                json!({"error": "Unauthorized", "message": "Invalid or missing API key"})
            );
        }
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_secret_is_unauthorized() {
        let (dispatcher, store) = build(FixedSource(None), Some(TABLE));
        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/all")).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_pending() {
        let (dispatcher, _) = setup();
        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/pending")).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["count"], 2);
        let first = resp.body["responses"][0].as_object().unwrap();
        assert_eq!(first["id"], "abc123");
        assert_eq!(first["totalTimeMs"], 5);
        assert!(!first.contains_key("downloadedAt"));
        assert!(!first.contains_key("downloadedBy"));
        assert!(!first.contains_key("answers"));
    }

    #[tokio::test]
    async fn test_download_marks_and_returns_answers() {
        let (dispatcher, store) = setup();
        let resp = dispatcher
            .dispatch(&authed(Method::GET, "/responses/abc123/download"))
            .await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["id"], "abc123");
        assert_eq!(resp.body["response"]["answers"], "[]");

        let stored = store.peek("abc123").unwrap();
        assert_eq!(stored.download_status(), Some(DownloadStatus::Downloaded));
        assert_eq!(stored.field(fields::DOWNLOADED_BY), AttributeValue::from("external-api"));
        assert_eq!(
            stored.field(fields::DOWNLOADED_AT).as_str(),
            resp.body["downloadedAt"].as_str()
        );
    }

    #[tokio::test]
    async fn test_download_missing_record() {
        let (dispatcher, _) = setup();
        let resp = dispatcher
            .dispatch(&authed(Method::GET, "/responses/missing/download"))
            .await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body, json!({"error": "Response not found"}));
    }

    #[tokio::test]
    async fn test_unmark() {
        let (dispatcher, store) = setup();
        store
            .update_by_id(
                TABLE,
                "abc123",
                &RecordUpdate::mark_downloaded("2026-10-17T10:00:00.000Z", "external-api"),
            )
            .await
            .unwrap();

        let resp = dispatcher
            .dispatch(&authed(Method::POST, "/responses/abc123/unmark"))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            resp.body,
            json!({
                "id": "abc123",
                "status": "pending",
                "message": "Response unmarked for re-download"
            })
        );

        let stored = store.peek("abc123").unwrap();
        assert_eq!(stored.download_status(), Some(DownloadStatus::Pending));
        assert!(!stored.contains(fields::DOWNLOADED_AT));
        assert!(!stored.contains(fields::DOWNLOADED_BY));
    }

    #[tokio::test]
    async fn test_rate_limit_after_100_requests() {
        let (dispatcher, _) = setup();
        for i in 1..=100 {
            let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/all")).await;
            assert_eq!(resp.status, StatusCode::OK, "request {i}");
        }

        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/all")).await;
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.body,
            json!({"error": "Too many requests", "message": "Rate limit exceeded"})
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_rate_limit_log_masks_short_key() {
        let short_key = "s3cr3t!";
        let store = Arc::new(MemoryResponseStore::new(TABLE));
        let cache = SecretCache::new(
            Arc::new(FixedSource(Some(short_key.to_string()))),
            Some("api-key".to_string()),
            Duration::from_secs(300),
        );
        let limits = RateLimitConfig {
            max_requests: 1,
            ..RateLimitConfig::default()
        };
        let dispatcher = Dispatcher::new(
            Arc::new(Authenticator::new(Arc::new(cache))),
            Arc::new(RateLimiter::new(&limits)),
            ResponseHandlers::new(store, Some(TABLE.to_string()), PendingLookup::new(INDEX)),
            CorsHeaders::default(),
        );

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let req =
            ApiRequest::new(Method::GET, "/responses/all").with_header(API_KEY_HEADER, short_key);
        assert_eq!(dispatcher.dispatch(&req).await.status, StatusCode::OK);
        assert_eq!(dispatcher.dispatch(&req).await.status, StatusCode::TOO_MANY_REQUESTS);

        let output = logs.contents();
        assert!(output.contains("Rate limit exceeded"));
        assert!(output.contains("api_key_prefix=s3c..."));
        assert!(!output.contains(short_key));
    }

    struct StalledSource;

    #[async_trait]
    impl SecretSource for StalledSource {
        async fn get_secret(&self, _id: &str) -> Result<SecretPayload, SecretError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(SecretError::Fetch("stalled".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_answers_with_envelope() {
        let cache = SecretCache::new(
            Arc::new(StalledSource),
            Some("api-key".to_string()),
            Duration::from_secs(300),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(Authenticator::new(Arc::new(cache))),
            Arc::new(RateLimiter::new(&RateLimitConfig::default())),
            ResponseHandlers::new(
                Arc::new(MemoryResponseStore::new(TABLE)),
                Some(TABLE.to_string()),
                PendingLookup::new(INDEX),
            ),
            CorsHeaders::default(),
        )
        .with_timeout(Duration::from_secs(5));

        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/all")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, json!({"error": "Internal server error"}));
        assert_eq!(resp.header(&header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
        assert_eq!(resp.header(&header::CONTENT_TYPE), Some("application/json"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (dispatcher, _) = setup();
        let resp = dispatcher.dispatch(&authed(Method::DELETE, "/responses/abc123")).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_missing_table_is_configuration_error() {
        let (dispatcher, store) = build(FixedSource(Some(KEY.to_string())), None);
        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/pending")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, json!({"error": "Configuration error"}));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let (dispatcher, _) = build(FixedSource(Some(KEY.to_string())), Some("gone"));
        let resp = dispatcher.dispatch(&authed(Method::GET, "/responses/all")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_from_config_uses_configured_origin() {
        let mut config = ApiConfig::default();
        config.cors.allowed_origin = "https://portal.example".to_string();
        config.store.table_name = Some(TABLE.to_string());

        let store = Arc::new(MemoryResponseStore::new(TABLE));
        let dispatcher =
            Dispatcher::from_config(&config, Arc::new(FixedSource(None)), store).unwrap();
        let resp = dispatcher.dispatch(&ApiRequest::new(Method::GET, "/health")).await;
        assert_eq!(
            resp.header(&header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://portal.example")
        );
    }
}
