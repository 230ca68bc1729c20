//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every request goes to the dispatcher
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and shut down gracefully
//!
//! # Design Decisions
//! - No layer answers on its own; every response comes from the dispatcher
//!   and carries the CORS/JSON envelope. The request timeout lives there too.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::dispatch::Dispatcher;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for the responses API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router: Self::build_router(dispatcher),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a clone of the router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Feeds every request, whatever its method or path, to the dispatcher.
async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> ApiResponse {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let req = ApiRequest::from_http(&request);
    let response = dispatcher.dispatch(&req).await;

    tracing::debug!(
        request_id = %request_id,
        status = response.status.as_u16(),
        "Request dispatched"
    );
    response
}
