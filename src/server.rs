//! HTTP surface: health check and the processed bus feed.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::envelope::EnvelopeUnwrapper;
use crate::error::ProcessError;
use crate::fetch::{BasicClient, HttpClient};
use crate::limit::Limit;
use crate::pipeline::fetch_and_process;
use crate::record::CanonicalRecord;

pub const HEALTH_MESSAGE: &str = "Rio bus processing API is running.";

/// Read-only state shared by all requests.
#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn HttpClient>,
    unwrapper: Arc<EnvelopeUnwrapper>,
    upstream_url: Arc<str>,
    fetch_permits: Arc<Semaphore>,
}

impl AppState {
    /// `max_concurrent_fetches` caps in-flight upstream requests across all
    /// callers; at least one is always allowed.
    pub fn new(
        client: Arc<dyn HttpClient>,
        upstream_url: impl Into<Arc<str>>,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            client,
            unwrapper: Arc::new(EnvelopeUnwrapper::default()),
            upstream_url: upstream_url.into(),
            fetch_permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
        }
    }

    pub fn with_unwrapper(mut self, unwrapper: EnvelopeUnwrapper) -> Self {
        self.unwrapper = Arc::new(unwrapper);
        self
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = BasicClient::with_timeout(config.timeout)
            .context("Failed to build upstream HTTP client")?;
        Ok(Self::new(
            Arc::new(client),
            config.upstream_url.as_str(),
            config.max_concurrent_fetches,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/processed_data", get(processed_data))
        .with_state(state)
}

/// Binds `config.bind_addr()` and serves until Ctrl-C.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        upstream = %config.upstream_url,
        timeout_secs = config.timeout.as_secs(),
        max_concurrent_fetches = config.max_concurrent_fetches,
        "Listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": HEALTH_MESSAGE }))
}

#[derive(Debug, Deserialize)]
struct ProcessedDataQuery {
    limit: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn processed_data(
    State(state): State<AppState>,
    Query(query): Query<ProcessedDataQuery>,
) -> Result<Json<Vec<CanonicalRecord>>, ProcessError> {
    let limit = Limit::parse(query.limit.as_deref());

    let (records, _stats) = {
        let _permit = state
            .fetch_permits
            .acquire()
            .await
            .map_err(|e| ProcessError::internal(format!("fetch limiter closed: {e}")))?;
        fetch_and_process(state.client.as_ref(), &state.unwrapper, &state.upstream_url).await?
    };

    let records = limit.apply(records);
    info!(?limit, returned = records.len(), "Processed data served");
    Ok(Json(records))
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error!(status = status.as_u16(), error = %self, "Request failed");

        let body = match self.details() {
            Some(details) => json!({ "error": self.summary(), "details": details }),
            None => json!({ "error": self.summary() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ShapeError};

    #[test]
    fn test_timeout_renders_gateway_timeout() {
        let resp = ProcessError::from(FetchError::Timeout).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_transport_renders_bad_gateway() {
        let resp = ProcessError::from(FetchError::Transport {
            detail: "connection refused".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_shape_error_renders_internal_error() {
        let resp = ProcessError::from(ShapeError::UnrecognizedShape).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], HEALTH_MESSAGE);
    }
}
