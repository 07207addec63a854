//! Fake upstream bus feed for integration tests.
//!
//! Spins up a minimal `axum` server on a random port bound to 127.0.0.1 that
//! answers `GET /gps/sppo` with a fixed status and body, optionally after a
//! delay. It counts how many times it was hit and the most requests it saw
//! in flight at once.

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

struct FeedState {
    status: StatusCode,
    body: String,
    delay: Duration,
    hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Handle to the running fake feed.
pub struct FakeFeed {
    addr: SocketAddr,
    state: Arc<FeedState>,
}

impl FakeFeed {
    /// Serve `body` with `200 OK`.
    pub async fn ok(body: impl Into<String>) -> Self {
        Self::start(StatusCode::OK, body, Duration::ZERO).await
    }

    pub async fn start(status: StatusCode, body: impl Into<String>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(FeedState {
            status,
            body: body.into(),
            delay,
            hits: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/gps/sppo", get(serve_feed))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Full feed URL (e.g. `http://127.0.0.1:PORT/gps/sppo`).
    pub fn url(&self) -> String {
        format!("http://{}/gps/sppo", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were being served at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn serve_feed(State(state): State<Arc<FeedState>>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    (
        state.status,
        [("content-type", "application/json")],
        state.body.clone(),
    )
}

/// A URL on which nothing is listening.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/gps/sppo")
}
