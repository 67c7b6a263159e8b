//! The web shell: a single embedded page plus the JSON API behind it.
//!
//! ## Execution model
//!
//! The UI is strictly request/response, one user action at a time. All
//! session state sits behind one async mutex in [`AppState`]; every
//! handler locks it for the whole action and returns a fresh
//! [`state::StateSnapshot`], so each action is one full re-evaluation of
//! what the page shows. There is no background work, no queuing, and no
//! cancellation — a model load or extraction blocks its request until it
//! completes or fails.

pub mod handlers;
pub mod state;

use crate::config::StudioConfig;
use crate::engine::VisionEngine;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use state::SessionState;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers: one session behind one lock.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<SessionState>>,
}

impl AppState {
    pub fn new(config: StudioConfig, engine: Arc<dyn VisionEngine>) -> Self {
        Self {
            session: Arc::new(Mutex::new(SessionState::new(config, engine))),
        }
    }
}

/// Build the router with every endpoint of the studio.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/state", get(handlers::get_state))
        .route("/api/document", post(handlers::upload_document))
        .route("/api/page", get(handlers::page_image))
        .route("/api/page/next", post(handlers::next_page))
        .route("/api/page/previous", post(handlers::previous_page))
        .route("/api/page/select", post(handlers::select_page))
        .route("/api/model/load", post(handlers::load_model))
        .route("/api/extract", post(handlers::extract))
        .route("/api/result/download", get(handlers::download_result))
        // PDFs routinely exceed the 2 MB default body limit.
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.session.lock().await.config().bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ocr-studio listening on http://{addr}");

    let app = build_router(state);
    axum::serve(listener, app).await
}
