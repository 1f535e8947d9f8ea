//! Mailspend Web Server
//!
//! Axum-based JSON API backing the dashboard. All data lives in an
//! in-memory session behind a `RwLock`; nothing is persisted. The session
//! starts empty and is populated by POST /api/session/refresh, which runs
//! the mailbox analysis pipeline. Logout drops the session state.

use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use mailspend_core::{Config, Pipeline, Session};

mod handlers;


/// Shared application state
pub struct AppState {
    /// Session data, rebuilt by each refresh
    pub session: RwLock<Session>,
    /// Analysis pipeline (fetcher config + categorizer + detector)
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            pipeline: Pipeline::new(config),
        }
    }

    /// State with a pre-built pipeline (used by tests to inject a
    /// rules-only categorizer)
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            pipeline,
        }
    }
}

/// Build the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::get_health))
        // Session lifecycle
        .route("/session/refresh", post(handlers::refresh_session))
        .route("/session/logout", post(handlers::logout_session))
        // Data
        .route("/transactions", get(handlers::list_transactions))
        .route("/subscriptions", get(handlers::list_subscriptions))
        .route("/reports/summary", get(handlers::get_summary))
        .route("/export/transactions", get(handlers::export_transactions));

    // Same-origin only; the dashboard is served from the same host
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(config: Config, addr: &str) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config));

    if !state.pipeline.has_remote_classifier() {
        warn!("No classify API token configured; the server will use rule-based classification");
    }

    let app = create_router(state);

    info!("Starting server at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Pipeline errors map to status codes by kind: bad credentials are the
/// caller's problem (401), an unreachable mailbox is upstream (502), a bad
/// config is ours (500).
impl From<mailspend_core::Error> for AppError {
    fn from(err: mailspend_core::Error) -> Self {
        use mailspend_core::Error as E;

        let (status, message) = match &err {
            E::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "Mailbox authentication failed".to_string(),
            ),
            E::Fetch(_) | E::Imap(_) | E::Tls(_) => (
                StatusCode::BAD_GATEWAY,
                "Could not reach the mailbox".to_string(),
            ),
            E::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        Self {
            status,
            message,
            internal: Some(err.into()),
        }
    }
}
