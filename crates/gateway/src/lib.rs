//! HTTP API for Lectern.
//!
//! - `POST /api/query`: answer a question, continuing a session if given
//! - `GET /api/courses`: course count and titles
//! - `GET /health`: liveness
//!
//! Built on Axum; every request is traced and bounded by the configured
//! timeout.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use lectern_agent::{CourseAnalytics, CourseAssistant, QueryResponse};
use lectern_config::AppConfig;
use lectern_core::message::SessionId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub assistant: Arc<CourseAssistant>,
}

pub type SharedState = Arc<GatewayState>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the router with all routes and layers.
pub fn build_router(state: SharedState, gateway: &lectern_config::GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/query", post(query_handler))
        .route("/api/courses", get(courses_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(gateway.request_timeout_secs),
        ))
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the HTTP server.
///
/// Loads the configured docs folder before accepting requests; courses
/// already in the index are kept.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = Arc::new(CourseAssistant::from_config(&config).await?);

    match assistant.add_course_folder(Path::new(&config.docs_path), false).await {
        Ok(report) => info!(
            courses = report.courses_added,
            chunks = report.chunks_added,
            skipped = report.skipped.len(),
            "Startup ingestion finished"
        ),
        Err(e) => warn!(error = %e, "Startup ingestion failed"),
    }

    let app = build_router(Arc::new(GatewayState { assistant }), &config.gateway);
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query must not be empty"));
    }
    let session_id = payload
        .session_id
        .filter(|s| !s.trim().is_empty())
        .map(SessionId::from);
    info!(resumed = session_id.is_some(), query_len = payload.query.len(), "Query received");

    state
        .assistant
        .query(&payload.query, session_id)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "Query failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

async fn courses_handler(State(state): State<SharedState>) -> Result<Json<CourseAnalytics>, ApiError> {
    state.assistant.analytics().await.map(Json).map_err(|e| {
        error!(error = %e, "Course analytics failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}
