//! HTTP request handlers for the relay service.
//!
//! Implements the chat, intelligence, context and health endpoints using axum.

use crate::relay::{ChatRelay, RelayError};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use bytes::Bytes;
use futures::StreamExt;
use homekey_catalog::IntelligenceCatalog;
use homekey_domain::{
    compose, ComposeError, Conversation, DashboardSummary, IntelligenceRecord, IntelligenceSource,
    PropertyContext, PropertyDetails,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Chat relay over the configured model
    pub relay: Arc<ChatRelay>,
    /// Read-only intelligence table
    pub catalog: Arc<IntelligenceCatalog>,
}

/// Chat request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    /// Conversation so far, oldest first
    pub messages: Conversation,
    /// Composed property context
    pub property_context: String,
}

/// Context composition request body
#[derive(Debug, Deserialize)]
pub struct ContextRequestBody {
    /// Property slug used for the intelligence lookup
    pub slug: String,
    /// Listing details
    pub property: PropertyDetails,
}

/// Context composition response
#[derive(Debug, Serialize)]
pub struct ContextResponse {
    /// Requested slug
    pub slug: String,
    /// Catalog version the context was built from
    pub version: String,
    /// Composed text
    pub context: PropertyContext,
}

/// Intelligence lookup response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceResponse {
    /// Requested slug
    pub slug: String,
    /// Catalog version
    pub version: String,
    /// Whether the slug was unknown and the default record was returned
    pub is_default: bool,
    /// The record itself
    pub intelligence: IntelligenceRecord,
    /// Derived dashboard figures
    pub summary: DashboardSummary,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model the relay talks to
    pub model: String,
    /// Intelligence table version
    pub catalog_version: String,
    /// Number of properties with their own record
    pub properties: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed or incomplete request
    BadRequest(String),
    /// No such route
    NotFound(String),
    /// Model unreachable or failed before streaming
    BadGateway(String),
    /// Model did not start streaming within the ceiling
    GatewayTimeout(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::BadRequest(msg) => AppError::BadRequest(msg),
            RelayError::Timeout(_) => AppError::GatewayTimeout(e.to_string()),
            RelayError::UpstreamFailure(_) => AppError::BadGateway(e.to_string()),
        }
    }
}

impl From<ComposeError> for AppError {
    fn from(e: ComposeError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// POST /api/chat - Stream the assistant's reply as plain text
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let mut stream = state
        .relay
        .relay(request.messages, &request.property_context)
        .await?;

    // the status line is already sent; an error item aborts the chunked
    // encoding so the client sees a truncated reply, not a finished one
    let body = Body::from_stream(async_stream::stream! {
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => yield Ok::<_, RelayError>(Bytes::from(text)),
                Err(e) => {
                    warn!(error = %e, "Chat stream aborted");
                    yield Err(e);
                    break;
                }
            }
        }
    });

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    Ok((headers, body).into_response())
}

/// GET /api/intelligence/:slug - Intelligence record for a property
async fn intelligence(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<IntelligenceResponse> {
    let is_default = !state.catalog.contains(&slug);
    let record = state.catalog.lookup(&slug);

    if is_default {
        debug!(slug = %slug, "Unknown slug, serving default intelligence");
    }

    Json(IntelligenceResponse {
        version: state.catalog.version().to_string(),
        is_default,
        summary: record.summary(),
        intelligence: record.clone(),
        slug,
    })
}

/// POST /api/context - Compose the property context for a slug
async fn context(
    State(state): State<AppState>,
    payload: Result<Json<ContextRequestBody>, JsonRejection>,
) -> Result<Json<ContextResponse>, AppError> {
    let Json(request) = payload?;

    let record = state.catalog.lookup(&request.slug);
    let context = compose(&request.property, record)?;

    Ok(Json(ContextResponse {
        slug: request.slug,
        version: state.catalog.version().to_string(),
        context,
    }))
}

/// GET /health - Service health
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        model: state.relay.model_name().to_string(),
        catalog_version: state.catalog.version().to_string(),
        properties: state.catalog.len(),
    })
}

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/api/chat", post(chat))
        .route("/api/intelligence/:slug", get(intelligence))
        .route("/api/context", post(context))
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
