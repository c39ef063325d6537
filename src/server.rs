//! HTTP search server.
//!
//! Exposes the similarity search engine over a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/healthz` | Health check |
//! | `GET`  | `/search` | Search via query-string parameters |
//! | `POST` | `/search` | Search via JSON body |
//!
//! # Error Contract
//!
//! - `400` `{"error": ...}` — missing `query`, or `limit` not an integer
//! - `503` `{"error": ...}` — catalog/vector tables not initialized
//! - `500` `{"error": ..., "detail"?: ...}` — database failure; `detail`
//!   carries the driver message only when one is available (SQLite driver
//!   messages are credential-free)
//! - `500` `{"error": ...}` — anything else, with no internals leaked
//!
//! The search path is stateless per request: each call borrows one pooled
//! connection for its single read and the pool reclaims it on every exit
//! path, rolling back any open transaction first.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingService};
use crate::error::CatalogError;
use crate::search::search_courses;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
    service: Arc<dyn EmbeddingService>,
}

/// Start the search server on the configured bind address.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = embedding::create_service(&config.embedding)?;
    let pool = db::connect(config).await?;

    let state = AppState { pool, service };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/search", get(handle_search_get).post(handle_search_post))
        .layer(cors)
        .with_state(state);

    println!("Search server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response: `{"error": ..., "detail"?: ...}`.
#[derive(Serialize)]
#[derive(Debug)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                detail: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map engine failures onto the response contract. Internals are logged,
/// never surfaced; the only pass-through is the credential-free driver
/// message attached as `detail` on database failures.
fn classify_search_error(err: CatalogError) -> ApiError {
    match &err {
        CatalogError::InvalidArgument(msg) => ApiError::bad_request(msg.clone()),
        CatalogError::SchemaNotInitialized(_) => {
            error!("database tables missing during search request: {}", err);
            ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: ErrorBody {
                    error: "Course data not initialised. Run the bootstrap pipeline and retry."
                        .to_string(),
                    detail: None,
                },
            }
        }
        CatalogError::Database(_) => {
            error!("database error during search request: {}", err);
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: "Search failed due to a database error.".to_string(),
                    detail: err.database_detail(),
                },
            }
        }
        _ => {
            error!("unhandled error during search request: {}", err);
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: "Search failed due to an unexpected error.".to_string(),
                    detail: None,
                },
            }
        }
    }
}

// ============ GET /healthz ============

async fn handle_healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============ GET|POST /search ============

/// `limit` may arrive as a JSON number, a numeric string, or be absent;
/// anything else is a client error.
fn parse_limit(value: Option<&serde_json::Value>) -> Result<Option<i64>, ApiError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("'limit' must be an integer.")),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::bad_request("'limit' must be an integer.")),
        Some(_) => Err(ApiError::bad_request("'limit' must be an integer.")),
    }
}

async fn handle_search_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let payload: serde_json::Value = serde_json::json!(params);
    perform_search(&state, &payload).await
}

async fn handle_search_post(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    // A missing or unparseable body degrades to an empty payload, which
    // fails below with the missing-query message rather than a 415.
    let payload: serde_json::Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}));
    perform_search(&state, &payload).await
}

async fn perform_search(
    state: &AppState,
    payload: &serde_json::Value,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = payload
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let school = payload
        .get("school")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let limit = parse_limit(payload.get("limit"))?;

    let hits = search_courses(
        &state.pool,
        state.service.as_ref(),
        &query,
        school.as_deref(),
        limit,
    )
    .await
    .map_err(classify_search_error)?;

    Ok(Json(serde_json::json!({ "results": hits })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_limit_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(
            parse_limit(Some(&serde_json::json!(25))).unwrap(),
            Some(25)
        );
        assert_eq!(
            parse_limit(Some(&serde_json::json!("25"))).unwrap(),
            Some(25)
        );
    }

    #[test]
    fn parse_limit_rejects_non_integers() {
        assert!(parse_limit(Some(&serde_json::json!("many"))).is_err());
        assert!(parse_limit(Some(&serde_json::json!(2.5))).is_err());
        assert!(parse_limit(Some(&serde_json::json!([1]))).is_err());
    }

    #[test]
    fn invalid_argument_maps_to_400() {
        let api = classify_search_error(CatalogError::invalid_argument("'query' is required."));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.error, "'query' is required.");
    }

    #[test]
    fn missing_schema_maps_to_503() {
        let api = classify_search_error(CatalogError::SchemaNotInitialized(
            "no such table: courses".to_string(),
        ));
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api.body.detail.is_none());
    }

    #[test]
    fn unexpected_errors_map_to_generic_500() {
        let api = classify_search_error(CatalogError::embedding("backend down"));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.error, "Search failed due to an unexpected error.");
        assert!(api.body.detail.is_none());
    }
}
