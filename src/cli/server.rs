//! HTTP server mode for REST API access to paging operations

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::PageRequest;
use crate::connector::Connector;
use crate::error::{Error, ErrorClass, Result};

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Datasource definition file
    pub datasource: PathBuf,
}

/// App state shared across handlers
struct AppState {
    connector: Connector,
}

/// Request body for the pages endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    /// Entity id
    entity: String,
    /// Maximum objects in the page
    #[serde(alias = "page_size")]
    page_size: usize,
    /// Cursor returned by the previous page
    #[serde(default)]
    cursor: String,
    /// Accounts overriding the datasource list
    #[serde(default, alias = "accounts")]
    account_list: Option<Vec<String>>,
    /// Request deadline
    #[serde(default, alias = "timeout_ms")]
    timeout_ms: Option<u64>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            retryable: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            retryable: Some(err.is_retryable()),
        }
    }
}

/// Status code for a failed request
fn error_status(err: &Error) -> StatusCode {
    match err.class() {
        ErrorClass::Caller => StatusCode::BAD_REQUEST,
        ErrorClass::Retryable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Fatal => StatusCode::BAD_GATEWAY,
        ErrorClass::Record => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Error) -> Response {
    tracing::warn!("Request failed: {}", err);
    (error_status(err), Json(ApiResponse::error(err))).into_response()
}

/// Build the router for a connector
pub fn router(connector: Connector) -> Router {
    let state = AppState { connector };

    // Build CORS layer - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/entities", get(list_entities))
        .route("/pages", post(get_page))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let connector = Connector::from_file(&config.datasource)?;
    let app = router(connector);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// List served entities
async fn list_entities(State(state): State<Arc<AppState>>) -> Response {
    match state.connector.describe() {
        Ok(entities) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "datasource": state.connector.name(),
                "entities": entities,
            }))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Serve one page
async fn get_page(State(state): State<Arc<AppState>>, Json(body): Json<PageBody>) -> Response {
    let entity = match state.connector.entity(&body.entity) {
        Ok(entity) => entity.clone(),
        Err(e) => return error_response(&e),
    };

    let mut request = PageRequest::new(entity, body.page_size).with_cursor(body.cursor);
    if let Some(accounts) = body.account_list {
        request = request.with_accounts(accounts);
    }
    if let Some(ms) = body.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }

    match state.connector.get_page(&request).await {
        Ok(page) => (StatusCode::OK, Json(ApiResponse::success(page))).into_response(),
        Err(e) => error_response(&e),
    }
}
