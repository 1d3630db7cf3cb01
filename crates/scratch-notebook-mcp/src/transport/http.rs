//! HTTP, SSE, and metrics transport.
//!
//! - `POST http_path` takes `{tool, params}` and returns the tool envelope,
//!   with the HTTP status derived from the error code.
//! - `GET sse_path` opens an MCP event stream; `POST sse_path` submits a
//!   JSON-RPC request whose response is broadcast to subscribers.
//! - `GET metrics_path` (optional) renders Prometheus text.
//!
//! Draining returns 503 for new requests on every route.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::info;

use scratch_notebook_core::{ErrorCode, ScratchError};

use crate::handlers::Handlers;
use crate::server::AppState;
use crate::shutdown::ServerState;

const SSE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
struct HttpState {
    handlers: Arc<Handlers>,
    app: Arc<AppState>,
    sse_tx: broadcast::Sender<String>,
}

#[derive(Debug, Deserialize)]
struct ToolCallBody {
    tool: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Build the router for the enabled HTTP-family endpoints.
pub fn build_router(handlers: Arc<Handlers>, app: Arc<AppState>) -> Router {
    let (sse_tx, _) = broadcast::channel(SSE_CHANNEL_CAPACITY);
    let state = HttpState {
        handlers,
        app: Arc::clone(&app),
        sse_tx,
    };

    let mut router = Router::new();
    if app.config.enable_http {
        router = router.route(&app.config.http_path, post(handle_tool_call));
    }
    if app.config.enable_sse {
        router = router.route(
            &app.config.sse_path,
            get(handle_sse_stream).post(handle_sse_message),
        );
    }
    if app.config.enable_metrics {
        router = router.route(&app.config.metrics_path, get(handle_metrics));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve the router on TCP or a Unix-domain socket until the gate drains.
pub async fn serve_http(router: Router, app: Arc<AppState>) -> anyhow::Result<()> {
    let gate = app.gate.clone();
    let shutdown = async move {
        let mut rx = gate.subscribe();
        while *rx.borrow() == ServerState::Running {
            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    if let Some(socket_path) = &app.config.http_socket_path {
        if socket_path.exists() {
            let _ = std::fs::remove_file(socket_path);
        }
        let listener = tokio::net::UnixListener::bind(socket_path)?;
        info!("http transport listening on unix socket");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
    } else {
        let address = format!("{}:{}", app.config.http_host, app.config.http_port);
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(%address, "http transport listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
    }
    Ok(())
}

async fn handle_tool_call(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(body): Json<ToolCallBody>,
) -> Response {
    if let Some(response) = draining_response(&state) {
        return response;
    }
    let principal = match resolve_principal(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let envelope = state
        .handlers
        .call_tool(&body.tool, body.params.unwrap_or(json!({})), principal.as_deref())
        .await;
    envelope_response(envelope)
}

async fn handle_sse_stream(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    if let Some(response) = draining_response(&state) {
        return response;
    }
    if let Err(response) = resolve_principal(&state, &headers) {
        return response;
    }

    let rx = state.sse_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|message| match message {
        Ok(message) => Some(Ok::<Event, Infallible>(
            Event::default().event("message").data(message),
        )),
        // lagged subscribers skip missed events rather than erroring out
        Err(_) => None,
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_sse_message(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(response) = draining_response(&state) {
        return response;
    }
    let principal = match resolve_principal(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let response = state
        .handlers
        .handle_request(&body, principal.as_deref())
        .await;
    if !response.is_empty_notification() {
        if let Ok(encoded) = serde_json::to_string(&response) {
            let _ = state.sse_tx.send(encoded);
        }
    }
    (StatusCode::ACCEPTED, Json(json!({ "ok": true }))).into_response()
}

async fn handle_metrics(State(state): State<HttpState>) -> Response {
    let tenant = state.app.active_default_tenant();
    let store = Arc::clone(&state.app.store);
    let counts = tokio::task::spawn_blocking(move || store.snapshot_counts(&tenant)).await;
    match counts {
        Ok(Ok((pads, cells))) => state.app.metrics.set_current_counts(pads, cells),
        _ => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "metrics unavailable\n".to_string(),
            )
                .into_response()
        }
    }
    let body = state.app.metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

/// 503 envelope for requests arriving after drain began.
fn draining_response(state: &HttpState) -> Option<Response> {
    if state.app.gate.is_running() {
        return None;
    }
    let error = ScratchError::config("Server is shutting down");
    Some(
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": error.payload() })),
        )
            .into_response(),
    )
}

/// Resolve the bearer principal, or produce the 401 response.
fn resolve_principal(state: &HttpState, headers: &HeaderMap) -> Result<Option<String>, Response> {
    let Some(registry) = &state.app.auth else {
        return Ok(None);
    };
    let principal = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| registry.resolve_bearer_header(header));
    match principal {
        Some(principal) => Ok(Some(principal.to_string())),
        None => {
            let error = ScratchError::unauthorized("Missing or invalid bearer token");
            Err((
                StatusCode::from_u16(ErrorCode::Unauthorized.http_status())
                    .unwrap_or(StatusCode::UNAUTHORIZED),
                Json(json!({ "ok": false, "error": error.payload() })),
            )
                .into_response())
        }
    }
}

/// Map a tool envelope to its HTTP response; the status derives from the
/// stable error code.
fn envelope_response(envelope: Value) -> Response {
    let status = match envelope.get("ok") {
        Some(Value::Bool(true)) => StatusCode::OK,
        _ => envelope
            .pointer("/error/code")
            .and_then(Value::as_str)
            .map(error_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    };
    (status, Json(envelope)).into_response()
}

fn error_status(code: &str) -> StatusCode {
    let status = match code {
        "NOT_FOUND" => ErrorCode::NotFound.http_status(),
        "INVALID_ID" => ErrorCode::InvalidId.http_status(),
        "INVALID_INDEX" => ErrorCode::InvalidIndex.http_status(),
        "CAPACITY_LIMIT_REACHED" => ErrorCode::CapacityLimitReached.http_status(),
        "VALIDATION_ERROR" => ErrorCode::ValidationError.http_status(),
        "VALIDATION_TIMEOUT" => ErrorCode::ValidationTimeout.http_status(),
        "CONFIG_ERROR" => ErrorCode::ConfigError.http_status(),
        "UNAUTHORIZED" => ErrorCode::Unauthorized.http_status(),
        "CONFLICT" => ErrorCode::Conflict.http_status(),
        _ => ErrorCode::InternalError.http_status(),
    };
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

