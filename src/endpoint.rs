//! HTTP invocation endpoint.
//!
//! Provides:
//! - `GET /invoke/?backend={wasm|container}&n={integer}` - one cold invocation
//!
//! Invokers block, so each call runs on the blocking pool. A process-wide gate
//! serializes invocations so concurrent clients never overlap two cold starts.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::BenchError;
use crate::invoker::Dispatcher;
use crate::Backend;

/// Body of every non-200 answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone)]
pub struct EndpointState {
    dispatcher: Arc<Dispatcher>,
    gate: Arc<Mutex<()>>,
}

pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = EndpointState {
        dispatcher,
        gate: Arc::new(Mutex::new(())),
    };
    Router::new()
        .route("/invoke/", get(invoke_handler))
        .route("/invoke", get(invoke_handler))
        .with_state(state)
}

/// Validates the raw query. Backend is checked before `n`.
pub fn parse_params(params: &HashMap<String, String>) -> Result<(Backend, i64), BenchError> {
    let backend = params
        .get("backend")
        .and_then(|raw| Backend::parse(raw))
        .ok_or_else(|| BenchError::InvalidInput("backend must be wasm or container".into()))?;
    let n = params
        .get("n")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| BenchError::InvalidInput("n must be integer".into()))?;
    Ok((backend, n))
}

fn error_response(err: &BenchError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!(error = %err, "invocation failed");
    }
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn invoke_handler(
    State(state): State<EndpointState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (backend, n) = match parse_params(&params) {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    // The blocking task owns the turn, so a dropped request cannot release the
    // gate while its sandbox is still running.
    let turn = Arc::clone(&state.gate).lock_owned().await;
    let dispatcher = Arc::clone(&state.dispatcher);
    let task = tokio::task::spawn_blocking(move || {
        let outcome = dispatcher.invoke(backend, n);
        drop(turn);
        outcome
    });
    match task.await {
        Ok(Ok(invocation)) => (StatusCode::OK, Json(invocation)).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(join) => error_response(&BenchError::sandbox(
            backend,
            format!("invoker task failed: {join}"),
        )),
    }
}

/// Serves the endpoint until the process is stopped.
pub async fn serve(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Invocation endpoint listening on http://{}/invoke/", listener.local_addr()?);
    axum::serve(listener, create_router(dispatcher)).await
}
