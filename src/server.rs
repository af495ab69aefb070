//!
//! personas HTTP server
//! ---------------------
//! Axum router exposing the person dataset:
//!
//! | Method | Path              | Result                                  |
//! |--------|-------------------|-----------------------------------------|
//! | `POST` | `/persona`        | 201 with the stored record, 422, or 500 |
//! | `GET`  | `/personas/count` | 200 with `total_rows` and `file`, or 500 |
//! | `GET`  | `/`               | 200 health message                      |
//!
//! Handlers share nothing but the `CsvStore` handle; every request re-reads the
//! dataset object.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult};
use crate::persona::{self, ValidationError};
use crate::storage::{CsvStore, ObjectStoreClient};

pub const HEALTH_MESSAGE: &str = "service healthy";
pub const ADDED_MESSAGE: &str = "person added successfully";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: CsvStore,
}

impl AppState {
    pub fn new(store: CsvStore) -> Self { Self { store } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/persona", post(add_persona))
        .route("/personas/count", get(count_personas))
        .with_state(state)
}

/// Build the object store client from `config`, bind, and serve until Ctrl-C.
pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let client = ObjectStoreClient::for_backend(config.backend, &config.bucket, &config.local_root)
        .with_context(|| format!(
            "While building the {} object store client for bucket '{}'",
            config.backend.as_str(), config.bucket
        ))?;
    let location = config.location();
    info!(
        target: "startup",
        "personas starting: backend={}, dataset={}, local_root={:?}",
        config.backend.as_str(), location, config.local_root
    );
    let app = router(AppState::new(CsvStore::new(Arc::new(client), location)));

    let addr = config.socket_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "message": HEALTH_MESSAGE }))
}

async fn add_persona(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // Unparseable bodies are reported like any other invalid input.
    let Json(body) = payload.map_err(|rej| ValidationError::single("body", "json", rej.body_text()))?;
    let record = persona::validate(&body)?;
    let record = guarded("add_persona", state.store.append_record(record)).await?.map_err(|e| {
        error!("append failed: {e}");
        AppError::save_failed(&e)
    })?;
    info!(target: "personas::server", "person added: name='{}' age={} height={}", record.name(), record.age(), record.height());
    Ok((StatusCode::CREATED, Json(json!({ "message": ADDED_MESSAGE, "data": record }))))
}

async fn count_personas(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let total = guarded("count_personas", state.store.count_records()).await?.map_err(|e| {
        error!("count failed: {e}");
        AppError::read_failed(&e)
    })?;
    Ok(Json(json!({ "total_rows": total, "file": state.store.location().key })))
}

/// Run `fut`, turning a panic into an `Internal` error so the connection gets a
/// 500 instead of being dropped.
async fn guarded<T, F: Future<Output = T>>(handler: &str, fut: F) -> AppResult<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "HTTP {} panic: {}", handler, msg);
            Err(AppError::internal("internal_panic", "internal server error"))
        }
    }
}
