//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use yardkeep_core::{Command, Inventory, InventoryError, JsonFileStore, Part};

use crate::AppState;

/// Errors surfaced to HTTP clients as `{success: false, message}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => ApiError::BadRequest(msg),
            InventoryError::Duplicate(_) => ApiError::BadRequest(err.to_string()),
            InventoryError::NotFound(_) => ApiError::NotFound("Part not found".to_string()),
            InventoryError::Store(e) => {
                tracing::error!("Store failure: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string()
        }));
        (self.status(), body).into_response()
    }
}

/// CORS preflight; headers come from the CORS layer
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "success": false,
            "message": "Method not allowed"
        })),
    )
        .into_response()
}

/// Run an inventory operation on the blocking pool; the store does file IO
async fn with_inventory<T, F>(state: &Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Inventory<JsonFileStore>) -> yardkeep_core::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || op(&state.inventory))
        .await
        .map_err(|e| ApiError::Internal(format!("join error: {e}")))?
        .map_err(ApiError::from)
}

/// Like `with_inventory`, holding the write lock until the blocking task ends
async fn write_inventory<T, F>(state: &Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Inventory<JsonFileStore>) -> yardkeep_core::Result<T> + Send + 'static,
{
    let guard = Arc::clone(&state.write_lock).lock_owned().await;
    with_inventory(state, move |inventory| {
        let result = op(inventory);
        drop(guard);
        result
    })
    .await
}

// ============================================================================
// Inventory Endpoints
// ============================================================================

/// The full snapshot
pub async fn list_parts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Part>>, ApiError> {
    let parts = with_inventory(&state, |inventory| Ok(inventory.parts())).await?;
    Ok(Json(parts))
}

/// Add or overwrite one part, echoing the submitted fields
pub async fn upsert_part(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let part = Part::from_request(&body)?;

    write_inventory(&state, move |inventory| inventory.upsert_part(part)).await?;

    Ok(Json(json!({
        "success": true,
        "item": body
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeletePartQuery {
    #[serde(rename = "partNumber")]
    pub part_number: Option<String>,
}

/// Remove one part by exact part number
pub async fn delete_part(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeletePartQuery>,
) -> Result<Json<Value>, ApiError> {
    let part_number = query
        .part_number
        .ok_or_else(|| ApiError::BadRequest("No partNumber specified".to_string()))?;

    write_inventory(&state, move |inventory| inventory.delete_part(&part_number)).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Part deleted"
    })))
}

// ============================================================================
// Command Endpoints
// ============================================================================

/// The full command log, unsorted
pub async fn list_commands(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Command>>, ApiError> {
    let commands = with_inventory(&state, |inventory| Ok(inventory.commands())).await?;
    Ok(Json(commands))
}

/// Append a command and fold it into the snapshot
pub async fn record_command(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let command = Command::from_request(&body)?;

    let reconciled =
        write_inventory(&state, move |inventory| inventory.record_command(command)).await?;

    Ok(Json(json!({
        "success": true,
        "command": reconciled.command
    })))
}
