//! HTTP transport: three functional routes plus a `/health` probe, built
//! on an axum `Router` with `State`, `Path`/`Query` extractors, and JSON
//! responses.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::model::BlockRequest;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/blocks", post(submit_block))
        .route("/balance/:address", get(get_balance))
        .route("/rollback", post(rollback))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.ping().await {
        Ok(()) => Json(json!({"status": "ok"})),
        Err(_) => Json(json!({"status": "degraded"})),
    }
}

async fn submit_block(
    State(state): State<AppState>,
    Json(block): Json<BlockRequest>,
) -> Result<Json<serde_json::Value>, EngineError> {
    tracing::info!(block_id = %block.id, height = block.height, "submit_block received");
    state.engine.submit_block(block).await?;
    Ok(Json(json!({"message": "Block processed successfully"})))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, EngineError> {
    if address.trim().is_empty() {
        return Err(EngineError::Validation("address must not be empty".to_string()));
    }
    let balance = state.engine.get_balance(&address).await?;
    Ok(Json(json!({"balance": balance})))
}

async fn rollback(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let raw = params
        .get("height")
        .ok_or_else(|| EngineError::Validation("missing required query parameter 'height'".to_string()))?;
    let height: i64 = raw
        .parse()
        .map_err(|_| EngineError::Validation(format!("height must be an integer, got '{raw}'")))?;
    if height < 0 {
        return Err(EngineError::InvalidTarget(height));
    }

    tracing::info!(target_height = height, "rollback requested");
    state.engine.rollback_to(height).await?;
    Ok(Json(json!({"message": format!("Rollback to height {height} completed successfully")})))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S6/validation-error shape: empty address segment is rejected before
    /// the engine is consulted.
    #[test]
    fn empty_address_produces_validation_error() {
        let err = EngineError::Validation("address must not be empty".to_string());
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
