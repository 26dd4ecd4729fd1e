//! Error taxonomy for the ledger engine.
//!
//! `EngineError` is the sum type every engine operation returns. HTTP status
//! is a pure function of the variant (computed in [`EngineError::status`]
//! and the `IntoResponse` impl below) — never a field carried on the error
//! itself, per the error-hierarchy design note.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the store backend (Postgres I/O, pool exhaustion,
/// constraint violations the validator did not anticipate).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// The engine's stable error taxonomy. Every variant maps to exactly one
/// HTTP status and one stable `code` symbol.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Expected height {expected}, got {actual}")]
    InvalidHeight { expected: u64, actual: u64 },

    #[error("Inputs: {input_sum}, Outputs: {output_sum}")]
    SumMismatch { input_sum: i64, output_sum: i64 },

    #[error("Double spend of output {tx_id}:{index} within block")]
    DoubleSpend { tx_id: String, index: u32 },

    #[error("Output {tx_id}:{index} has already been spent")]
    AlreadySpent { tx_id: String, index: u32 },

    #[error("Output {tx_id}:{index} does not exist")]
    NonexistentOutput { tx_id: String, index: u32 },

    #[error("Computed block id {expected} does not match submitted id {actual}")]
    InvalidBlockId { expected: String, actual: String },

    #[error("Rollback target height must be non-negative, got {0}")]
    InvalidTarget(i64),

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

impl EngineError {
    /// The stable machine-readable code clients match on.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidHeight { .. } => "INVALID_HEIGHT",
            EngineError::SumMismatch { .. } => "SUM_MISMATCH",
            EngineError::DoubleSpend { .. } => "DOUBLE_SPEND",
            EngineError::AlreadySpent { .. } => "ALREADY_SPENT",
            EngineError::NonexistentOutput { .. } => "NONEXISTENT_OUTPUT",
            EngineError::InvalidBlockId { .. } => "INVALID_BLOCK_ID",
            EngineError::InvalidTarget(_) => "INVALID_TARGET",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    code: &'static str,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        tracing::error!(code, error = %self, "engine operation failed");
        (status, Json(ErrorEnvelope { error: self.to_string(), code })).into_response()
    }
}
