//! Unified application error model and HTTP mapping.
//! Validation and storage failures from the library modules are folded into
//! `AppError`, which knows its HTTP status and renders itself as a JSON body.
//! `Internal` covers a handler that panicked instead of returning.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::persona::{FieldViolation, ValidationError};
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Validation { code: String, message: String, violations: Vec<FieldViolation> },
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn storage<S: Into<String>>(code: S, msg: S) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Storage failure while persisting a record.
    pub fn save_failed(err: &StorageError) -> Self {
        AppError::storage("storage_error".to_string(), format!("error saving to object store: {}", err))
    }

    /// Storage failure while reading the dataset.
    pub fn read_failed(err: &StorageError) -> Self {
        AppError::storage("storage_error".to_string(), format!("error reading from object store: {}", err))
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 422,
            AppError::Storage { .. } | AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation { code: "validation_error".into(), message: err.to_string(), violations: err.violations }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match &self {
            AppError::Validation { code, violations, .. } => serde_json::json!({
                "status": "error",
                "code": code,
                "detail": violations,
            }),
            AppError::Storage { code, message } | AppError::Internal { code, message } => serde_json::json!({
                "status": "error",
                "code": code,
                "detail": message,
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
