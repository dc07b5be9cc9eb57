// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error type and the error envelope every endpoint returns.
//!
//! Handlers never render their own failures. They return `Err(AppError)`
//! and the `IntoResponse` impl below is the single place where a failure
//! becomes a status code and a JSON body.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message shown to clients for any failure whose details stay server-side.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Input failed validation; `errors` lists the offending fields.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure with a list of field-level sub-errors.
    pub fn validation(message: impl Into<String>, errors: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors,
        }
    }

    /// HTTP status this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub data: Option<()>,
    pub message: String,
    pub success: bool,
    pub errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            AppError::Validation { message, errors } => (message, errors),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => (msg, Vec::new()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (INTERNAL_MESSAGE.to_string(), Vec::new())
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (INTERNAL_MESSAGE.to_string(), Vec::new())
            }
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            data: None,
            message,
            success: false,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Field-level validator failures; `errors` holds the offending field names.
pub fn invalid_fields(message: &str, errors: validator::ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    AppError::validation(message, fields)
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
