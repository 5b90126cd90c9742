//! Error types for credcheck
//!
//! Every failure is scoped to its request: handlers return `ApiError`, the
//! `IntoResponse` impl translates it into a JSON body `{error, code?}` with
//! the matching status code. Nothing is retried, nothing is fatal.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400)
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    /// Uniqueness violation (400)
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Dangling foreign key (400)
    #[error("{message}")]
    Reference { code: &'static str, message: String },

    /// No such row (404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credential (401)
    #[error("{0}")]
    Auth(String),

    /// Storage or unexpected failure (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn reference(code: &'static str, message: impl Into<String>) -> Self {
        Self::Reference {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::Conflict { .. } | Self::Reference { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Validation { code, .. }
            | Self::Conflict { code, .. }
            | Self::Reference { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref message) = self {
            error!("request failed: {}", message);
        }

        let mut body = json!({ "error": self.to_string() });
        if let Some(code) = self.code() {
            body["code"] = json!(code);
        }

        (self.status(), Json(body)).into_response()
    }
}
