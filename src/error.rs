//! Boundary error type shared by all handlers.

use axum::{
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("username already taken")]
    DuplicateUsername,
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Missing, malformed, forged or expired token.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Authenticated, but not the owner of the resource.
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Applies the disclosure policy: with `conceal` set, a foreign resource
    /// looks exactly like a missing one to the client.
    pub fn disclosed(self, conceal: bool) -> Self {
        match self {
            AppError::Forbidden if conceal => AppError::NotFound("resource"),
            other => other,
        }
    }
}

/// Boundary policy for foreign resources, taken from config.
#[derive(Debug, Clone, Copy)]
pub struct Disclosure {
    pub conceal_forbidden: bool,
}

impl FromRef<AppState> for Disclosure {
    fn from_ref(state: &AppState) -> Self {
        Self {
            conceal_forbidden: state.config.conceal_forbidden,
        }
    }
}

impl Disclosure {
    pub fn apply(self, e: AppError) -> AppError {
        e.disclosed(self.conceal_forbidden)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::DuplicateUsername => (StatusCode::CONFLICT, "DUPLICATE_USERNAME"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: true,
            code,
            message,
        };
        (status, Json(body)).into_response()
    }
}
