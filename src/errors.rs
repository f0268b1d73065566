use crate::services::{
    identity::IdentityError, player::PlayerError, segmenter::SegmenterError,
    staging::StagingError, vault_store::StoreError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for route errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request (input rejected before any store call).
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 404 Not Found.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 502 Bad Gateway (upstream storage/identity failure).
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VaultNotFound(_) | StoreError::RecordNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            StoreError::InvalidName { .. } => AppError::bad_request(err.to_string()),
            StoreError::Unavailable(_) | StoreError::Sqlx(_) | StoreError::Io(_) => {
                AppError::upstream(err.to_string())
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            // relay the upstream status when it maps onto one we can emit
            IdentityError::Upstream { status, .. } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                AppError::new(status, err.to_string())
            }
            IdentityError::Http(_) => AppError::upstream(err.to_string()),
            IdentityError::InvalidKey(_) | IdentityError::InvalidSignature(_) => {
                AppError::bad_request(err.to_string())
            }
        }
    }
}

impl From<crate::models::playlist::PlaylistError> for AppError {
    fn from(err: crate::models::playlist::PlaylistError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<SegmenterError> for AppError {
    fn from(err: SegmenterError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<PlayerError> for AppError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::OutOfRange { .. } => AppError::bad_request(err.to_string()),
            PlayerError::Fetch { .. } => AppError::upstream(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}
