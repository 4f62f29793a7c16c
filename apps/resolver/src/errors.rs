use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::nearest_address::AddressLookupError;
use crate::profile::ProfileError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Backend trouble (transport, parse) never lands here: the engine absorbs it
/// into `null` responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Address lookup error: {0}")]
    AddressLookup(#[from] AddressLookupError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Profile(e) => {
                tracing::error!("Profile error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROFILE_ERROR",
                    "The user profile could not be loaded".to_string(),
                )
            }
            AppError::AddressLookup(e) => match e {
                AddressLookupError::NoLocation => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                AddressLookupError::NoAddresses => (StatusCode::NOT_FOUND, "NO_ADDRESSES", e.to_string()),
                AddressLookupError::NoMatch => (StatusCode::NOT_FOUND, "NO_MATCH", e.to_string()),
                AddressLookupError::SessionUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SESSION_UNAVAILABLE", e.to_string())
                }
                AddressLookupError::Profile(inner) => {
                    tracing::error!("Profile error: {inner}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PROFILE_ERROR",
                        "The user profile could not be loaded".to_string(),
                    )
                }
                AddressLookupError::Serialize(inner) => {
                    tracing::error!("Address serialization error: {inner}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
