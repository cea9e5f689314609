//! Application error type and its mapping onto JSON HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use super::config::ConfigError;
use super::identity::IdentityError;

const INTERNAL_MSG: &str = "An internal server error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request format: {0}")]
    RequestFormat(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Internal Libraries
    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("Identity provider operation failed")]
    Identity(#[from] IdentityError),

    // Third Party Libraries
    #[error("Sea ORM operation failed")]
    Database(#[from] sea_orm::DbErr),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn internal() -> (StatusCode, String, Option<serde_json::Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MSG.to_string(), None)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Validation(err) => {
                let details = json!(err.field_errors());
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string(), Some(details))
            },
            AppError::RequestFormat(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),

            AppError::Config(err) => {
                tracing::error!("Config getter error: {:?}", err);
                internal()
            },
            AppError::Identity(err) => match err {
                IdentityError::Rejected(_) => {
                    tracing::warn!("Identity provider rejected request: {:?}", err);
                    (StatusCode::UNAUTHORIZED, "Authentication failed".to_string(), None)
                },
                IdentityError::InvalidUrl(_) => {
                    tracing::error!("Identity provider misconfigured: {:?}", err);
                    internal()
                },
                IdentityError::Http(_) | IdentityError::UnexpectedStatus(_) => {
                    tracing::error!("Identity provider error: {:?}", err);
                    (StatusCode::BAD_GATEWAY, "Identity provider unavailable".to_string(), None)
                },
            },

            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                internal()
            },
        };

        (status, Json(ErrorResponse { message, details })).into_response()
    }
}
