//! Converts axum extractor rejections into [`AppError`].

use axum::extract::rejection::PathRejection;

use super::error::AppError;

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::RequestFormat(rejection.body_text())
    }
}
