//! JSON envelope for successful API responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct Response<T> {
    message: String,
    data: T,
}

impl<T> From<T> for Response<T> {
    fn from(data: T) -> Self {
        Self { message: "Successfully".to_string(), data }
    }
}

impl<T: Serialize> IntoResponse for Response<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
