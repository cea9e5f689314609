use app_core::error::AppError;
use app_core::extractors::AppPath;
use app_core::response::Response;
use axum::debug_handler;

use crate::domain::redirect::ReasonCode;
use crate::inbound::model::prelude::*;

#[debug_handler]
pub async fn reason_message(
    AppPath(reason): AppPath<String>,
) -> Result<Response<ReasonMessageResponse>, AppError> {
    let code = reason.parse::<ReasonCode>().map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Response::from(ReasonMessageResponse { reason: code.as_str().to_string(), message: code.message().to_string() }))
}
