use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReasonMessageResponse {
    pub reason: String,
    pub message: String,
}
