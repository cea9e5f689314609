//! Request/response logging middleware.

use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Uri};
use axum::middleware::Next;
use axum::response::Response;
use url::form_urlencoded;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Query parameters whose values never reach the logs.
const SENSITIVE_PARAMS: &[&str] = &["code", "access_token", "refresh_token"];
const REDACTED: &str = "REDACTED";

/// Correlation id attached to request extensions by [`request_response_logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Renders the request target with sensitive query values masked. Keys are
/// matched after percent-decoding, the same way handlers read them.
pub fn redacted_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let mut masked = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if SENSITIVE_PARAMS.contains(&&*key) {
            masked.append_pair(&key, REDACTED);
        } else {
            masked.append_pair(&key, &value);
        }
    }

    format!("{}?{}", uri.path(), masked.finish())
}

pub async fn request_response_logger(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();
    let method = req.method().clone();
    let uri = redacted_uri(req.uri());

    let c_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(c_id.clone()));

    tracing::info!(_cID = c_id, method = %method, uri = %uri, "Incoming request");

    let mut response = next.run(req).await;

    let duration_ms = start_time.elapsed().as_millis();
    let status = response.status();

    response.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&c_id).unwrap_or_else(|_| HeaderValue::from_static("invalid-correlation-id")),
    );

    if status.is_server_error() {
        tracing::error!(_cID = c_id, method = %method, uri = %uri, status = %status, duration_ms, "Request completed with server error");
    } else if status.is_client_error() {
        tracing::warn!(_cID = c_id, method = %method, uri = %uri, status = %status, duration_ms, "Request completed with client error");
    } else {
        tracing::info!(_cID = c_id, method = %method, uri = %uri, status = %status, duration_ms, "Request completed");
    }

    response
}
