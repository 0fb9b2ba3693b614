//! Request-id middleware.
//!
//! Honors a caller-supplied `X-Request-ID` header (when it parses as a
//! UUID), otherwise generates one. The id is placed in request extensions
//! for handlers and echoed on the response for correlation.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use pipeline::RequestId;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adopts or generates the request id, then echoes it on the response.
pub async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .map(RequestId::from_uuid)
        .unwrap_or_else(RequestId::new_random);

    request.extensions_mut().insert(request_id);
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
