//! Request/response log capture.
//!
//! Runs after the handler has produced its body and before that body is
//! sent: both bodies are buffered (when small and of known size), described
//! in an [`HttpExchange`], and handed to the [`LogShipper`]. The response
//! goes out with the same status, headers and bytes. A body that fails while
//! being buffered is replaced by one that yields the same error, and is left
//! out of the log.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::logs::{HttpExchange, LogShipper};

/// State for the capture stage.
#[derive(Clone)]
pub struct LogCapture {
    pub shipper: LogShipper,
    /// Bodies larger than this, or of unknown size, are not captured.
    pub max_body_bytes: usize,
}

pub async fn capture_exchange(
    State(capture): State<LogCapture>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request.headers().contains_key(header::AUTHORIZATION);
    let method = request.method().to_string();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let (parts, body) = request.into_parts();
    let (body, req_body) = buffer(body, capture.max_body_bytes).await;
    let response = next.run(Request::from_parts(parts, body)).await;

    let (parts, body) = response.into_parts();
    let (body, res_body) = buffer(body, capture.max_body_bytes).await;
    let response = Response::from_parts(parts, body);

    capture.shipper.http_exchange(&HttpExchange {
        authorized,
        path,
        method,
        status_code: response.status().as_u16(),
        req_body,
        res_body,
    });

    response
}

/// Buffer `body` if its exact size is known and within `limit`, returning a
/// replacement body with the same bytes (or the same failure) and a
/// description for the log.
async fn buffer(body: Body, limit: usize) -> (Body, Option<String>) {
    let capturable = body
        .size_hint()
        .exact()
        .is_some_and(|len| len <= limit as u64);
    if !capturable {
        return (body, None);
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let described = describe(&bytes);
            (Body::from(bytes), described)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Body stream failed while capturing for log");
            let failed = futures_util::stream::once(async move { Err::<Bytes, _>(e) });
            (Body::from_stream(failed), None)
        }
    }
}

/// Compact JSON for JSON bodies, a JSON string for other text, nothing for
/// empty or binary bodies.
fn describe(bytes: &Bytes) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        return Some(value.to_string());
    }
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| serde_json::to_string(text).ok())
}
