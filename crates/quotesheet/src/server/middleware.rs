//! Cross-cutting layers: permissive CORS and per-request tracing.

use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use super::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Permissive CORS: any origin, preflight answered directly.
pub(crate) async fn cors_middleware(req: Request<Body>, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, PUT, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

fn request_id(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map_or_else(
            || {
                let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
                format!("req-{id:016x}")
            },
            ToString::to_string,
        )
}

/// One span and one log line per request; echoes `x-request-id`.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers(), &state);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis(),
            "{} {}",
            method,
            path
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_request_id_echoed() {
        let state = AppState::from_config(&Config::default());
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(" req-abc "));
        assert_eq!(request_id(&headers, &state), "req-abc");
    }

    #[test]
    fn test_request_id_generated_sequentially() {
        let state = AppState::from_config(&Config::default());
        let headers = HeaderMap::new();
        assert_eq!(request_id(&headers, &state), "req-0000000000000001");
        assert_eq!(request_id(&headers, &state), "req-0000000000000002");
    }

    #[test]
    fn test_blank_request_id_replaced() {
        let state = AppState::from_config(&Config::default());
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
        assert!(request_id(&headers, &state).starts_with("req-"));
    }
}
