use std::net::SocketAddr;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::ConnectInfo;
use axum::http::header::{HeaderName, CONTENT_LENGTH, REFERER, USER_AGENT};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use hyper::Body;
use shared::logging::HttpLogEntry;

/// Writes one combined-log-style line per request once the response is ready.
pub async fn log_request(request: Request<Body>, next: Next<Body>) -> Response {
    let start = Instant::now();

    let header = |name: HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_string()
    };
    let mut entry = HttpLogEntry {
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "-".to_string()),
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        protocol: format!("{:?}", request.version()),
        user_agent: header(USER_AGENT),
        referer: header(REFERER),
        ..Default::default()
    };

    let response = next.run(request).await;

    entry.status_code = response.status().as_u16();
    entry.response_size = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0);
    entry.response_time = start.elapsed();
    entry.record();

    response
}
