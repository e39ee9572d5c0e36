//! Structured request/response logging, with log level keyed to status class.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub struct RequestLogging;

impl RequestLogging {
    pub async fn layer(req: Request, next: Next) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();
        let request_id = req
            .extensions()
            .get::<crate::middleware::RequestId>()
            .map(|id| id.to_string());

        tracing::info!(method = %method, uri = %uri, request_id = ?request_id, "incoming request");

        let response = next.run(req).await;
        let duration = start.elapsed();
        let status = response.status();

        if status.is_server_error() {
            tracing::error!(method = %method, uri = %uri, %status, duration_ms = %duration.as_millis(), request_id = ?request_id, "request completed with server error");
        } else if status.is_client_error() {
            tracing::warn!(method = %method, uri = %uri, %status, duration_ms = %duration.as_millis(), request_id = ?request_id, "request completed with client error");
        } else {
            tracing::info!(method = %method, uri = %uri, %status, duration_ms = %duration.as_millis(), request_id = ?request_id, "request completed");
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_logging_is_stateless() {
        let _ = RequestLogging;
    }
}
