//! Cross-cutting request middleware: auth extraction and request logging.

pub mod auth;
pub mod logging;

pub use auth::AuthenticatedWorker;

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

/// Tags every request with a unique id, propagated to the response headers
/// and into tracing spans.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("X-Request-ID", request_id.parse().unwrap());

    response
}

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_displays_its_inner_value() {
        let id = RequestId(Uuid::new_v4().to_string());
        assert!(!id.as_str().is_empty());
        assert_eq!(id.to_string(), id.as_str());
    }
}
