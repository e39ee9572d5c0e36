//! HTTP route definitions for the mirrors-qa control plane API.

pub mod auth;
pub mod health;
pub mod tests;
pub mod workers;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/authenticate", post(auth::authenticate))
        .route("/tests", get(tests::list_tests))
        .route("/tests/:id", get(tests::get_test).patch(tests::update_test))
        .route(
            "/workers/:id/countries",
            get(workers::get_countries).put(workers::set_countries),
        )
        .route("/health-check", get(health::health_check))
}

#[derive(OpenApi)]
#[openapi(
    paths(auth::authenticate),
    components(schemas(auth::AuthenticateResponse)),
    tags((name = "mirrors-qa", description = "Federated mirror download-performance control plane"))
)]
pub struct ApiDoc;

