//! `GET /health-check` (§4.4).

use crate::error::ServerResult;
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::Duration as ChronoDuration;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub receiving_tests: bool,
}

pub async fn health_check(State(state): State<AppState>) -> ServerResult<Json<HealthCheckResponse>> {
    let within = ChronoDuration::from_std(state.config.unhealthy_no_tests_duration)
        .unwrap_or_else(|_| ChronoDuration::hours(6));
    let receiving_tests = state.registry.has_recent_success(within).await?;
    Ok(Json(HealthCheckResponse { receiving_tests }))
}
