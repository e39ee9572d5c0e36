//! `/workers/{id}/countries` routes (§4.4).

use crate::error::{ServerError, ServerResult};
use crate::middleware::{auth::require_ownership, AuthenticatedWorker};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Serialize)]
pub struct CountriesResponse {
    pub country_codes: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetCountriesRequest {
    pub country_codes: BTreeSet<String>,
}

/// `GET /workers/{id}/countries` — authenticated, token subject must equal `{id}`.
pub async fn get_countries(
    AuthenticatedWorker(worker): AuthenticatedWorker,
    Path(id): Path<String>,
) -> ServerResult<Json<CountriesResponse>> {
    require_ownership(&worker.id, &id)?;
    Ok(Json(CountriesResponse {
        country_codes: worker.countries,
    }))
}

/// `PUT /workers/{id}/countries` — replaces the worker's country set.
/// `Registry::set_worker_countries` creates any missing Country rows itself,
/// so the CLI's `create-worker`/`update-worker` commands get the same
/// behavior through the same code path.
pub async fn set_countries(
    State(state): State<AppState>,
    AuthenticatedWorker(worker): AuthenticatedWorker,
    Path(id): Path<String>,
    Json(body): Json<SetCountriesRequest>,
) -> ServerResult<Json<CountriesResponse>> {
    require_ownership(&worker.id, &id)?;

    for code in &body.country_codes {
        if !mirrorqa_core::iso_countries::is_valid(code) {
            return Err(ServerError::BadRequest(format!(
                "unknown country code: {code}"
            )));
        }
    }

    state
        .registry
        .set_worker_countries(&id, &body.country_codes)
        .await?;

    Ok(Json(CountriesResponse {
        country_codes: body.country_codes,
    }))
}
