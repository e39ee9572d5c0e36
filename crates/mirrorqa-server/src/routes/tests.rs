//! `/tests` routes (§4.4).

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedWorker;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use mirrorqa_core::models::{
    Page, PageMetadata, Test, TestFilter, TestSortColumn, TestStatus, TestUpdate,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListTestsQuery {
    pub worker_id: Option<String>,
    pub country_code: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    pub page_size: Option<u32>,
    pub page_num: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListTestsResponse {
    pub tests: Vec<Test>,
    pub metadata: PageMetadata,
}

/// `GET /tests` — paginated, filtered, sortable listing.
pub async fn list_tests(
    State(state): State<AppState>,
    Query(q): Query<ListTestsQuery>,
) -> ServerResult<Json<ListTestsResponse>> {
    if let Some(cc) = &q.country_code {
        if !mirrorqa_core::iso_countries::is_valid(cc) {
            return Err(ServerError::BadRequest(format!(
                "unknown country code: {cc}"
            )));
        }
    }

    let statuses = q
        .status
        .iter()
        .map(|s| {
            TestStatus::from_str(&s.to_ascii_uppercase())
                .map_err(|_| ServerError::BadRequest(format!("unknown status: {s}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let filter = TestFilter {
        worker_id: q.worker_id,
        country_code: q.country_code,
        statuses,
    };

    let max_page_size = state.config.max_page_size;
    let page_size = q.page_size.unwrap_or(max_page_size);
    if page_size < 1 || page_size > max_page_size {
        return Err(ServerError::BadRequest(format!(
            "page_size must be between 1 and {max_page_size}"
        )));
    }
    let page_num = q.page_num.unwrap_or(1);
    if page_num < 1 {
        return Err(ServerError::BadRequest("page_num must be >= 1".to_string()));
    }

    let sort_by = q
        .sort_by
        .as_deref()
        .map(TestSortColumn::from_str)
        .transpose()
        .map_err(ServerError::BadRequest)?;
    let order_desc = match q.order.as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => return Err(ServerError::BadRequest(format!("unknown order: {other}"))),
    };

    let page = Page { page_num, page_size };
    let (tests, metadata) = state
        .registry
        .list_tests(&filter, page, sort_by, order_desc)
        .await?;

    Ok(Json(ListTestsResponse { tests, metadata }))
}

/// `GET /tests/{id}` — 404 on absent.
pub async fn get_test(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<Test>> {
    let test = state
        .registry
        .get_test(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("test {id}")))?;
    Ok(Json(test))
}

/// `PATCH /tests/{id}` — authenticated, ownership-enforced partial update.
pub async fn update_test(
    State(state): State<AppState>,
    AuthenticatedWorker(worker): AuthenticatedWorker,
    Path(id): Path<Uuid>,
    Json(update): Json<TestUpdate>,
) -> ServerResult<Json<Test>> {
    let existing = state
        .registry
        .get_test(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("test {id}")))?;

    crate::middleware::auth::require_ownership(&worker.id, &existing.worker_id)?;

    let updated = state.registry.update_test(id, &update).await?;
    state.registry.touch_worker(&worker.id, Utc::now()).await?;

    Ok(Json(updated))
}
