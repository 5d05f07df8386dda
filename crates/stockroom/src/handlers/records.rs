//! Record endpoints, written once and mounted per kind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use stockroom_core::record::{
    validate_inputs, validate_page_query, PageQuery, RecordFilter, UpsertInput,
};
use stockroom_core::service::UpsertPolicy;
use stockroom_core::storage::RepositoryError;

use super::error::AppError;
use crate::state::{AppState, ServedRecord};

/// Routes of one record kind, relative to `/api/{kind}`.
pub fn routes<R: ServedRecord>() -> Router<AppState> {
    Router::new()
        .route("/upsert", post(upsert_immediate::<R>))
        .route("/upsert-batch-fetching", post(upsert_batch_fetching::<R>))
        .route("/upsert-with-transaction", post(upsert_with_transaction::<R>))
        .route("/upsert-with-lock", post(upsert_with_lock::<R>))
        .route("/filter", post(find_by_filter::<R>))
        .route("/pagination", post(find_page::<R>))
        .route("/delete", delete(delete_by_filter::<R>))
        .route("/{id}", get(find_by_id::<R>))
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn upsert<R: ServedRecord>(
    state: AppState,
    policy: UpsertPolicy,
    inputs: Vec<UpsertInput>,
) -> Result<Response, AppError> {
    validate_inputs(&inputs)?;

    let summary = R::service(&state)
        .upsert(policy, inputs, state.cancel_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(kind = R::KIND, policy = policy.name(), error = %e, "Upsert failed")
        })?;

    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

/// POST /api/{kind}/upsert
pub async fn upsert_immediate<R: ServedRecord>(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<UpsertInput>>,
) -> Result<Response, AppError> {
    upsert::<R>(state, UpsertPolicy::Immediate, inputs).await
}

/// POST /api/{kind}/upsert-batch-fetching
pub async fn upsert_batch_fetching<R: ServedRecord>(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<UpsertInput>>,
) -> Result<Response, AppError> {
    upsert::<R>(state, UpsertPolicy::PrefetchBatched, inputs).await
}

/// POST /api/{kind}/upsert-with-transaction
pub async fn upsert_with_transaction<R: ServedRecord>(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<UpsertInput>>,
) -> Result<Response, AppError> {
    upsert::<R>(state, UpsertPolicy::Transactional, inputs).await
}

/// POST /api/{kind}/upsert-with-lock
pub async fn upsert_with_lock<R: ServedRecord>(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<UpsertInput>>,
) -> Result<Response, AppError> {
    upsert::<R>(state, UpsertPolicy::TransactionalLocked, inputs).await
}

/// POST /api/{kind}/filter
///
/// An empty result is a 404.
pub async fn find_by_filter<R: ServedRecord>(
    State(state): State<AppState>,
    Json(filter): Json<RecordFilter>,
) -> Result<Response, AppError> {
    let records = R::service(&state).find_by_filter(&filter).await?;

    if records.is_empty() {
        return Ok(error_body(
            StatusCode::NOT_FOUND,
            format!("{} not found", R::KIND),
        ));
    }

    Ok(Json(records).into_response())
}

/// POST /api/{kind}/pagination?page=&limit=
pub async fn find_page<R: ServedRecord>(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Json(filter): Json<RecordFilter>,
) -> Result<Response, AppError> {
    validate_page_query(&query)?;

    let page = R::service(&state).find_page(&filter, query).await?;

    Ok(Json(page).into_response())
}

/// GET /api/{kind}/{id}
pub async fn find_by_id<R: ServedRecord>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<R>, AppError> {
    R::service(&state)
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::from(RepositoryError::NotFound {
                entity_type: R::KIND,
                id: id.to_string(),
            })
        })
}

/// DELETE /api/{kind}/delete
///
/// Only the ids of the filter are honored; an empty id list is rejected.
pub async fn delete_by_filter<R: ServedRecord>(
    State(state): State<AppState>,
    Json(filter): Json<RecordFilter>,
) -> Result<Response, AppError> {
    if filter.ids.is_empty() {
        return Ok(error_body(StatusCode::BAD_REQUEST, "ids empty"));
    }

    R::service(&state).delete(&filter).await?;

    Ok(StatusCode::OK.into_response())
}
