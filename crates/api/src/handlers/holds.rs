//! Handlers for the `/holds` resource: the raw ledger primitives.
//!
//! Consumer workflows call the same coordinator; these endpoints expose it
//! directly for integrations that track their own claims. Holds backing a
//! workflow record or the borrowing pool are refused with 409.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use stockroom_core::error::CoreError;
use stockroom_core::ledger::ReservationLine;
use stockroom_core::types::{DbId, Quantity};
use stockroom_db::coordinator::HoldOutcome;
use stockroom_db::models::hold::{HoldOwnerQuery, HoldView};
use stockroom_db::repositories::HoldRepo;

use crate::error::{AppError, AppResult};
use crate::extract::Actor;
use crate::handlers::assets::to_views;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /holds/batch`.
#[derive(Debug, Deserialize)]
pub struct ReserveBatch {
    pub lines: Vec<ReservationLine>,
}

/// Request body for `PUT /holds/{id}`.
#[derive(Debug, Deserialize)]
pub struct AdjustHold {
    pub quantity: Quantity,
}

/// Request body for `POST /holds/{id}/consume`.
#[derive(Debug, Deserialize)]
pub struct ConsumeHold {
    pub consumed: Quantity,
}

/// POST /api/v1/holds
pub async fn reserve(
    State(state): State<AppState>,
    actor: Actor,
    Json(line): Json<ReservationLine>,
) -> AppResult<(StatusCode, Json<DataResponse<HoldOutcome>>)> {
    let committed = state.ledger.reserve(&line).await?;
    let outcome = publish(&state, actor, committed);
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/holds/batch
///
/// Returns the new hold ids in line order. Nothing is reserved if any line
/// fails.
pub async fn reserve_batch(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<ReserveBatch>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<DbId>>>)> {
    if input.lines.is_empty() {
        return Err(AppError::BadRequest("lines must not be empty".into()));
    }
    let committed = state.ledger.reserve_batch(&input.lines).await?;
    let hold_ids = publish(&state, actor, committed);
    Ok((StatusCode::CREATED, Json(DataResponse { data: hold_ids })))
}

/// GET /api/v1/holds?kind=&owner_ref=
pub async fn list_by_owner(
    State(state): State<AppState>,
    Query(params): Query<HoldOwnerQuery>,
) -> AppResult<Json<DataResponse<Vec<HoldView>>>> {
    let rows = HoldRepo::list_by_owner(&state.pool, params.kind, params.owner_ref).await?;
    Ok(Json(DataResponse {
        data: to_views(rows)?,
    }))
}

/// GET /api/v1/holds/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<HoldView>>> {
    let row = HoldRepo::find(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Hold", id }))?;
    Ok(Json(DataResponse {
        data: HoldView::try_from(row)?,
    }))
}

/// POST /api/v1/holds/{id}/release
///
/// Idempotent: releasing a released hold returns `released: 0`.
pub async fn release(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<HoldOutcome>>> {
    let committed = state.ledger.release(id).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// PUT /api/v1/holds/{id}
pub async fn adjust(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<AdjustHold>,
) -> AppResult<Json<DataResponse<HoldOutcome>>> {
    let committed = state.ledger.adjust(id, input.quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// POST /api/v1/holds/{id}/consume
pub async fn consume(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<ConsumeHold>,
) -> AppResult<Json<DataResponse<HoldOutcome>>> {
    let committed = state.ledger.consume(id, input.consumed).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}
