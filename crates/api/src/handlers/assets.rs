//! Handlers for the `/assets` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use stockroom_core::error::CoreError;
use stockroom_core::types::DbId;
use stockroom_db::models::activity::{ActivityListQuery, ActivityLogRow};
use stockroom_db::models::asset::{
    AssetIntake, AssetLedgerRow, AssetLedgerView, CreateAsset, LedgerFigures, SetBorrowing,
};
use stockroom_db::models::hold::{HoldListQuery, HoldRow, HoldView};
use stockroom_db::repositories::{ActivityRepo, AssetRepo, HoldRepo};

use crate::error::{AppError, AppResult};
use crate::extract::Actor;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/assets
pub async fn list(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<AssetLedgerRow>>>> {
    let assets = AssetRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// POST /api/v1/assets
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateAsset>,
) -> AppResult<(StatusCode, Json<DataResponse<AssetLedgerRow>>)> {
    let committed = state.ledger.register(&input).await?;
    let asset = publish(&state, actor, committed);
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/assets/{id}
///
/// Ledger figures plus every active hold.
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AssetLedgerView>>> {
    let row = find_asset(&state, id).await?;
    let holds = HoldRepo::list_active(&state.pool, id, None).await?;
    let holds = to_views(holds)?;
    Ok(Json(DataResponse {
        data: AssetLedgerView::new(row, holds),
    }))
}

/// DELETE /api/v1/assets/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.ledger.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/assets/{id}/intake
pub async fn intake(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<AssetIntake>,
) -> AppResult<Json<DataResponse<LedgerFigures>>> {
    let committed = state.ledger.intake(id, input.quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// PUT /api/v1/assets/{id}/borrowing
pub async fn set_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<SetBorrowing>,
) -> AppResult<Json<DataResponse<LedgerFigures>>> {
    let committed = state.ledger.set_borrowing(id, &input).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// GET /api/v1/assets/{id}/holds
///
/// Full hold history by default; `?active=true` restricts to active holds
/// and honours `kind`.
pub async fn list_holds(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<HoldListQuery>,
) -> AppResult<Json<DataResponse<Vec<HoldView>>>> {
    find_asset(&state, id).await?;
    let rows = if params.active {
        HoldRepo::list_active(&state.pool, id, params.kind).await?
    } else {
        let mut rows = HoldRepo::list_for_asset(&state.pool, id).await?;
        if let Some(kind) = params.kind {
            rows.retain(|r| r.kind_id == kind.id());
        }
        rows
    };
    Ok(Json(DataResponse {
        data: to_views(rows)?,
    }))
}

/// GET /api/v1/assets/{id}/activity
pub async fn list_activity(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ActivityListQuery>,
) -> AppResult<Json<DataResponse<Vec<ActivityLogRow>>>> {
    find_asset(&state, id).await?;
    let entries = ActivityRepo::list_for_asset(&state.pool, id, &params).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ── Private helpers ──────────────────────────────────────────────────────

async fn find_asset(state: &AppState, id: DbId) -> AppResult<AssetLedgerRow> {
    AssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id,
        }))
}

pub(crate) fn to_views(rows: Vec<HoldRow>) -> AppResult<Vec<HoldView>> {
    rows.into_iter()
        .map(|row| HoldView::try_from(row).map_err(AppError::from))
        .collect()
}
