//! Handlers for the `/borrowing-requests` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use stockroom_core::types::DbId;
use stockroom_db::models::borrowing::{
    BorrowingLineRow, BorrowingRequestDetail, RejectBorrowingRequest, ReturnBorrowingRequest,
    SubmitBorrowingRequest, UpdateLineQuantity,
};
use stockroom_db::workflows::BorrowingWorkflow;

use crate::error::AppResult;
use crate::extract::Actor;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

type DetailResponse = Json<DataResponse<BorrowingRequestDetail>>;

/// POST /api/v1/borrowing-requests
///
/// Records a Pending request. Nothing is reserved until approval.
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<SubmitBorrowingRequest>,
) -> AppResult<(StatusCode, DetailResponse)> {
    let detail = BorrowingWorkflow::submit(&state.ledger, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/borrowing-requests/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<DetailResponse> {
    let detail = BorrowingWorkflow::get(&state.pool, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/borrowing-requests/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<DetailResponse> {
    let committed = BorrowingWorkflow::approve(&state.ledger, id, actor.0).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// POST /api/v1/borrowing-requests/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<RejectBorrowingRequest>,
) -> AppResult<DetailResponse> {
    let detail =
        BorrowingWorkflow::reject(&state.ledger, id, input.reason.as_deref(), actor.0).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/borrowing-requests/{id}/return
///
/// Lines not listed in `lost` came back complete.
pub async fn return_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<ReturnBorrowingRequest>,
) -> AppResult<DetailResponse> {
    let committed = BorrowingWorkflow::return_request(&state.ledger, id, &input).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// PUT /api/v1/borrowing-requests/{id}/lines/{line_id}
pub async fn edit_line(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, line_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateLineQuantity>,
) -> AppResult<Json<DataResponse<BorrowingLineRow>>> {
    let committed =
        BorrowingWorkflow::edit_line_quantity(&state.ledger, id, line_id, input.quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}
