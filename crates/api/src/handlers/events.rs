//! Handlers for the `/events` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use stockroom_core::types::DbId;
use stockroom_db::models::event::{
    AllocateLines, CompleteEvent, CreateEvent, EventAllocationRow, EventDetail, EventRow,
    UpdateAllocation,
};
use stockroom_db::workflows::EventWorkflow;

use crate::error::AppResult;
use crate::extract::Actor;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

type DetailResponse = Json<DataResponse<EventDetail>>;

/// POST /api/v1/events
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateEvent>,
) -> AppResult<(StatusCode, Json<DataResponse<EventRow>>)> {
    let event = EventWorkflow::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/events/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<DetailResponse> {
    let detail = EventWorkflow::get(&state.pool, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/events/{id}/allocations
///
/// Every line is reserved or none is.
pub async fn allocate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<AllocateLines>,
) -> AppResult<DetailResponse> {
    let committed = EventWorkflow::allocate(&state.ledger, id, &input.lines).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// PUT /api/v1/events/{id}/allocations/{line_id}
pub async fn edit_line(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, line_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateAllocation>,
) -> AppResult<Json<DataResponse<EventAllocationRow>>> {
    let committed = EventWorkflow::edit_line(&state.ledger, id, line_id, input.quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// DELETE /api/v1/events/{id}/allocations/{line_id}
pub async fn remove_line(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, line_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let committed = EventWorkflow::remove_line(&state.ledger, id, line_id).await?;
    publish(&state, actor, committed);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/events/{id}/complete
pub async fn complete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<CompleteEvent>,
) -> AppResult<DetailResponse> {
    let committed = EventWorkflow::complete(&state.ledger, id, &input).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// POST /api/v1/events/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<DetailResponse> {
    let committed = EventWorkflow::cancel(&state.ledger, id).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}
