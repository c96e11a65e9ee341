//! Handlers for the `/tickets` resource (maintenance, repair, issue).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use stockroom_core::types::DbId;
use stockroom_db::models::ticket::{OpenTicket, ScrapTicket, TicketRow, UpdateTicket};
use stockroom_db::workflows::TicketWorkflow;

use crate::error::AppResult;
use crate::extract::Actor;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

type TicketResponse = Json<DataResponse<TicketRow>>;

/// POST /api/v1/tickets
pub async fn open(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<OpenTicket>,
) -> AppResult<(StatusCode, TicketResponse)> {
    let committed = TicketWorkflow::open(&state.ledger, &input, actor.0).await?;
    let ticket = publish(&state, actor, committed);
    Ok((StatusCode::CREATED, Json(DataResponse { data: ticket })))
}

/// GET /api/v1/tickets/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<TicketResponse> {
    let ticket = TicketWorkflow::get(&state.pool, id).await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PUT /api/v1/tickets/{id}
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTicket>,
) -> AppResult<TicketResponse> {
    let committed = TicketWorkflow::edit_quantity(&state.ledger, id, input.quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// POST /api/v1/tickets/{id}/start
pub async fn start(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<TicketResponse> {
    let ticket = TicketWorkflow::start(&state.ledger, id).await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// POST /api/v1/tickets/{id}/resolve
pub async fn resolve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<TicketResponse> {
    let committed = TicketWorkflow::resolve(&state.ledger, id).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// POST /api/v1/tickets/{id}/scrap
pub async fn scrap(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<ScrapTicket>,
) -> AppResult<TicketResponse> {
    let committed = TicketWorkflow::scrap(&state.ledger, id, input.scrapped_quantity).await?;
    Ok(Json(DataResponse {
        data: publish(&state, actor, committed),
    }))
}

/// DELETE /api/v1/tickets/{id}
pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let committed = TicketWorkflow::delete(&state.ledger, id).await?;
    publish(&state, actor, committed);
    Ok(StatusCode::NO_CONTENT)
}
