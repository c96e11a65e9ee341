use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use stockroom_db::models::outgoing::{CreateOutgoing, OutgoingRow};
use stockroom_db::workflows::OutgoingWorkflow;

use crate::error::AppResult;
use crate::extract::Actor;
use crate::handlers::publish;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/outgoing
///
/// Permanently removes units from stock in one step.
pub async fn withdraw(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateOutgoing>,
) -> AppResult<(StatusCode, Json<DataResponse<OutgoingRow>>)> {
    let committed = OutgoingWorkflow::withdraw(&state.ledger, &input, actor.0).await?;
    let record = publish(&state, actor, committed);
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}
