use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tickets;
use crate::state::AppState;

/// Routes mounted at `/tickets`.
///
/// ```text
/// POST   /               -> open
/// GET    /{id}           -> get
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// POST   /{id}/start     -> start
/// POST   /{id}/resolve   -> resolve
/// POST   /{id}/scrap     -> scrap
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(tickets::open))
        .route(
            "/{id}",
            get(tickets::get).put(tickets::update).delete(tickets::delete),
        )
        .route("/{id}/start", post(tickets::start))
        .route("/{id}/resolve", post(tickets::resolve))
        .route("/{id}/scrap", post(tickets::scrap))
}
