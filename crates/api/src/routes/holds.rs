//! Route definitions for the `/holds` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::holds;
use crate::state::AppState;

/// Routes mounted at `/holds`.
///
/// ```text
/// GET    /               -> list_by_owner (?kind=&owner_ref=)
/// POST   /               -> reserve
/// POST   /batch          -> reserve_batch
/// GET    /{id}           -> get
/// PUT    /{id}           -> adjust
/// POST   /{id}/release   -> release
/// POST   /{id}/consume   -> consume
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(holds::list_by_owner).post(holds::reserve))
        .route("/batch", post(holds::reserve_batch))
        .route("/{id}", get(holds::get).put(holds::adjust))
        .route("/{id}/release", post(holds::release))
        .route("/{id}/consume", post(holds::consume))
}
