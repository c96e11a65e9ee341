use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// POST   /                              -> create
/// GET    /{id}                          -> get
/// POST   /{id}/allocations              -> allocate
/// PUT    /{id}/allocations/{line_id}    -> edit_line
/// DELETE /{id}/allocations/{line_id}    -> remove_line
/// POST   /{id}/complete                 -> complete
/// POST   /{id}/cancel                   -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(events::create))
        .route("/{id}", get(events::get))
        .route("/{id}/allocations", post(events::allocate))
        .route(
            "/{id}/allocations/{line_id}",
            put(events::edit_line).delete(events::remove_line),
        )
        .route("/{id}/complete", post(events::complete))
        .route("/{id}/cancel", post(events::cancel))
}
