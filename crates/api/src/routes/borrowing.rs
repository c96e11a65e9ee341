use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::borrowing;
use crate::state::AppState;

/// Routes mounted at `/borrowing-requests`.
///
/// ```text
/// POST   /                        -> submit
/// GET    /{id}                    -> get
/// POST   /{id}/approve            -> approve
/// POST   /{id}/reject             -> reject
/// POST   /{id}/return             -> return_request
/// PUT    /{id}/lines/{line_id}    -> edit_line
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(borrowing::submit))
        .route("/{id}", get(borrowing::get))
        .route("/{id}/approve", post(borrowing::approve))
        .route("/{id}/reject", post(borrowing::reject))
        .route("/{id}/return", post(borrowing::return_request))
        .route("/{id}/lines/{line_id}", put(borrowing::edit_line))
}
