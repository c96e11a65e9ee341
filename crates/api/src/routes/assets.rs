//! Route definitions for the `/assets` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET    /                  -> list
/// POST   /                  -> create
/// GET    /{id}              -> get_ledger
/// DELETE /{id}              -> delete
/// POST   /{id}/intake       -> intake
/// PUT    /{id}/borrowing    -> set_borrowing
/// GET    /{id}/holds        -> list_holds  (?active=true&kind=)
/// GET    /{id}/activity     -> list_activity (?limit=&offset=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list).post(assets::create))
        .route("/{id}", get(assets::get_ledger).delete(assets::delete))
        .route("/{id}/intake", post(assets::intake))
        .route("/{id}/borrowing", put(assets::set_borrowing))
        .route("/{id}/holds", get(assets::list_holds))
        .route("/{id}/activity", get(assets::list_activity))
}
