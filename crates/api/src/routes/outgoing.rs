use axum::routing::post;
use axum::Router;

use crate::handlers::outgoing;
use crate::state::AppState;

/// Routes mounted at `/outgoing`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(outgoing::withdraw))
}
