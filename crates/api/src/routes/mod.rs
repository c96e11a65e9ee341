pub mod assets;
pub mod borrowing;
pub mod events;
pub mod health;
pub mod holds;
pub mod outgoing;
pub mod tickets;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /assets                                     list, register
/// /assets/{id}                                ledger view, delete
/// /assets/{id}/intake                         increase total owned (POST)
/// /assets/{id}/borrowing                      enable, resize, disable pool (PUT)
/// /assets/{id}/holds                          holds on the asset
/// /assets/{id}/activity                       activity log
///
/// /holds                                      reserve (POST), list by owner (GET)
/// /holds/batch                                all-or-nothing reserve (POST)
/// /holds/{id}                                 get, adjust (PUT)
/// /holds/{id}/release                         release (POST)
/// /holds/{id}/consume                         consume (POST)
///
/// /borrowing-requests                         submit
/// /borrowing-requests/{id}                    get
/// /borrowing-requests/{id}/approve|reject|return
/// /borrowing-requests/{id}/lines/{line_id}    edit quantity (PUT)
///
/// /events                                     create
/// /events/{id}                                get
/// /events/{id}/allocations                    allocate (POST)
/// /events/{id}/allocations/{line_id}          edit (PUT), remove (DELETE)
/// /events/{id}/complete|cancel
///
/// /tickets                                    open
/// /tickets/{id}                               get, edit quantity, delete
/// /tickets/{id}/start|resolve|scrap
///
/// /outgoing                                   withdraw
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::router())
        .nest("/holds", holds::router())
        .nest("/borrowing-requests", borrowing::router())
        .nest("/events", events::router())
        .nest("/tickets", tickets::router())
        .nest("/outgoing", outgoing::router())
}
