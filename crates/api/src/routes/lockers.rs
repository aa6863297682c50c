use axum::routing::get;
use axum::Router;

use crate::handlers::lockers;
use crate::state::AppState;

/// Routes mounted at `/lockers`.
///
/// ```text
/// GET /           -> list_lockers
/// GET /summary    -> locker_summary
/// GET /{id}       -> get_locker
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(lockers::list_lockers))
        .route("/summary", get(lockers::locker_summary))
        .route("/{locker_id}", get(lockers::get_locker))
}
