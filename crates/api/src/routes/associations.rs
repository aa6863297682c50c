//! Route definitions for the card association hand-off.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::associations;
use crate::state::AppState;

/// Routes mounted at `/associations`.
///
/// ```text
/// POST /          -> request_association
/// GET  /status    -> association_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(associations::request_association))
        .route("/status", get(associations::association_status))
}
