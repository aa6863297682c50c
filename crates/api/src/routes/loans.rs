use axum::routing::get;
use axum::Router;

use crate::handlers::loans;
use crate::state::AppState;

/// Routes mounted at `/loans`.
///
/// ```text
/// GET /           -> list_recent_loans
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(loans::list_recent_loans))
}
