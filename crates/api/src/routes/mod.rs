pub mod associations;
pub mod health;
pub mod loans;
pub mod lockers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /associations                 request an association (POST)
/// /associations/status          status of the current request
///
/// /lockers                      all lockers
/// /lockers/summary              available / occupied counts
/// /lockers/{locker_id}          one locker
///
/// /loans                        most recent loans (?limit=N)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/associations", associations::router())
        .nest("/lockers", lockers::router())
        .nest("/loans", loans::router())
}
