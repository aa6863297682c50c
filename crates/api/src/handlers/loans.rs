use axum::extract::{Query, State};
use axum::Json;
use lockbank_db::models::loan::Loan;
use lockbank_db::repositories::loan_ledger::MAX_RECENT_LIMIT;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Loans returned when no `limit` is given.
const DEFAULT_RECENT_LIMIT: i64 = 10;

/// Query parameters for the recent loans endpoint.
#[derive(Debug, Deserialize)]
pub struct RecentLoansQuery {
    /// How many loans to return (default: 10, max: 100).
    pub limit: Option<i64>,
}

/// GET /api/v1/loans
///
/// Most recent loans, newest first.
pub async fn list_recent_loans(
    State(state): State<AppState>,
    Query(query): Query<RecentLoansQuery>,
) -> AppResult<Json<DataResponse<Vec<Loan>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if !(1..=MAX_RECENT_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_RECENT_LIMIT}"
        )));
    }
    let loans = state.ledger.recent(limit).await?;
    Ok(Json(DataResponse { data: loans }))
}
