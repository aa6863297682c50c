use axum::extract::{Path, State};
use axum::Json;
use lockbank_core::error::CoreError;
use lockbank_core::types::LockerId;
use lockbank_db::models::locker::{Locker, LockerSummary};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/lockers
pub async fn list_lockers(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Locker>>>> {
    let lockers = state.lockers.list().await?;
    Ok(Json(DataResponse { data: lockers }))
}

/// GET /api/v1/lockers/summary
pub async fn locker_summary(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<LockerSummary>>> {
    let summary = state.lockers.summary().await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/lockers/{locker_id}
pub async fn get_locker(
    State(state): State<AppState>,
    Path(locker_id): Path<LockerId>,
) -> AppResult<Json<DataResponse<Locker>>> {
    let locker = state
        .lockers
        .get(locker_id)
        .await?
        .ok_or(CoreError::LockerNotFound(locker_id))?;
    Ok(Json(DataResponse { data: locker }))
}
