//! Handlers for the card association hand-off.
//!
//! The web page posts an email, then polls the status endpoint while the user
//! scans their card on the reader.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use lockbank_db::models::association::AssociationStatus;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for starting an association.
#[derive(Debug, Deserialize, Validate)]
pub struct AssociationRequest {
    #[validate(length(min = 3, max = 254, message = "email must be 3 to 254 characters"))]
    pub email: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/associations
///
/// Ask the reader to bind the next scanned card to `email`. The address must
/// be on an allowed domain. Responds 409 while another request is pending.
pub async fn request_association(
    State(state): State<AppState>,
    Json(input): Json<AssociationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AssociationStatus>>)> {
    input.validate()?;
    let email = state.email_policy.normalize(&input.email)?;

    let now = Utc::now();
    state.broker.request_association(&email, now).await?;
    let status = state.broker.status(now).await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: status })))
}

/// GET /api/v1/associations/status
pub async fn association_status(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<AssociationStatus>>> {
    let status = state.broker.status(Utc::now()).await?;
    Ok(Json(DataResponse { data: status }))
}
