//! Card identity model.

use lockbank_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A card registered to an institutional email. Never mutated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Identity {
    pub card_id: String,
    pub email: String,
    pub registered_at: Timestamp,
}
