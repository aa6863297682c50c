//! Locker models.

use lockbank_core::types::{LockerId, Occupancy, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Locker {
    pub locker_id: LockerId,
    #[sqlx(try_from = "String")]
    pub occupancy: Occupancy,
    pub updated_at: Timestamp,
}

impl Locker {
    /// A locker holding the item can serve a new loan.
    pub fn is_available(&self) -> bool {
        self.occupancy == Occupancy::HoldsItem
    }
}

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockerSummary {
    pub total: i64,
    pub available: i64,
    pub occupied: i64,
}
