//! Loan ledger model.

use lockbank_core::types::{LoanId, LoanStatus, LockerId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One loan of the shared item. Closed loans are kept as history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub email: String,
    pub locker_id: LockerId,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    #[sqlx(try_from = "String")]
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }
}
