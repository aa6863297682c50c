//! Loan and return transactions.
//!
//! A loan touches both the ledger and the registry. [`LoanDesk`] runs the
//! ledger check, the ledger write and the occupancy change in one SQLite
//! transaction, so another process never observes an open loan whose locker
//! still reads `HOLDS_ITEM` (or the reverse).

use lockbank_core::types::{LoanId, LockerId, Occupancy, Timestamp};

use crate::error::StoreError;
use crate::repositories::loan_ledger::{close_in, latest_open_in, open_loan_in, resolve_open_locker_in};
use crate::repositories::locker_registry::{first_with_occupancy_in, set_occupancy_in};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// Loan committed; `locker_id` is now `EMPTY` and must be unlocked.
    Opened { loan_id: LoanId, locker_id: LockerId },
    /// Every locker is `EMPTY`.
    NoLockerAvailable,
    /// The email already has an open loan. Nothing was written.
    AlreadyOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Loan closed; `locker_id` is now `HOLDS_ITEM` and must be unlocked.
    Closed { loan_id: LoanId, locker_id: LockerId },
    /// The email has no open loan.
    NoOpenLoan,
    /// The open loan names a locker the registry does not know. Nothing was
    /// written.
    LockerMissing { loan_id: LoanId, locker_id: LockerId },
}

/// Borrow and return as single critical sections.
#[derive(Clone)]
pub struct LoanDesk {
    store: Store,
}

impl LoanDesk {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Lend the item from the lowest-numbered locker holding it.
    pub async fn borrow(&self, email: &str, now: Timestamp) -> Result<BorrowOutcome, StoreError> {
        let pool = self.store.pool();
        let outcome = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;

                if latest_open_in(&mut tx, email).await?.is_some() {
                    return Ok(BorrowOutcome::AlreadyOpen);
                }

                let Some(locker_id) = first_with_occupancy_in(&mut tx, Occupancy::HoldsItem).await?
                else {
                    return Ok(BorrowOutcome::NoLockerAvailable);
                };

                let Some(loan_id) = open_loan_in(&mut tx, email, locker_id, now).await? else {
                    return Ok(BorrowOutcome::AlreadyOpen);
                };
                set_occupancy_in(&mut tx, locker_id, Occupancy::Empty, now).await?;

                tx.commit().await?;
                Ok::<_, sqlx::Error>(BorrowOutcome::Opened { loan_id, locker_id })
            })
            .await?;

        if let BorrowOutcome::Opened { loan_id, locker_id } = outcome {
            tracing::info!(loan_id, locker_id, email, "Loan opened");
        }
        Ok(outcome)
    }

    /// Take the item back into the locker of the latest open loan.
    pub async fn give_back(&self, email: &str, now: Timestamp) -> Result<ReturnOutcome, StoreError> {
        let pool = self.store.pool();
        let outcome = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;

                let Some((loan_id, locker_id)) = latest_open_in(&mut tx, email).await? else {
                    return Ok(ReturnOutcome::NoOpenLoan);
                };

                if resolve_open_locker_in(&mut tx, email).await?.is_none() {
                    return Ok(ReturnOutcome::LockerMissing { loan_id, locker_id });
                }

                close_in(&mut tx, loan_id, now).await?;
                if !set_occupancy_in(&mut tx, locker_id, Occupancy::HoldsItem, now).await? {
                    return Ok(ReturnOutcome::LockerMissing { loan_id, locker_id });
                }

                tx.commit().await?;
                Ok::<_, sqlx::Error>(ReturnOutcome::Closed { loan_id, locker_id })
            })
            .await?;

        match outcome {
            ReturnOutcome::Closed { loan_id, locker_id } => {
                tracing::info!(loan_id, locker_id, email, "Loan closed");
            }
            ReturnOutcome::LockerMissing { loan_id, locker_id } => {
                tracing::error!(loan_id, locker_id, email, "Open loan references an unknown locker");
            }
            ReturnOutcome::NoOpenLoan => {}
        }
        Ok(outcome)
    }
}
