//! Repository for the `loans` table.

use chrono::NaiveDate;
use lockbank_core::types::{LoanId, LockerId, Timestamp};
use sqlx::SqliteConnection;

use crate::error::{LedgerError, StoreError};
use crate::models::loan::Loan;
use crate::store::Store;

/// Column list for `loans` queries.
const COLUMNS: &str = "loan_id, email, locker_id, opened_at, closed_at, status";

/// Largest page served by [`LoanLedger::recent`].
pub const MAX_RECENT_LIMIT: i64 = 100;

/// Loan history. At most one OPEN loan per email.
#[derive(Clone)]
pub struct LoanLedger {
    store: Store,
}

impl LoanLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open a loan for `email` at `locker_id`.
    ///
    /// The open-loan check and the insert run in one transaction under the
    /// write gate; if `email` already has an OPEN loan nothing is written.
    pub async fn open_loan(
        &self,
        email: &str,
        locker_id: LockerId,
        at: Timestamp,
    ) -> Result<LoanId, LedgerError> {
        let pool = self.store.pool();
        let opened = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let opened = open_loan_in(&mut tx, email, locker_id, at).await?;
                if opened.is_some() {
                    tx.commit().await?;
                }
                Ok::<_, sqlx::Error>(opened)
            })
            .await?;

        match opened {
            Some(loan_id) => {
                tracing::info!(loan_id, email, locker_id, "Loan opened");
                Ok(loan_id)
            }
            None => Err(LedgerError::AlreadyOpen {
                email: email.to_string(),
            }),
        }
    }

    /// Close the OPEN loan of `email` with the greatest id.
    pub async fn close_latest_open(&self, email: &str, at: Timestamp) -> Result<LoanId, LedgerError> {
        let pool = self.store.pool();
        let closed = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let Some((loan_id, _)) = latest_open_in(&mut tx, email).await? else {
                    return Ok(None);
                };
                close_in(&mut tx, loan_id, at).await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(Some(loan_id))
            })
            .await?;

        match closed {
            Some(loan_id) => {
                tracing::info!(loan_id, email, "Loan closed");
                Ok(loan_id)
            }
            None => Err(LedgerError::NoOpenLoan {
                email: email.to_string(),
            }),
        }
    }

    pub async fn has_open_loan(&self, email: &str) -> Result<bool, StoreError> {
        let pool = self.store.pool();
        self.store
            .read(move || async move {
                let mut conn = pool.acquire().await?;
                Ok::<_, sqlx::Error>(latest_open_in(&mut conn, email).await?.is_some())
            })
            .await
    }

    /// Locker tied to the current OPEN loan of `email`.
    ///
    /// `None` when there is no open loan, or when the loan points at a locker
    /// the registry does not know.
    pub async fn open_loan_locker(&self, email: &str) -> Result<Option<LockerId>, StoreError> {
        let pool = self.store.pool();
        self.store
            .read(move || async move {
                let mut conn = pool.acquire().await?;
                resolve_open_locker_in(&mut conn, email).await
            })
            .await
    }

    /// OPEN loans whose `opened_at` falls on `date` (UTC). Read-only.
    pub async fn overdue_since(&self, date: NaiveDate) -> Result<Vec<Loan>, StoreError> {
        let loans = self.open_loans().await?;
        Ok(loans
            .into_iter()
            .filter(|loan| loan.opened_at.date_naive() == date)
            .collect())
    }

    /// Every OPEN loan, oldest first.
    pub async fn open_loans(&self) -> Result<Vec<Loan>, StoreError> {
        let pool = self.store.pool();
        let query = format!("SELECT {COLUMNS} FROM loans WHERE status = 'OPEN' ORDER BY loan_id");
        let query = query.as_str();
        self.store
            .read(move || async move { sqlx::query_as::<_, Loan>(query).fetch_all(pool).await })
            .await
    }

    /// Most recent loans, newest first. `limit` is clamped to `1..=100`.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Loan>, StoreError> {
        let pool = self.store.pool();
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        let query = format!("SELECT {COLUMNS} FROM loans ORDER BY loan_id DESC LIMIT ?1");
        let query = query.as_str();
        self.store
            .read(move || async move {
                sqlx::query_as::<_, Loan>(query)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            })
            .await
    }

    pub async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>, StoreError> {
        let pool = self.store.pool();
        let query = format!("SELECT {COLUMNS} FROM loans WHERE loan_id = ?1");
        let query = query.as_str();
        self.store
            .read(move || async move {
                sqlx::query_as::<_, Loan>(query)
                    .bind(loan_id)
                    .fetch_optional(pool)
                    .await
            })
            .await
    }
}

/// Insert an OPEN loan unless `email` already has one.
///
/// Returns `None` (nothing written) when an OPEN loan exists. The partial
/// unique index `uq_loans_open_email` backs the check.
pub(crate) async fn open_loan_in(
    conn: &mut SqliteConnection,
    email: &str,
    locker_id: LockerId,
    at: Timestamp,
) -> Result<Option<LoanId>, sqlx::Error> {
    if latest_open_in(conn, email).await?.is_some() {
        return Ok(None);
    }

    let inserted = sqlx::query_scalar::<_, LoanId>(
        "INSERT INTO loans (email, locker_id, opened_at, status) \
         VALUES (?1, ?2, ?3, 'OPEN') \
         RETURNING loan_id",
    )
    .bind(email)
    .bind(locker_id)
    .bind(at)
    .fetch_one(&mut *conn)
    .await;

    match inserted {
        Ok(loan_id) => Ok(Some(loan_id)),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
        Err(e) => Err(e),
    }
}

/// `(loan_id, locker_id)` of the OPEN loan of `email` with the greatest id.
pub(crate) async fn latest_open_in(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<(LoanId, LockerId)>, sqlx::Error> {
    sqlx::query_as::<_, (LoanId, LockerId)>(
        "SELECT loan_id, locker_id FROM loans \
         WHERE email = ?1 AND status = 'OPEN' \
         ORDER BY loan_id DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await
}

/// Locker of the latest OPEN loan, only if that locker exists.
pub(crate) async fn resolve_open_locker_in(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<LockerId>, sqlx::Error> {
    sqlx::query_scalar::<_, LockerId>(
        "SELECT k.locker_id FROM loans l \
         JOIN lockers k ON k.locker_id = l.locker_id \
         WHERE l.email = ?1 AND l.status = 'OPEN' \
         ORDER BY l.loan_id DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await
}

pub(crate) async fn close_in(
    conn: &mut SqliteConnection,
    loan_id: LoanId,
    at: Timestamp,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE loans SET status = 'CLOSED', closed_at = ?2 WHERE loan_id = ?1 AND status = 'OPEN'")
        .bind(loan_id)
        .bind(at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
