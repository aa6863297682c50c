//! Repository for the `lockers` table.

use chrono::Utc;
use lockbank_core::types::{LockerId, Occupancy, Timestamp};
use sqlx::SqliteConnection;

use crate::error::{LockerError, StoreError};
use crate::models::locker::{Locker, LockerSummary};
use crate::store::Store;

/// Column list for `lockers` queries.
const COLUMNS: &str = "locker_id, occupancy, updated_at";

/// Occupancy of every physical locker.
#[derive(Clone)]
pub struct LockerRegistry {
    store: Store,
}

impl LockerRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create lockers `1..=count` that do not exist yet.
    ///
    /// New lockers start out holding the item. Existing lockers keep their
    /// occupancy, so this is safe to run on every start-up. Returns the
    /// number of lockers created.
    pub async fn provision(&self, count: LockerId) -> Result<u64, StoreError> {
        let pool = self.store.pool();
        let now = Utc::now();
        let created = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let mut created = 0;
                for locker_id in 1..=count {
                    created += sqlx::query(
                        "INSERT OR IGNORE INTO lockers (locker_id, occupancy, updated_at) \
                         VALUES (?1, ?2, ?3)",
                    )
                    .bind(locker_id)
                    .bind(Occupancy::HoldsItem.as_str())
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                }
                tx.commit().await?;
                Ok::<_, sqlx::Error>(created)
            })
            .await?;

        if created > 0 {
            tracing::info!(created, count, "Provisioned lockers");
        }
        Ok(created)
    }

    /// Lowest-numbered locker currently in `occupancy`.
    pub async fn first_with_occupancy(
        &self,
        occupancy: Occupancy,
    ) -> Result<Option<LockerId>, StoreError> {
        let pool = self.store.pool();
        self.store
            .read(move || async move {
                let mut conn = pool.acquire().await?;
                first_with_occupancy_in(&mut conn, occupancy).await
            })
            .await
    }

    pub async fn set_occupancy(
        &self,
        locker_id: LockerId,
        occupancy: Occupancy,
    ) -> Result<(), LockerError> {
        let pool = self.store.pool();
        let now = Utc::now();
        let found = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let found = set_occupancy_in(&mut tx, locker_id, occupancy, now).await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(found)
            })
            .await?;

        if found {
            tracing::debug!(locker_id, occupancy = occupancy.as_str(), "Locker occupancy set");
            Ok(())
        } else {
            Err(LockerError::NotFound(locker_id))
        }
    }

    pub async fn get(&self, locker_id: LockerId) -> Result<Option<Locker>, StoreError> {
        let pool = self.store.pool();
        let query = format!("SELECT {COLUMNS} FROM lockers WHERE locker_id = ?1");
        let query = query.as_str();
        self.store
            .read(move || async move {
                sqlx::query_as::<_, Locker>(query)
                    .bind(locker_id)
                    .fetch_optional(pool)
                    .await
            })
            .await
    }

    /// All lockers ordered by number.
    pub async fn list(&self) -> Result<Vec<Locker>, StoreError> {
        let pool = self.store.pool();
        let query = format!("SELECT {COLUMNS} FROM lockers ORDER BY locker_id");
        let query = query.as_str();
        self.store
            .read(move || async move { sqlx::query_as::<_, Locker>(query).fetch_all(pool).await })
            .await
    }

    pub async fn summary(&self) -> Result<LockerSummary, StoreError> {
        let pool = self.store.pool();
        let (total, available) = self
            .store
            .read(move || async move {
                sqlx::query_as::<_, (i64, i64)>(
                    "SELECT COUNT(*), COALESCE(SUM(occupancy = 'HOLDS_ITEM'), 0) FROM lockers",
                )
                .fetch_one(pool)
                .await
            })
            .await?;

        Ok(LockerSummary {
            total,
            available,
            occupied: total - available,
        })
    }
}

pub(crate) async fn first_with_occupancy_in(
    conn: &mut SqliteConnection,
    occupancy: Occupancy,
) -> Result<Option<LockerId>, sqlx::Error> {
    sqlx::query_scalar::<_, LockerId>(
        "SELECT locker_id FROM lockers WHERE occupancy = ?1 ORDER BY locker_id LIMIT 1",
    )
    .bind(occupancy.as_str())
    .fetch_optional(&mut *conn)
    .await
}

/// Returns `false` if the locker does not exist.
pub(crate) async fn set_occupancy_in(
    conn: &mut SqliteConnection,
    locker_id: LockerId,
    occupancy: Occupancy,
    at: Timestamp,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE lockers SET occupancy = ?2, updated_at = ?3 WHERE locker_id = ?1")
        .bind(locker_id)
        .bind(occupancy.as_str())
        .bind(at)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
