//! Repository for the `identities` table.

use lockbank_core::types::{CardId, Timestamp};
use sqlx::SqliteConnection;

use crate::error::{RegisterError, StoreError};
use crate::models::identity::Identity;
use crate::store::Store;

/// Column list for `identities` queries.
const COLUMNS: &str = "card_id, email, registered_at";

/// Card to email registrations. Append-only.
#[derive(Clone)]
pub struct IdentityDirectory {
    store: Store,
}

impl IdentityDirectory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Register `card_id` for `email`.
    ///
    /// Fails with [`RegisterError::AlreadyRegistered`] if either the card or
    /// the email already has an identity. The row is committed before `Ok`
    /// is returned.
    pub async fn register(
        &self,
        card_id: &CardId,
        email: &str,
        at: Timestamp,
    ) -> Result<(), RegisterError> {
        let pool = self.store.pool();
        let inserted = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let inserted = register_in(&mut tx, card_id, email, at).await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(inserted)
            })
            .await?;

        if inserted {
            tracing::info!(card_id = %card_id, email, "Card registered");
            Ok(())
        } else {
            Err(RegisterError::AlreadyRegistered {
                card_id: card_id.to_string(),
                email: email.to_string(),
            })
        }
    }

    /// Email registered for `card_id`, if any.
    pub async fn lookup(&self, card_id: &CardId) -> Result<Option<String>, StoreError> {
        let pool = self.store.pool();
        self.store
            .read(move || async move {
                sqlx::query_scalar::<_, String>("SELECT email FROM identities WHERE card_id = ?1")
                    .bind(card_id.as_str())
                    .fetch_optional(pool)
                    .await
            })
            .await
    }

    /// All identities, oldest registration first.
    pub async fn list(&self) -> Result<Vec<Identity>, StoreError> {
        let pool = self.store.pool();
        let query = format!("SELECT {COLUMNS} FROM identities ORDER BY registered_at, card_id");
        let query = query.as_str();
        self.store
            .read(move || async move {
                sqlx::query_as::<_, Identity>(query).fetch_all(pool).await
            })
            .await
    }
}

/// Insert an identity unless the card or the email is already taken.
///
/// Returns `false` (and writes nothing) on conflict.
pub(crate) async fn register_in(
    conn: &mut SqliteConnection,
    card_id: &CardId,
    email: &str,
    at: Timestamp,
) -> Result<bool, sqlx::Error> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM identities WHERE card_id = ?1 OR email = ?2 LIMIT 1",
    )
    .bind(card_id.as_str())
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    if taken.is_some() {
        return Ok(false);
    }

    let inserted = sqlx::query(
        "INSERT INTO identities (card_id, email, registered_at) VALUES (?1, ?2, ?3)",
    )
    .bind(card_id.as_str())
    .bind(email)
    .bind(at)
    .execute(&mut *conn)
    .await;

    match inserted {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
        Err(e) => Err(e),
    }
}
