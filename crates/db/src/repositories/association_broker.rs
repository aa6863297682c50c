//! Hand-off between the registration web server and the card reader.
//!
//! The web process writes a request into the single `association_state` row;
//! the reader's next scan consumes it. The row moves through
//!
//! ```text
//! NORMAL --request--> ASSOCIATION --scan--> SUCCESS | ERROR
//!                          |
//!                          +--timeout (poll)--> NORMAL
//! ```
//!
//! A finished request (SUCCESS / ERROR) stays visible to the status page
//! until the next request replaces it.

use lockbank_core::association::AssociationPolicy;
use lockbank_core::types::{AssociationMode, CardId, Timestamp};
use sqlx::SqliteConnection;

use crate::error::{AssociationError, StoreError};
use crate::models::association::{AssociationRecord, AssociationStatus};
use crate::repositories::identity_directory::register_in;
use crate::store::Store;

/// Message written when registration is refused.
pub const ALREADY_REGISTERED_MESSAGE: &str = "Card or email already registered";

/// Result of consuming a pending request with a card scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillOutcome {
    /// The card is now registered; the request reads SUCCESS.
    Registered,
    /// The card or the email was already taken; the request reads ERROR.
    AlreadyRegistered,
    /// The request for this email is no longer pending. Nothing was written.
    Superseded,
}

#[derive(Clone)]
pub struct AssociationBroker {
    store: Store,
    policy: AssociationPolicy,
}

impl AssociationBroker {
    pub fn new(store: Store, policy: AssociationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &AssociationPolicy {
        &self.policy
    }

    /// Ask the reader to bind its next scan to `email`.
    ///
    /// Fails with [`AssociationError::Busy`] while a live request for another
    /// email is pending. Re-submitting the pending email is accepted and does
    /// not extend its window.
    pub async fn request_association(
        &self,
        email: &str,
        now: Timestamp,
    ) -> Result<(), AssociationError> {
        let pool = self.store.pool();
        let policy = self.policy;
        let refused_until = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let record = current_in(&mut tx).await?;

                match (record.pending_email(&policy, now), record.issued_at) {
                    (Some(pending), _) if pending == email => return Ok(None),
                    (Some(_), Some(issued_at)) => return Ok(Some(policy.expires_at(issued_at))),
                    _ => {}
                }

                sqlx::query(
                    "UPDATE association_state \
                     SET mode = ?1, email = ?2, card_id = NULL, message = NULL, issued_at = ?3 \
                     WHERE id = 1",
                )
                .bind(AssociationMode::Association.as_str())
                .bind(email)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok::<_, sqlx::Error>(None)
            })
            .await?;

        match refused_until {
            Some(expires_at) => {
                tracing::info!(email, %expires_at, "Association refused, another request pending");
                Err(AssociationError::Busy { expires_at })
            }
            None => {
                tracing::info!(email, "Association requested");
                Ok(())
            }
        }
    }

    /// Email waiting for a card scan, if any.
    ///
    /// An ASSOCIATION request past its deadline is reset to NORMAL here, so
    /// a late scan is treated as an ordinary loan scan.
    pub async fn poll(&self, now: Timestamp) -> Result<Option<String>, StoreError> {
        let record = self.current().await?;
        if let Some(email) = record.pending_email(&self.policy, now) {
            return Ok(Some(email.to_string()));
        }
        if !record.is_expired_request(&self.policy, now) {
            return Ok(None);
        }

        let pool = self.store.pool();
        let policy = self.policy;
        let expired = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let record = current_in(&mut tx).await?;
                if !record.is_expired_request(&policy, now) {
                    return Ok(None);
                }
                sqlx::query("UPDATE association_state SET mode = ?1 WHERE id = 1")
                    .bind(AssociationMode::Normal.as_str())
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(record.email)
            })
            .await?;

        if let Some(email) = expired {
            tracing::info!(email = %email, "Association request timed out");
        }
        Ok(None)
    }

    /// Bind `card_id` to the pending `email` and record the outcome.
    ///
    /// Registration and the outcome are committed together, so the request is
    /// consumed exactly once whichever way it ends.
    pub async fn fulfill(
        &self,
        card_id: &CardId,
        email: &str,
        now: Timestamp,
    ) -> Result<FulfillOutcome, StoreError> {
        let pool = self.store.pool();
        let outcome = self
            .store
            .write(move || async move {
                let mut tx = pool.begin().await?;
                let record = current_in(&mut tx).await?;
                if record.mode != AssociationMode::Association
                    || record.email.as_deref() != Some(email)
                {
                    return Ok(FulfillOutcome::Superseded);
                }

                let (outcome, mode, message) = if register_in(&mut tx, card_id, email, now).await? {
                    (FulfillOutcome::Registered, AssociationMode::Success, None)
                } else {
                    (
                        FulfillOutcome::AlreadyRegistered,
                        AssociationMode::Error,
                        Some(ALREADY_REGISTERED_MESSAGE),
                    )
                };

                sqlx::query(
                    "UPDATE association_state SET mode = ?1, card_id = ?2, message = ?3 WHERE id = 1",
                )
                .bind(mode.as_str())
                .bind(card_id.as_str())
                .bind(message)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok::<_, sqlx::Error>(outcome)
            })
            .await?;

        match outcome {
            FulfillOutcome::Registered => tracing::info!(card_id = %card_id, email, "Card associated"),
            FulfillOutcome::AlreadyRegistered => {
                tracing::warn!(card_id = %card_id, email, "Association refused, already registered")
            }
            FulfillOutcome::Superseded => {
                tracing::warn!(card_id = %card_id, email, "Association request no longer pending")
            }
        }
        Ok(outcome)
    }

    /// What the registration page should show at `now`. Read-only.
    pub async fn status(&self, now: Timestamp) -> Result<AssociationStatus, StoreError> {
        Ok(self.current().await?.status(&self.policy, now))
    }

    pub async fn current(&self) -> Result<AssociationRecord, StoreError> {
        let pool = self.store.pool();
        self.store
            .read(move || async move {
                let mut conn = pool.acquire().await?;
                current_in(&mut conn).await
            })
            .await
    }
}

async fn current_in(conn: &mut SqliteConnection) -> Result<AssociationRecord, sqlx::Error> {
    sqlx::query_as::<_, AssociationRecord>(
        "SELECT mode, email, card_id, message, issued_at FROM association_state WHERE id = 1",
    )
    .fetch_one(&mut *conn)
    .await
}
