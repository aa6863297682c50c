use lockbank_core::types::{LockerId, Timestamp};

/// Failure of the storage layer itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The database stayed locked by another process for every retry.
    #[error("Database busy after {attempts} attempts: {source}")]
    Busy {
        attempts: usize,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The card or the email already has an identity.
    #[error("Card {card_id} or email {email} is already registered")]
    AlreadyRegistered { card_id: String, email: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum LockerError {
    #[error("Locker {0} not found")]
    NotFound(LockerId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{email} already has an open loan")]
    AlreadyOpen { email: String },

    #[error("{email} has no open loan")]
    NoOpenLoan { email: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    /// Another association is waiting for its card scan.
    #[error("An association is already in progress until {expires_at}")]
    Busy { expires_at: Timestamp },

    #[error(transparent)]
    Store(#[from] StoreError),
}
