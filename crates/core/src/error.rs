use crate::types::LockerId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Locker not found: {0}")]
    LockerNotFound(LockerId),

    #[error("Validation failed: {0}")]
    Validation(String),
}
