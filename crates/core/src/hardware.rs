//! Contracts for the physical side of the locker bank.
//!
//! Adapters live in the reader crate; the control loop only sees these
//! traits so it can be driven by fakes in tests.

use async_trait::async_trait;

use crate::types::{CardId, LockerId};

/// Highest relay channel the actuator board accepts (relays 1..=15).
pub const MAX_RELAY_CHANNEL: u8 = 14;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Locker number has no relay channel on this board.
    #[error("Locker {0} has no relay channel (valid channels: 0..={MAX_RELAY_CHANNEL})")]
    NoChannel(LockerId),

    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// Map a 1-based locker number to its 0-based relay channel.
pub fn relay_channel(locker_id: LockerId) -> Result<u8, HardwareError> {
    locker_id
        .checked_sub(1)
        .and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c <= MAX_RELAY_CHANNEL)
        .ok_or(HardwareError::NoChannel(locker_id))
}

/// Unlocks a locker door.
///
/// Implementations must be safe to call twice for the same locker: the
/// reader retries a failed unlock once.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn unlock(&self, locker_id: LockerId) -> Result<(), HardwareError>;
}

/// Source of card presentations.
///
/// `read_card` must return promptly with `Ok(None)` when no card is present.
#[async_trait]
pub trait CardReader: Send {
    async fn read_card(&mut self) -> Result<Option<CardId>, HardwareError>;
}
