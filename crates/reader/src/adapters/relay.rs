//! Relay board actuators.

use std::path::PathBuf;

use async_trait::async_trait;
use lockbank_core::hardware::{relay_channel, Actuator, HardwareError};
use lockbank_core::types::LockerId;
use tokio::io::AsyncWriteExt;

/// Pulses a relay by writing its channel number as a single byte to the
/// board's serial device (relay `n` is channel `n - 1`).
///
/// The device is opened per unlock, so a board that was unplugged and
/// reconnected is picked up on the next scan.
pub struct RelayActuator {
    device: PathBuf,
}

impl RelayActuator {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

#[async_trait]
impl Actuator for RelayActuator {
    async fn unlock(&self, locker_id: LockerId) -> Result<(), HardwareError> {
        let channel = relay_channel(locker_id)?;
        let mut port = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.device)
            .await?;
        port.write_all(&[channel]).await?;
        port.flush().await?;
        tracing::debug!(locker_id, channel, device = %self.device.display(), "Relay pulsed");
        Ok(())
    }
}

/// Dry-run actuator for machines without a relay board.
#[derive(Debug, Default)]
pub struct LoggingActuator;

#[async_trait]
impl Actuator for LoggingActuator {
    async fn unlock(&self, locker_id: LockerId) -> Result<(), HardwareError> {
        let channel = relay_channel(locker_id)?;
        tracing::info!(locker_id, channel, "Dry run: would unlock locker");
        Ok(())
    }
}
