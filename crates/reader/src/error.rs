use lockbank_core::hardware::HardwareError;
use lockbank_db::StoreError;

/// Failure of one reader iteration. The loop logs it and keeps polling.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Card reader error: {0}")]
    CardReader(#[from] HardwareError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
