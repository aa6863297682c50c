//! Keyboard-wedge card reader.
//!
//! USB RFID readers in HID mode type the card UID followed by a newline. A
//! background task reads lines from the device (or stdin) and queues them;
//! [`LineCardReader::read_card`] only drains the queue, so the reader loop
//! never blocks on input.

use std::path::Path;

use async_trait::async_trait;
use lockbank_core::hardware::{CardReader, HardwareError};
use lockbank_core::types::CardId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Scans buffered between two polls. Extra scans are dropped.
const QUEUE_CAPACITY: usize = 16;

pub struct LineCardReader {
    rx: mpsc::Receiver<CardId>,
    closed: bool,
}

impl LineCardReader {
    /// Read card ids from standard input.
    pub fn stdin() -> Self {
        Self::spawn(BufReader::new(tokio::io::stdin()))
    }

    /// Read card ids from a character device or file.
    pub async fn open(path: &Path) -> Result<Self, HardwareError> {
        let file = tokio::fs::File::open(path).await?;
        tracing::info!(path = %path.display(), "Card reader opened");
        Ok(Self::spawn(BufReader::new(file)))
    }

    /// Read card ids from any line source.
    pub fn spawn<R>(source: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(async move {
            let mut lines = source.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Ok(card_id) = CardId::new(&line) else {
                            continue;
                        };
                        if tx.try_send(card_id).is_err() && tx.is_closed() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Card reader input failed");
                        break;
                    }
                }
            }
        });
        Self { rx, closed: false }
    }
}

#[async_trait]
impl CardReader for LineCardReader {
    async fn read_card(&mut self) -> Result<Option<CardId>, HardwareError> {
        match self.rx.try_recv() {
            Ok(card_id) => Ok(Some(card_id)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    self.closed = true;
                    tracing::warn!("Card reader input closed, no further scans");
                }
                Ok(None)
            }
        }
    }
}
