//! The card reader control loop.
//!
//! ```text
//! IDLE --card--> DEBOUNCE_CHECK --+--> ASSOCIATION_FLOW --+--> COOLDOWN --> IDLE
//!                                 +--> LOAN_FLOW ---------+
//! ```
//!
//! Loans and returns are committed before the relay is pulsed. A crash in
//! between leaves a loan whose locker never opened, which the operator can
//! see in the ledger, and never an opened locker without a record. A failed
//! unlock is retried once, then logged; the committed record stays.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use lockbank_core::association::AssociationPolicy;
use lockbank_core::cooldown::CardCooldown;
use lockbank_core::hardware::{Actuator, CardReader};
use lockbank_core::types::{CardId, LoanId, LockerId, Timestamp};
use lockbank_db::{
    AssociationBroker, BorrowOutcome, FulfillOutcome, IdentityDirectory, LoanDesk, ReturnOutcome,
    Store,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::ReaderConfig;
use crate::error::ReaderError;

/// What one accepted (or ignored) card read led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Same card inside its cooldown window. Nothing happened.
    Debounced { card_id: CardId },
    /// The scan consumed a pending association.
    Association {
        card_id: CardId,
        email: String,
        outcome: FulfillOutcome,
    },
    /// Card has no registered email. Nothing written.
    UnknownIdentity { card_id: CardId },
    Borrowed {
        email: String,
        loan_id: LoanId,
        locker_id: LockerId,
        unlocked: bool,
    },
    Returned {
        email: String,
        loan_id: LoanId,
        locker_id: LockerId,
        unlocked: bool,
    },
    /// Every locker is empty. Nothing written.
    NoLockerAvailable { email: String },
    /// Another process opened a loan for this email first. Nothing written.
    AlreadyOpenRace { email: String },
    /// The open loan names a locker that does not exist. Nothing written.
    LedgerInconsistency {
        email: String,
        loan_id: LoanId,
        locker_id: LockerId,
    },
}

pub struct ReaderLoop {
    handler: ScanHandler,
    cooldown: CardCooldown,
    poll_interval: Duration,
    reader: Box<dyn CardReader>,
}

/// Store and actuator side of the loop, shared across awaits.
struct ScanHandler {
    directory: IdentityDirectory,
    desk: LoanDesk,
    broker: AssociationBroker,
    actuator: Arc<dyn Actuator>,
}

impl ReaderLoop {
    pub fn new(
        store: Store,
        policy: AssociationPolicy,
        config: &ReaderConfig,
        reader: Box<dyn CardReader>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            handler: ScanHandler {
                directory: IdentityDirectory::new(store.clone()),
                desk: LoanDesk::new(store.clone()),
                broker: AssociationBroker::new(store, policy),
                actuator,
            },
            cooldown: CardCooldown::new(config.card_cooldown),
            poll_interval: config.poll_interval,
            reader,
        }
    }

    /// Poll until `cancel` fires.
    ///
    /// Cancellation is only observed between iterations, so a running
    /// transaction always completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            cooldown_ms = self.cooldown.window().as_millis() as u64,
            "Reader loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reader loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.step(Utc::now(), Instant::now()).await {
                        Ok(Some(outcome)) => log_outcome(&outcome),
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "Reader iteration failed"),
                    }
                }
            }
        }
    }

    /// One iteration: poll the association, read a card, act on it.
    ///
    /// `now` stamps records and times the association window; `mono` drives
    /// the card cooldown. Returns `None` when no card was presented.
    pub async fn step(
        &mut self,
        now: Timestamp,
        mono: Instant,
    ) -> Result<Option<ScanOutcome>, ReaderError> {
        let pending = self.handler.broker.poll(now).await?;

        let Some(card_id) = self.reader.read_card().await? else {
            return Ok(None);
        };

        if self.cooldown.is_cooling(&card_id, mono) {
            return Ok(Some(ScanOutcome::Debounced { card_id }));
        }

        let outcome = match pending {
            Some(email) => {
                let outcome = self.handler.broker.fulfill(&card_id, &email, now).await?;
                ScanOutcome::Association {
                    card_id: card_id.clone(),
                    email,
                    outcome,
                }
            }
            None => self.handler.loan_flow(&card_id, now).await?,
        };

        self.cooldown.record(card_id, mono);
        Ok(Some(outcome))
    }
}

impl ScanHandler {
    async fn loan_flow(&self, card_id: &CardId, now: Timestamp) -> Result<ScanOutcome, ReaderError> {
        let Some(email) = self.directory.lookup(card_id).await? else {
            return Ok(ScanOutcome::UnknownIdentity {
                card_id: card_id.clone(),
            });
        };

        match self.desk.give_back(&email, now).await? {
            ReturnOutcome::Closed { loan_id, locker_id } => {
                let unlocked = self.unlock(locker_id).await;
                return Ok(ScanOutcome::Returned {
                    email,
                    loan_id,
                    locker_id,
                    unlocked,
                });
            }
            ReturnOutcome::LockerMissing { loan_id, locker_id } => {
                return Ok(ScanOutcome::LedgerInconsistency {
                    email,
                    loan_id,
                    locker_id,
                });
            }
            ReturnOutcome::NoOpenLoan => {}
        }

        let outcome = match self.desk.borrow(&email, now).await? {
            BorrowOutcome::Opened { loan_id, locker_id } => {
                let unlocked = self.unlock(locker_id).await;
                ScanOutcome::Borrowed {
                    email,
                    loan_id,
                    locker_id,
                    unlocked,
                }
            }
            BorrowOutcome::NoLockerAvailable => ScanOutcome::NoLockerAvailable { email },
            BorrowOutcome::AlreadyOpen => ScanOutcome::AlreadyOpenRace { email },
        };
        Ok(outcome)
    }

    /// Pulse the relay, retrying once. Returns whether the door opened.
    async fn unlock(&self, locker_id: LockerId) -> bool {
        let first = match self.actuator.unlock(locker_id).await {
            Ok(()) => return true,
            Err(e) => e,
        };
        tracing::warn!(locker_id, error = %first, "Unlock failed, retrying once");

        match self.actuator.unlock(locker_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(locker_id, error = %e, "Unlock failed, record kept");
                false
            }
        }
    }
}

fn log_outcome(outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Debounced { card_id } => {
            tracing::debug!(card_id = %card_id, "Card in cooldown, ignored");
        }
        ScanOutcome::Association { .. } => {}
        ScanOutcome::UnknownIdentity { card_id } => {
            tracing::warn!(card_id = %card_id, "Unknown card, register it first");
        }
        ScanOutcome::Borrowed {
            email, locker_id, ..
        } => {
            tracing::info!(email = %email, locker_id, "Item lent");
        }
        ScanOutcome::Returned {
            email, locker_id, ..
        } => {
            tracing::info!(email = %email, locker_id, "Item returned");
        }
        ScanOutcome::NoLockerAvailable { email } => {
            tracing::warn!(email = %email, "No locker holds the item");
        }
        ScanOutcome::AlreadyOpenRace { email } => {
            tracing::warn!(email = %email, "Loan opened concurrently, scan ignored");
        }
        ScanOutcome::LedgerInconsistency {
            email,
            loan_id,
            locker_id,
        } => {
            tracing::error!(email = %email, loan_id, locker_id, "Open loan has no locker, not repaired");
        }
    }
}
