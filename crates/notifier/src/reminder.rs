//! Overdue loan reminders.
//!
//! A loan opened on day D that is still open when the notifier runs on day
//! D+1 earns its borrower one reminder. Borrowers with several such loans
//! still get a single email per run.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use lockbank_db::models::loan::Loan;
use lockbank_db::{LoanLedger, StoreError};

use crate::email::EmailError;

pub const REMINDER_SUBJECT: &str = "Reminder: please return the HDMI cable";

pub const REMINDER_BODY: &str = "Hello,

Our records show that you borrowed the HDMI cable from the locker bank and have not returned it yet.
Please bring it back as soon as possible so other students can use it.

Thank you,
The locker bank";

/// Delivers one reminder to one address.
#[async_trait]
pub trait ReminderSender: Send + Sync {
    async fn send_reminder(&self, to_email: &str) -> Result<(), EmailError>;
}

/// Sender used when SMTP is not configured: the reminder is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSender;

#[async_trait]
impl ReminderSender for LoggingSender {
    async fn send_reminder(&self, to_email: &str) -> Result<(), EmailError> {
        tracing::info!(to = to_email, "SMTP not configured, reminder logged only");
        Ok(())
    }
}

/// Outcome of one reminder run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReminderReport {
    /// Distinct borrowers selected for a reminder.
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Reads the ledger and hands every overdue borrower to a [`ReminderSender`].
///
/// The service never writes to the store.
#[derive(Clone)]
pub struct ReminderService {
    ledger: LoanLedger,
    sender: Arc<dyn ReminderSender>,
}

impl ReminderService {
    pub fn new(ledger: LoanLedger, sender: Arc<dyn ReminderSender>) -> Self {
        Self { ledger, sender }
    }

    /// Remind every borrower whose loan was opened the day before `today`
    /// (UTC) and is still open.
    pub async fn remind_overdue(&self, today: NaiveDate) -> Result<ReminderReport, StoreError> {
        let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
            return Ok(ReminderReport::default());
        };
        let loans = self.ledger.overdue_since(yesterday).await?;
        tracing::info!(
            date = %yesterday,
            loans = loans.len(),
            "Selected loans opened yesterday and still open"
        );
        Ok(self.send_all(&loans).await)
    }

    /// Remind every borrower with an open loan, whatever its age.
    pub async fn remind_all_open(&self) -> Result<ReminderReport, StoreError> {
        let loans = self.ledger.open_loans().await?;
        tracing::info!(loans = loans.len(), "Selected every open loan");
        Ok(self.send_all(&loans).await)
    }

    async fn send_all(&self, loans: &[Loan]) -> ReminderReport {
        let recipients: BTreeSet<&str> = loans
            .iter()
            .map(|loan| loan.email.as_str())
            .filter(|email| !email.is_empty())
            .collect();

        let mut report = ReminderReport {
            recipients: recipients.len(),
            ..ReminderReport::default()
        };

        // One failed address does not stop the others.
        for email in recipients {
            match self.sender.send_reminder(email).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::warn!(to = email, error = %e, "Failed to send reminder");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            recipients = report.recipients,
            sent = report.sent,
            failed = report.failed,
            "Reminder run finished"
        );
        report
    }
}
