//! Overdue reminder service.
//!
//! Once a day the notifier reads the loan ledger (read-only) and emails every
//! borrower whose loan was opened the previous day and is still open.

pub mod config;
pub mod email;
pub mod reminder;
pub mod schedule;

pub use config::NotifierConfig;
pub use email::{EmailConfig, EmailDelivery, EmailError};
pub use reminder::{LoggingSender, ReminderReport, ReminderSender, ReminderService};
pub use schedule::ReminderScheduler;
