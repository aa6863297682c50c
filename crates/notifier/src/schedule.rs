//! Daily trigger for the reminder run.

use chrono::{Days, NaiveTime, Utc};
use lockbank_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::reminder::ReminderService;

/// First instant strictly after `now` whose UTC time of day is `at`.
pub fn next_run_after(now: Timestamp, at: NaiveTime) -> Timestamp {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        return today;
    }
    today
        .checked_add_days(Days::new(1))
        .unwrap_or(today)
}

/// Runs [`ReminderService::remind_overdue`] once a day until cancelled.
pub struct ReminderScheduler {
    service: ReminderService,
    at: NaiveTime,
}

impl ReminderScheduler {
    pub fn new(service: ReminderService, at: NaiveTime) -> Self {
        Self { service, at }
    }

    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.at);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next_run = %next, "Next reminder run scheduled");

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Reminder scheduler stopped");
                    break;
                }
                () = tokio::time::sleep(wait) => {
                    let today = Utc::now().date_naive();
                    if let Err(e) = self.service.remind_overdue(today).await {
                        tracing::error!(error = %e, "Reminder run failed");
                    }
                }
            }
        }
    }
}
