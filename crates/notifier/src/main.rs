//! `lockbank-notifier` -- overdue reminder service.
//!
//! ```text
//! lockbank-notifier           run every day at REMINDER_AT (UTC)
//! lockbank-notifier --once    remind yesterday's open loans now, then exit
//! lockbank-notifier --test    wait TEST_DELAY_MS, remind every open loan, exit
//! ```
//!
//! # Environment variables
//!
//! | Variable        | Default            | Description                        |
//! |-----------------|--------------------|------------------------------------|
//! | `DATABASE_PATH` | `data/lockbank.db` | Shared SQLite file                 |
//! | `REMINDER_AT`   | `08:30`            | Daily run time, UTC                |
//! | `TEST_DELAY_MS` | `30000`            | Delay before the `--test` run      |
//! | `SMTP_HOST`     | --                 | Unset means reminders are logged   |

use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lockbank_db::{LoanLedger, Store, StoreConfig, StoreError};
use lockbank_notifier::{
    EmailConfig, EmailDelivery, EmailError, LoggingSender, NotifierConfig, ReminderScheduler,
    ReminderSender, ReminderService,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Daily,
    Once,
    Test,
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "--once" => Ok(Self::Once),
            "--test" => Ok(Self::Test),
            _ => Err(AppError::Usage),
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error("usage: lockbank-notifier [--once|--test]")]
    Usage,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Email(#[from] EmailError),
}

fn parse_mode() -> Result<Mode, AppError> {
    match std::env::args().nth(1) {
        None => Ok(Mode::Daily),
        Some(arg) => Mode::from_str(&arg),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockbank_notifier=debug,lockbank_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "lockbank-notifier failed");
        process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let mode = parse_mode()?;
    let config = NotifierConfig::from_env();
    tracing::info!(?mode, reminder_at = %config.reminder_at, "Loaded notifier configuration");

    // --- Database ---
    let store = Store::open(&StoreConfig::from_env()).await?;

    // --- Delivery ---
    let sender: Arc<dyn ReminderSender> = match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "SMTP configured");
            Arc::new(EmailDelivery::new(&email)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, reminders will only be logged");
            Arc::new(LoggingSender)
        }
    };
    let service = ReminderService::new(LoanLedger::new(store.clone()), sender);

    match mode {
        Mode::Once => {
            service.remind_overdue(Utc::now().date_naive()).await?;
        }
        Mode::Test => {
            tracing::info!(delay_ms = config.test_delay.as_millis() as u64, "Test mode");
            tokio::select! {
                () = shutdown_signal() => {}
                () = tokio::time::sleep(config.test_delay) => {
                    service.remind_all_open().await?;
                }
            }
        }
        Mode::Daily => {
            let cancel = CancellationToken::new();
            let scheduler = ReminderScheduler::new(service, config.reminder_at);
            let scheduler_cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                scheduler.run(scheduler_cancel).await;
            });

            shutdown_signal().await;

            cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }

    store.close().await;
    tracing::info!("Notifier stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping notifier");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping notifier");
        }
    }
}
