//! `lockbank-reader` -- card reader daemon.
//!
//! Provisions the lockers, then polls the card reader until SIGINT/SIGTERM.
//!
//! # Environment variables
//!
//! | Variable                   | Default            | Description                         |
//! |----------------------------|--------------------|-------------------------------------|
//! | `DATABASE_PATH`            | `data/lockbank.db` | Shared SQLite file                  |
//! | `ASSOCIATION_TIMEOUT_SECS` | `20`               | Association window                  |
//! | `LOCKER_COUNT`             | `15`               | Lockers provisioned at start-up     |
//! | `CARD_COOLDOWN_MS`         | `3000`             | Ignore repeat reads of one card     |
//! | `POLL_INTERVAL_MS`         | `100`              | Loop period                         |
//! | `CARD_READER_PATH`         | stdin              | Keyboard-wedge reader device        |
//! | `RELAY_DEVICE`             | --                 | Relay board; unset means dry run    |

use std::sync::Arc;
use std::time::Duration;

use lockbank_core::association::AssociationPolicy;
use lockbank_core::hardware::{Actuator, CardReader};
use lockbank_db::{LockerRegistry, Store, StoreConfig};
use lockbank_reader::adapters::{LineCardReader, LoggingActuator, RelayActuator};
use lockbank_reader::{ReaderConfig, ReaderLoop};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockbank_reader=debug,lockbank_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ReaderConfig::from_env();
    let policy = AssociationPolicy::from_env();
    tracing::info!(
        locker_count = config.locker_count,
        association_timeout_secs = policy.timeout.as_secs(),
        "Loaded reader configuration"
    );

    // --- Database ---
    let store = Store::open(&StoreConfig::from_env())
        .await
        .expect("Failed to open database");

    LockerRegistry::new(store.clone())
        .provision(config.locker_count)
        .await
        .expect("Failed to provision lockers");

    // --- Devices ---
    let reader: Box<dyn CardReader> = match &config.card_reader_path {
        Some(path) => Box::new(
            LineCardReader::open(path)
                .await
                .expect("Failed to open card reader"),
        ),
        None => {
            tracing::info!("Reading card ids from stdin");
            Box::new(LineCardReader::stdin())
        }
    };

    let actuator: Arc<dyn Actuator> = match &config.relay_device {
        Some(device) => {
            tracing::info!(device = %device.display(), "Relay board configured");
            Arc::new(RelayActuator::new(device))
        }
        None => {
            tracing::warn!("RELAY_DEVICE not set, lockers will not be unlocked (dry run)");
            Arc::new(LoggingActuator)
        }
    };

    // --- Reader loop ---
    let cancel = CancellationToken::new();
    let reader_loop = ReaderLoop::new(store.clone(), policy, &config, reader, actuator);
    let loop_cancel = cancel.clone();
    let loop_handle = tokio::spawn(async move {
        reader_loop.run(loop_cancel).await;
    });

    shutdown_signal().await;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), loop_handle).await;
    store.close().await;

    tracing::info!("Graceful shutdown complete");
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
            tracing::info!("Received SIGINT (Ctrl-C), stopping reader");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping reader");
        }
    }
}
