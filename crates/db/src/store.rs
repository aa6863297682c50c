//! Shared SQLite store.
//!
//! One [`Store`] is constructed per process and cloned into every component.
//! Mutations go through [`Store::write`], which
//!
//! 1. takes the in-process write gate, so two tasks of one process never race
//!    on a read-modify-write;
//! 2. runs the operation (which opens its own transaction) under the
//!    [`RetryPolicy`], so a transaction that loses against another process
//!    is rolled back and replayed instead of overwriting newer state.
//!
//! SQLite serialises writers across processes. A transaction that read a
//! snapshot another process has since committed over fails with
//! `SQLITE_BUSY_SNAPSHOT` rather than committing, which is what makes the
//! check-then-act sequences safe without a database server.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::retry::RetryPolicy;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Default location of the database file, relative to the working directory.
const DEFAULT_DATABASE_PATH: &str = "data/lockbank.db";

/// Default time SQLite itself waits on a locked file before reporting busy.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 250;

/// Default number of attempts for an operation that keeps hitting a lock.
const DEFAULT_RETRY_ATTEMPTS: usize = 5;

/// Upper bound on waiting for a free pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_CONNECTIONS: u32 = 4;

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file (created if missing).
    pub path: PathBuf,
    /// How long SQLite waits on a locked database before returning busy.
    pub busy_timeout: Duration,
    /// Retry policy applied on top of `busy_timeout`.
    pub retry: RetryPolicy,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            retry: RetryPolicy::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default             |
    /// |----------------------|---------------------|
    /// | `DATABASE_PATH`      | `data/lockbank.db`  |
    /// | `DB_BUSY_TIMEOUT_MS` | `250`               |
    /// | `DB_RETRY_ATTEMPTS`  | `5`                 |
    pub fn from_env() -> Self {
        let path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.into());

        let busy_timeout_ms: u64 = std::env::var("DB_BUSY_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_BUSY_TIMEOUT_MS.to_string())
            .parse()
            .expect("DB_BUSY_TIMEOUT_MS must be a valid u64");

        let attempts: usize = std::env::var("DB_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_RETRY_ATTEMPTS.to_string())
            .parse()
            .expect("DB_RETRY_ATTEMPTS must be a valid usize");

        let defaults = RetryPolicy::default();

        Self {
            path: PathBuf::from(path),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            retry: RetryPolicy::new(
                attempts,
                defaults.base_delay_ms,
                defaults.max_delay_ms,
                defaults.jitter_pct,
            ),
        }
    }
}

/// Handle to the shared database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
    retry: RetryPolicy,
}

impl Store {
    /// Open (creating if needed) the database and apply pending migrations.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        ensure_parent_dir(&config.path)?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        // Two processes starting together may both try to migrate; the loser
        // sees the winner's work on the second pass.
        if let Err(e) = MIGRATOR.run(&pool).await {
            tracing::warn!(error = %e, "Migration attempt failed, retrying once");
            tokio::time::sleep(config.busy_timeout).await;
            MIGRATOR.run(&pool).await?;
        }

        tracing::info!(path = %config.path.display(), "Store opened");

        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
            retry: config.retry.clone(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction on a pooled connection.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Run a read-modify-write operation as a single-writer critical section.
    ///
    /// `op` is called once per attempt and must open and commit its own
    /// transaction; returning before `commit` rolls the attempt back.
    pub async fn write<F, Fut, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let _gate = self.write_gate.lock().await;
        self.retry.run(op).await
    }

    /// Run a read-only operation, retrying on transient contention.
    pub async fn read<F, Fut, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.retry.run(op).await
    }

    /// Check that the database answers a trivial query.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let pool = &self.pool;
        self.read(move || async move {
            sqlx::query("SELECT 1").execute(pool).await?;
            Ok::<_, sqlx::Error>(())
        })
        .await
    }

    /// Close every pooled connection. Waits for checked-out connections
    /// (and therefore in-flight transactions) to be returned first.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Database(sqlx::Error::Io(e))),
        _ => Ok(()),
    }
}
