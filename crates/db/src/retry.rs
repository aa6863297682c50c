//! Bounded retry for SQLite lock contention.
//!
//! The reader, web and notifier processes share one database file. A writer
//! that finds the file locked waits at most `busy_timeout` inside SQLite and
//! then gets `SQLITE_BUSY`; this policy retries such failures a few times with
//! jittered exponential backoff so the reader loop is never stuck on a lock.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::StoreError;

/// Primary result codes SQLite uses for lock contention.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        let clamped_base = base_delay_ms.max(1);
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: clamped_base,
            max_delay_ms: max_delay_ms.max(clamped_base),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let exp = 2_u64.saturating_pow(attempt as u32);
        let delay = self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms);
        let jittered = if self.jitter_pct > 0.0 {
            let spread = (delay as f64 * self.jitter_pct) as i64;
            let delta = rand::rng().random_range(-spread..=spread);
            delay.saturating_add_signed(delta)
        } else {
            delay
        };
        Duration::from_millis(jittered)
    }

    /// Run `op`, retrying while it fails with a lock-contention error.
    ///
    /// Any other error is returned immediately. When the attempts are used up
    /// the last contention error is reported as [`StoreError::Busy`].
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_contention(&err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        tracing::warn!(attempts = attempt, error = %err, "Giving up on locked database");
                        return Err(StoreError::Busy {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let delay = self.next_delay(attempt - 1);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Database locked, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(StoreError::Database(err)),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 20, 500, 0.2)
    }
}

/// Whether `err` is transient lock contention worth retrying.
///
/// Covers `SQLITE_BUSY` and `SQLITE_LOCKED` with any extended code (e.g.
/// `SQLITE_BUSY_SNAPSHOT` when a read snapshot went stale before the write),
/// plus a pool that had no connection free in time.
pub fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}
