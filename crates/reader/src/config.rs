use std::path::PathBuf;
use std::time::Duration;

use lockbank_core::cooldown::DEFAULT_CARD_COOLDOWN;
use lockbank_core::hardware::MAX_RELAY_CHANNEL;
use lockbank_core::types::LockerId;

/// Number of lockers on the standard relay board.
pub const DEFAULT_LOCKER_COUNT: LockerId = MAX_RELAY_CHANNEL as LockerId + 1;

/// Default delay between two iterations of the reader loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reader daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Lockers `1..=locker_count` are provisioned at start-up.
    pub locker_count: LockerId,
    /// Minimum interval between two accepted reads of one card.
    pub card_cooldown: Duration,
    /// Delay between two loop iterations.
    pub poll_interval: Duration,
    /// Line-oriented card reader device. `None` reads from stdin.
    pub card_reader_path: Option<PathBuf>,
    /// Relay board device. `None` runs with the dry-run actuator.
    pub relay_device: Option<PathBuf>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            locker_count: DEFAULT_LOCKER_COUNT,
            card_cooldown: DEFAULT_CARD_COOLDOWN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            card_reader_path: None,
            relay_device: None,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default  |
    /// |--------------------|----------|
    /// | `LOCKER_COUNT`     | `15`     |
    /// | `CARD_COOLDOWN_MS` | `3000`   |
    /// | `POLL_INTERVAL_MS` | `100`    |
    /// | `CARD_READER_PATH` | stdin    |
    /// | `RELAY_DEVICE`     | dry run  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let locker_count: LockerId = std::env::var("LOCKER_COUNT")
            .unwrap_or_else(|_| defaults.locker_count.to_string())
            .parse()
            .expect("LOCKER_COUNT must be a valid integer");
        assert!(
            (1..=DEFAULT_LOCKER_COUNT).contains(&locker_count),
            "LOCKER_COUNT must be between 1 and {DEFAULT_LOCKER_COUNT}"
        );

        let cooldown_ms: u64 = std::env::var("CARD_COOLDOWN_MS")
            .unwrap_or_else(|_| defaults.card_cooldown.as_millis().to_string())
            .parse()
            .expect("CARD_COOLDOWN_MS must be a valid u64");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| defaults.poll_interval.as_millis().to_string())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        Self {
            locker_count,
            card_cooldown: Duration::from_millis(cooldown_ms),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            card_reader_path: non_empty_path("CARD_READER_PATH"),
            relay_device: non_empty_path("RELAY_DEVICE"),
        }
    }
}

fn non_empty_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
