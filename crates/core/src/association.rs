//! Timing rules for the card association window.
//!
//! Pure logic. The broker in the `db` crate decides what to persist; this
//! module only answers "is the request issued at `t` still live at `now`".

use std::time::Duration;

use crate::types::Timestamp;

/// How long a web association request waits for a card scan.
pub const DEFAULT_ASSOCIATION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationPolicy {
    pub timeout: Duration,
}

impl Default for AssociationPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ASSOCIATION_TIMEOUT,
        }
    }
}

impl AssociationPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Read `ASSOCIATION_TIMEOUT_SECS`, falling back to 20 seconds.
    pub fn from_env() -> Self {
        let timeout = std::env::var("ASSOCIATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ASSOCIATION_TIMEOUT);
        Self { timeout }
    }

    pub fn expires_at(&self, issued_at: Timestamp) -> Timestamp {
        issued_at + self.timeout_chrono()
    }

    /// A request is expired once its age reaches the timeout.
    ///
    /// A request stamped in the future (clock skew between processes) is
    /// treated as live rather than expired.
    pub fn is_expired(&self, issued_at: Timestamp, now: Timestamp) -> bool {
        now.signed_duration_since(issued_at) >= self.timeout_chrono()
    }

    fn timeout_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX)
    }
}
