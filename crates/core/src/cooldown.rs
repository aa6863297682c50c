//! Per-card debounce for the reader loop.
//!
//! A card held against the reader is reported on every poll. Once a read has
//! been accepted, further reads of the same card are ignored until the
//! cooldown elapses. Uses the monotonic clock so wall-clock adjustments never
//! shorten or extend the window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::CardId;

/// Default minimum interval between two accepted reads of the same card.
pub const DEFAULT_CARD_COOLDOWN: Duration = Duration::from_secs(3);

/// Tracks when each card was last accepted.
#[derive(Debug)]
pub struct CardCooldown {
    window: Duration,
    last_accepted: HashMap<CardId, Instant>,
}

impl Default for CardCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_CARD_COOLDOWN)
    }
}

impl CardCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether `card` was accepted less than one window before `now`.
    pub fn is_cooling(&self, card: &CardId, now: Instant) -> bool {
        self.last_accepted
            .get(card)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
    }

    /// Record `card` as accepted at `now`.
    ///
    /// Entries older than the window are dropped at the same time so the map
    /// stays bounded by the number of cards seen in one window.
    pub fn record(&mut self, card: CardId, now: Instant) {
        let window = self.window;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < window);
        self.last_accepted.insert(card, now);
    }

    /// Check-and-record in one call. Returns `true` if the read is accepted.
    pub fn try_accept(&mut self, card: &CardId, now: Instant) -> bool {
        if self.is_cooling(card, now) {
            return false;
        }
        self.record(card.clone(), now);
        true
    }

    pub fn tracked(&self) -> usize {
        self.last_accepted.len()
    }
}
