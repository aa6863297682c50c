//! Fake devices and a throwaway store for driving the reader loop.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use lockbank_core::association::AssociationPolicy;
use lockbank_core::hardware::{Actuator, CardReader, HardwareError};
use lockbank_core::types::{CardId, LockerId, Timestamp};
use lockbank_db::{Store, StoreConfig};
use lockbank_reader::{ReaderConfig, ReaderLoop};
use tempfile::TempDir;

/// Card reader fed by the test. Can be told to fail before reading.
#[derive(Clone, Default)]
pub struct ScriptedReader {
    queue: Arc<Mutex<VecDeque<CardId>>>,
    failures_left: Arc<Mutex<usize>>,
}

impl ScriptedReader {
    pub fn present(&self, card: &str) {
        self.queue.lock().unwrap().push_back(CardId::new(card).unwrap());
    }

    pub fn fail_next(&self, times: usize) {
        *self.failures_left.lock().unwrap() = times;
    }

    pub fn failures_left(&self) -> usize {
        *self.failures_left.lock().unwrap()
    }
}

#[async_trait]
impl CardReader for ScriptedReader {
    async fn read_card(&mut self) -> Result<Option<CardId>, HardwareError> {
        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(HardwareError::Unavailable("reader unplugged".to_string()));
            }
        }
        Ok(self.queue.lock().unwrap().pop_front())
    }
}

/// Actuator that records every call and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    calls: Arc<Mutex<Vec<LockerId>>>,
    failures_left: Arc<Mutex<usize>>,
}

impl RecordingActuator {
    pub fn fail_next(&self, times: usize) {
        *self.failures_left.lock().unwrap() = times;
    }

    pub fn calls(&self) -> Vec<LockerId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn unlock(&self, locker_id: LockerId) -> Result<(), HardwareError> {
        self.calls.lock().unwrap().push(locker_id);
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(HardwareError::Unavailable("relay board unplugged".to_string()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Store,
    pub reader: ScriptedReader,
    pub actuator: RecordingActuator,
    pub reader_loop: ReaderLoop,
    pub start: Instant,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&StoreConfig::new(dir.path().join("lockbank.db")))
            .await
            .expect("open store");

        let reader = ScriptedReader::default();
        let actuator = RecordingActuator::default();
        let config = ReaderConfig {
            card_cooldown: Duration::from_secs(3),
            ..ReaderConfig::default()
        };
        let reader_loop = ReaderLoop::new(
            store.clone(),
            AssociationPolicy::default(),
            &config,
            Box::new(reader.clone()),
            Arc::new(actuator.clone()),
        );

        Self {
            dir,
            store,
            reader,
            actuator,
            reader_loop,
            start: Instant::now(),
        }
    }

    /// A second loop on the same fake devices, ticking every `poll_interval`.
    pub fn polling_loop(&self, poll_interval: Duration) -> ReaderLoop {
        let config = ReaderConfig {
            card_cooldown: Duration::from_secs(3),
            poll_interval,
            ..ReaderConfig::default()
        };
        ReaderLoop::new(
            self.store.clone(),
            AssociationPolicy::default(),
            &config,
            Box::new(self.reader.clone()),
            Arc::new(self.actuator.clone()),
        )
    }

    /// Another handle on the same database, standing in for the web process.
    pub async fn other_process(&self) -> Store {
        Store::open(&StoreConfig::new(self.dir.path().join("lockbank.db")))
            .await
            .expect("reopen store")
    }

    /// Wall clock and monotonic clock `secs` after the start of the test.
    pub fn clocks(&self, secs: u64) -> (Timestamp, Instant) {
        (at(secs as i64), self.start + Duration::from_secs(secs))
    }
}

/// `2025-03-10 09:00:00 UTC` plus `secs`.
pub fn at(secs: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}
