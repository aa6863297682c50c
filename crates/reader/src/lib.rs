//! Card reader daemon for the locker bank.
//!
//! [`ReaderLoop`] polls the card reader, fulfils pending associations and
//! turns every other accepted scan into a loan or a return. The physical
//! side is reached through the [`Actuator`](lockbank_core::hardware::Actuator)
//! and [`CardReader`](lockbank_core::hardware::CardReader) traits; adapters
//! for real devices live in [`adapters`].

pub mod adapters;
pub mod config;
pub mod error;
pub mod reader_loop;

pub use config::ReaderConfig;
pub use error::ReaderError;
pub use reader_loop::{ReaderLoop, ScanOutcome};
