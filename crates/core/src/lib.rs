//! Domain building blocks for the locker bank.
//!
//! This crate has no storage or I/O dependencies so it can be shared by the
//! card reader daemon, the registration web server and the reminder service.
//!
//! - [`types`]: identifiers, occupancy / loan / association enums.
//! - [`error`]: domain error type shared by every layer.
//! - [`email`]: institutional email policy.
//! - [`association`]: association window timing.
//! - [`cooldown`]: per-card debounce tracker.
//! - [`hardware`]: actuator and card reader contracts.

pub mod association;
pub mod cooldown;
pub mod email;
pub mod error;
pub mod hardware;
pub mod types;
