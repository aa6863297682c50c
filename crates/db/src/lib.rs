//! Persistent records of the locker bank.
//!
//! Every process (card reader, registration web server, reminder service)
//! opens the same SQLite file through a [`Store`]. The store is the only
//! piece of shared state; each component below is a thin handle over it.
//!
//! - [`IdentityDirectory`]: card to email registrations.
//! - [`LockerRegistry`]: locker occupancy.
//! - [`LoanLedger`]: loan history, at most one open loan per email.
//! - [`AssociationBroker`]: hand-off between a web request and the next scan.
//! - [`LoanDesk`]: ledger + registry mutations committed together.

pub mod error;
pub mod models;
pub mod repositories;
pub mod retry;
pub mod store;

pub use error::{AssociationError, LedgerError, LockerError, RegisterError, StoreError};
pub use repositories::{
    AssociationBroker, BorrowOutcome, FulfillOutcome, IdentityDirectory, LoanDesk, LoanLedger,
    LockerRegistry, ReturnOutcome,
};
pub use retry::RetryPolicy;
pub use store::{Store, StoreConfig};
