//! Components over the shared [`Store`](crate::Store).
//!
//! Each component exposes its operations as methods that run in their own
//! critical section. The `*_in` functions are the same statements against
//! a caller-supplied connection, so [`LoanDesk`] and [`AssociationBroker`]
//! can compose them inside one transaction.

pub mod association_broker;
pub mod identity_directory;
pub mod loan_desk;
pub mod loan_ledger;
pub mod locker_registry;

pub use association_broker::{AssociationBroker, FulfillOutcome};
pub use identity_directory::IdentityDirectory;
pub use loan_desk::{BorrowOutcome, LoanDesk, ReturnOutcome};
pub use loan_ledger::LoanLedger;
pub use locker_registry::LockerRegistry;
