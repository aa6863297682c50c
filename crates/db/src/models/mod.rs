pub mod association;
pub mod identity;
pub mod loan;
pub mod locker;
