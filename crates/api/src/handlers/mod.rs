pub mod associations;
pub mod loans;
pub mod lockers;
