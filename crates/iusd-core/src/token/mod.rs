//! Backing-asset token ledgers.

pub mod bank;

pub use bank::{TokenBank, TransferBehavior};
