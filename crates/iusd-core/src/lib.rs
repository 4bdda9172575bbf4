//! # iUSD Core - Protocol Accounting Engine
//!
//! This crate contains the accounting model of the iUSD protocol as an
//! off-chain ledger/allocator engine. It provides:
//!
//! - A rebasing balance ledger with credits-based supply scaling
//! - A multi-asset vault with buffer-aware strategy allocation
//! - Yield strategy adapters behind a common trait
//! - A price oracle router with production and dev variants
//! - A timelocked governance queue over the full admin surface
//!
//! Every operation either applies fully or leaves the protocol unchanged,
//! mirroring the all-or-nothing transaction semantics of the original
//! deployment.

// Re-export all modules
pub mod constants;
pub mod errors;
pub mod governance;
pub mod ledger;
pub mod math;
pub mod oracle;
pub mod protocol;
pub mod strategy;
pub mod swap;
pub mod token;
pub mod types;
pub mod vault;

// Re-export commonly used items
pub use constants::*;
pub use errors::{ProtocolError, ProtocolResult};
pub use governance::{Action, Governor, Proposal, ProposalState};
pub use ledger::Ledger;
pub use oracle::OracleRouter;
pub use protocol::{GenesisConfig, Protocol, Snapshot};
pub use strategy::{LendingPool, LendingStrategy, Strategy, StrategyKind};
pub use swap::SwapRouter;
pub use token::{TokenBank, TransferBehavior};
pub use types::{Address, Event};
pub use vault::Vault;
