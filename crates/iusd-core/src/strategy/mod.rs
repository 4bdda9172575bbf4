//! Yield strategy adapters.
//!
//! Strategies are polymorphic over a small capability set: deposit,
//! withdraw, balance check and reward collection per supported asset.
//! The vault holds them in a registry keyed by address; a removed
//! strategy's registration persists with `is_supported` cleared so the
//! same strategy can be re-approved later.

pub mod lending;

use serde::{Deserialize, Serialize};

pub use lending::{LendingPool, LendingStrategy};

use crate::errors::ProtocolResult;
use crate::token::TokenBank;
use crate::types::Address;

/// Capability surface every strategy variant provides.
pub trait Strategy {
    fn address(&self) -> Address;

    fn supports_asset(&self, asset: &Address) -> bool;

    /// Deposit `amount` of `asset` already sitting at the strategy's
    /// address into the underlying platform.
    fn deposit(&mut self, bank: &mut TokenBank, asset: &Address, amount: u128)
        -> ProtocolResult<()>;

    /// Withdraw from the platform directly to `recipient`.
    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
        asset: &Address,
        amount: u128,
    ) -> ProtocolResult<()>;

    /// Withdraw every supported asset to `recipient`.
    fn withdraw_all(&mut self, bank: &mut TokenBank, recipient: Address) -> ProtocolResult<()>;

    /// Value of `asset` held by the strategy, in asset units.
    fn check_balance(&self, bank: &TokenBank, asset: &Address) -> ProtocolResult<u128>;

    /// Move accrued reward tokens to `recipient`, returning the amount
    /// collected.
    fn collect_reward_token(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
    ) -> ProtocolResult<u128>;

    fn reward_token(&self) -> Option<Address>;
}

/// Concrete strategy variants. An enum rather than a trait object so
/// registrations clone and serialize with the rest of the protocol
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StrategyKind {
    Lending(LendingStrategy),
}

impl Strategy for StrategyKind {
    fn address(&self) -> Address {
        match self {
            StrategyKind::Lending(s) => s.address(),
        }
    }

    fn supports_asset(&self, asset: &Address) -> bool {
        match self {
            StrategyKind::Lending(s) => s.supports_asset(asset),
        }
    }

    fn deposit(
        &mut self,
        bank: &mut TokenBank,
        asset: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        match self {
            StrategyKind::Lending(s) => s.deposit(bank, asset, amount),
        }
    }

    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
        asset: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        match self {
            StrategyKind::Lending(s) => s.withdraw(bank, recipient, asset, amount),
        }
    }

    fn withdraw_all(&mut self, bank: &mut TokenBank, recipient: Address) -> ProtocolResult<()> {
        match self {
            StrategyKind::Lending(s) => s.withdraw_all(bank, recipient),
        }
    }

    fn check_balance(&self, bank: &TokenBank, asset: &Address) -> ProtocolResult<u128> {
        match self {
            StrategyKind::Lending(s) => s.check_balance(bank, asset),
        }
    }

    fn collect_reward_token(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
    ) -> ProtocolResult<u128> {
        match self {
            StrategyKind::Lending(s) => s.collect_reward_token(bank, recipient),
        }
    }

    fn reward_token(&self) -> Option<Address> {
        match self {
            StrategyKind::Lending(s) => s.reward_token(),
        }
    }
}

/// Registry entry. Survives removal so a re-approval finds the same
/// struct with `is_supported` reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRegistration {
    pub is_supported: bool,
    pub strategy: StrategyKind,
}
