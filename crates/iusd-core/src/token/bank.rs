//! Balance and allowance ledgers for the backing stable assets.
//!
//! The bank models the external token contracts the vault moves around:
//! stablecoins, platform tokens held against strategies, and reward
//! tokens. It also records which holders are contract-like, which the
//! rebasing ledger consults to auto-migrate contracts to non-rebasing
//! accounting on first touch.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, ProtocolResult};
use crate::math::safe_math::{safe_add_u128, safe_sub_u128};
use crate::types::Address;

/// How a token reports transfer failures.
///
/// `Standard` tokens fail with a descriptive balance error. The
/// `NoReturnValue` flavor models the legacy tokens that return nothing
/// from `transfer`, which the safe-wrapper surfaces uniformly as
/// "ERC20 operation did not succeed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferBehavior {
    Standard,
    NoReturnValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenState {
    behavior: TransferBehavior,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

/// Per-asset fungible ledgers keyed by token address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenBank {
    tokens: BTreeMap<Address, TokenState>,
    contract_accounts: BTreeSet<Address>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token ledger. Idempotent on repeat registration.
    pub fn register_token(&mut self, token: Address, behavior: TransferBehavior) {
        self.tokens.entry(token).or_insert(TokenState {
            behavior,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        });
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Mark an address as contract-like (vault, strategies, routers,
    /// mock contract holders).
    pub fn register_contract(&mut self, account: Address) {
        self.contract_accounts.insert(account);
    }

    pub fn is_contract(&self, account: &Address) -> bool {
        self.contract_accounts.contains(account)
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> ProtocolResult<u128> {
        let state = self.tokens.get(token).ok_or(ProtocolError::UnknownToken)?;
        Ok(state.balances.get(holder).copied().unwrap_or(0))
    }

    pub fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> ProtocolResult<u128> {
        let state = self.tokens.get(token).ok_or(ProtocolError::UnknownToken)?;
        Ok(state
            .allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0))
    }

    /// Create tokens out of thin air. Models faucet mints on the mock
    /// assets and interest accrual on platform tokens.
    pub fn mint(&mut self, token: &Address, to: Address, amount: u128) -> ProtocolResult<()> {
        let state = self.tokens.get_mut(token).ok_or(ProtocolError::UnknownToken)?;
        let balance = state.balances.entry(to).or_insert(0);
        *balance = safe_add_u128(*balance, amount)?;
        Ok(())
    }

    pub fn burn(&mut self, token: &Address, from: &Address, amount: u128) -> ProtocolResult<()> {
        let state = self.tokens.get_mut(token).ok_or(ProtocolError::UnknownToken)?;
        let balance = state.balances.entry(*from).or_insert(0);
        *balance = safe_sub_u128(*balance, amount)
            .map_err(|_| transfer_failure(state.behavior))?;
        Ok(())
    }

    /// Check a transfer would succeed without applying it. Operations
    /// that must be all-or-nothing validate with this before mutating.
    pub fn can_transfer(
        &self,
        token: &Address,
        from: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        let state = self.tokens.get(token).ok_or(ProtocolError::UnknownToken)?;
        if self.balance_of(token, from)? < amount {
            return Err(transfer_failure(state.behavior));
        }
        Ok(())
    }

    pub fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.can_transfer(token, from, amount)?;
        let state = self.tokens.get_mut(token).ok_or(ProtocolError::UnknownToken)?;
        let from_balance = state.balances.entry(*from).or_insert(0);
        *from_balance -= amount;
        let to_balance = state.balances.entry(to).or_insert(0);
        *to_balance = safe_add_u128(*to_balance, amount)?;
        Ok(())
    }

    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        let state = self.tokens.get_mut(token).ok_or(ProtocolError::UnknownToken)?;
        state
            .allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
        Ok(())
    }

    /// Check a transfer_from would succeed: both the holder balance and
    /// the spender allowance must cover the amount.
    pub fn can_transfer_from(
        &self,
        token: &Address,
        spender: &Address,
        from: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.can_transfer(token, from, amount)?;
        if self.allowance(token, from, spender)? < amount {
            return Err(ProtocolError::AllowanceExceeded);
        }
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.can_transfer_from(token, spender, from, amount)?;
        self.transfer(token, from, to, amount)?;
        let state = self.tokens.get_mut(token).ok_or(ProtocolError::UnknownToken)?;
        let allowance = state
            .allowances
            .entry(*from)
            .or_default()
            .entry(*spender)
            .or_insert(0);
        *allowance -= amount;
        Ok(())
    }
}

fn transfer_failure(behavior: TransferBehavior) -> ProtocolError {
    match behavior {
        TransferBehavior::Standard => ProtocolError::TransferExceedsBalance,
        TransferBehavior::NoReturnValue => ProtocolError::TokenOperationFailed,
    }
}
