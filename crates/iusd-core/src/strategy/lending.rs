//! Lending-protocol strategy adapter.
//!
//! Deposits flow into a lending pool that mints an interest-bearing
//! platform token 1:1 against the underlying; the strategy's balance in
//! an asset is simply its platform-token balance converted back. The
//! pool carries a test hook that accrues interest by minting extra
//! platform tokens against fresh underlying.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, ProtocolResult};
use crate::strategy::Strategy;
use crate::token::TokenBank;
use crate::types::Address;

/// Mock lending pool holding the deposited underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingPool {
    address: Address,
}

impl LendingPool {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn deposit(
        &self,
        bank: &mut TokenBank,
        from: Address,
        asset: &Address,
        platform_token: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        bank.transfer(asset, &from, self.address, amount)?;
        bank.mint(platform_token, from, amount)
    }

    fn withdraw(
        &self,
        bank: &mut TokenBank,
        holder: &Address,
        recipient: Address,
        asset: &Address,
        platform_token: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        bank.burn(platform_token, holder, amount)?;
        bank.transfer(asset, &self.address, recipient, amount)
    }

    /// Test hook: accrue interest to `holder` by minting platform
    /// tokens against fresh underlying held by the pool.
    pub fn accrue_interest(
        &self,
        bank: &mut TokenBank,
        holder: Address,
        asset: &Address,
        platform_token: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        bank.mint(platform_token, holder, amount)?;
        bank.mint(asset, self.address, amount)
    }
}

/// Strategy wrapping a lending pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingStrategy {
    address: Address,
    pool: LendingPool,
    /// Assets in configuration order; removal is by index.
    assets_mapped: Vec<Address>,
    platform_tokens: BTreeMap<Address, Address>,
    reward_token: Option<Address>,
    staking_contract: Option<Address>,
    /// Pair hint handed to the swap router during reward liquidation.
    lp_pair: Option<(Address, Address)>,
}

impl LendingStrategy {
    pub fn new(address: Address, pool: LendingPool) -> Self {
        Self {
            address,
            pool,
            assets_mapped: Vec::new(),
            platform_tokens: BTreeMap::new(),
            reward_token: None,
            staking_contract: None,
            lp_pair: None,
        }
    }

    pub fn pool(&self) -> &LendingPool {
        &self.pool
    }

    pub fn assets_mapped(&self) -> &[Address] {
        &self.assets_mapped
    }

    pub fn platform_token(&self, asset: &Address) -> Option<Address> {
        self.platform_tokens.get(asset).copied()
    }

    pub fn set_platform_token(&mut self, asset: Address, platform_token: Address) {
        if !self.platform_tokens.contains_key(&asset) {
            self.assets_mapped.push(asset);
        }
        self.platform_tokens.insert(asset, platform_token);
    }

    pub fn remove_platform_token(&mut self, index: usize) -> ProtocolResult<Address> {
        if index >= self.assets_mapped.len() {
            return Err(ProtocolError::InvalidIndex);
        }
        let asset = self.assets_mapped.remove(index);
        self.platform_tokens.remove(&asset);
        Ok(asset)
    }

    pub fn set_reward_token(&mut self, token: Option<Address>) {
        self.reward_token = token;
    }

    pub fn staking_contract(&self) -> Option<Address> {
        self.staking_contract
    }

    pub fn set_staking_contract(&mut self, contract: Option<Address>) {
        self.staking_contract = contract;
    }

    pub fn lp_pair(&self) -> Option<(Address, Address)> {
        self.lp_pair
    }

    pub fn set_lp_pair(&mut self, pair: Option<(Address, Address)>) {
        self.lp_pair = pair;
    }

    fn platform_token_for(&self, asset: &Address) -> ProtocolResult<Address> {
        self.platform_tokens
            .get(asset)
            .copied()
            .ok_or(ProtocolError::PlatformTokenMissing)
    }
}

impl Strategy for LendingStrategy {
    fn address(&self) -> Address {
        self.address
    }

    fn supports_asset(&self, asset: &Address) -> bool {
        self.platform_tokens.contains_key(asset)
    }

    fn deposit(
        &mut self,
        bank: &mut TokenBank,
        asset: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        let platform_token = self.platform_token_for(asset)?;
        self.pool
            .deposit(bank, self.address, asset, &platform_token, amount)
    }

    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
        asset: &Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        let platform_token = self.platform_token_for(asset)?;
        self.pool
            .withdraw(bank, &self.address, recipient, asset, &platform_token, amount)
    }

    fn withdraw_all(&mut self, bank: &mut TokenBank, recipient: Address) -> ProtocolResult<()> {
        for asset in self.assets_mapped.clone() {
            let balance = self.check_balance(bank, &asset)?;
            if balance > 0 {
                self.withdraw(bank, recipient, &asset, balance)?;
            }
        }
        Ok(())
    }

    fn check_balance(&self, bank: &TokenBank, asset: &Address) -> ProtocolResult<u128> {
        let platform_token = self.platform_token_for(asset)?;
        bank.balance_of(&platform_token, &self.address)
    }

    fn collect_reward_token(
        &mut self,
        bank: &mut TokenBank,
        recipient: Address,
    ) -> ProtocolResult<u128> {
        let Some(reward_token) = self.reward_token else {
            return Ok(0);
        };
        let amount = bank.balance_of(&reward_token, &self.address)?;
        if amount > 0 {
            bank.transfer(&reward_token, &self.address, recipient, amount)?;
        }
        Ok(amount)
    }

    fn reward_token(&self) -> Option<Address> {
        self.reward_token
    }
}
