//! The vault: multi-asset backing store for the iUSD ledger.
//!
//! Storage lives here; capital-movement operations (mint, redeem,
//! rebase, allocate, harvest) are in `core`, the governance-gated
//! configuration surface in `admin`. The split mirrors the deployed
//! VaultCore/VaultAdmin pair sharing one storage layout.

pub mod admin;
pub mod core;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AUTO_ALLOCATE_THRESHOLD, DEFAULT_REBASE_THRESHOLD};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::ledger::Ledger;
use crate::oracle::OracleRouter;
use crate::strategy::StrategyRegistration;
use crate::swap::SwapRouter;
use crate::token::TokenBank;
use crate::types::{Address, Event};

/// Mutable view over the components a vault operation touches. The
/// protocol facade assembles one per call.
pub struct VaultEnv<'a> {
    pub ledger: &'a mut Ledger,
    pub bank: &'a mut TokenBank,
    pub oracle: &'a OracleRouter,
    pub swap_router: Option<&'a SwapRouter>,
    pub events: &'a mut Vec<Event>,
}

/// Vault storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    governor: Address,
    strategist: Address,
    price_provider: Address,
    uniswap_addr: Option<Address>,
    trustee_address: Option<Address>,
    trustee_fee_bps: u64,
    redeem_fee_bps: u64,
    /// Fraction of total value kept liquid in the vault, wad-scaled.
    vault_buffer: u128,
    auto_allocate_threshold: u128,
    rebase_threshold: u128,
    capital_paused: bool,
    rebase_paused: bool,
    all_assets: Vec<Address>,
    strategies: BTreeMap<Address, StrategyRegistration>,
    all_strategies: Vec<Address>,
    asset_default_strategies: BTreeMap<Address, Address>,
}

impl Vault {
    /// Genesis state as deployed: capital paused until governance
    /// unpauses, rebasing live, zero fees and buffer.
    pub fn new(
        address: Address,
        governor: Address,
        strategist: Address,
        price_provider: Address,
    ) -> Self {
        Self {
            address,
            governor,
            strategist,
            price_provider,
            uniswap_addr: None,
            trustee_address: None,
            trustee_fee_bps: 0,
            redeem_fee_bps: 0,
            vault_buffer: 0,
            auto_allocate_threshold: DEFAULT_AUTO_ALLOCATE_THRESHOLD,
            rebase_threshold: DEFAULT_REBASE_THRESHOLD,
            capital_paused: true,
            rebase_paused: false,
            all_assets: Vec::new(),
            strategies: BTreeMap::new(),
            all_strategies: Vec::new(),
            asset_default_strategies: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn governor(&self) -> Address {
        self.governor
    }

    pub fn strategist(&self) -> Address {
        self.strategist
    }

    pub fn price_provider(&self) -> Address {
        self.price_provider
    }

    pub fn uniswap_addr(&self) -> Option<Address> {
        self.uniswap_addr
    }

    pub fn trustee_address(&self) -> Option<Address> {
        self.trustee_address
    }

    pub fn trustee_fee_bps(&self) -> u64 {
        self.trustee_fee_bps
    }

    pub fn redeem_fee_bps(&self) -> u64 {
        self.redeem_fee_bps
    }

    pub fn vault_buffer(&self) -> u128 {
        self.vault_buffer
    }

    pub fn auto_allocate_threshold(&self) -> u128 {
        self.auto_allocate_threshold
    }

    pub fn rebase_threshold(&self) -> u128 {
        self.rebase_threshold
    }

    pub fn capital_paused(&self) -> bool {
        self.capital_paused
    }

    pub fn rebase_paused(&self) -> bool {
        self.rebase_paused
    }

    pub fn is_supported_asset(&self, asset: &Address) -> bool {
        self.all_assets.contains(asset)
    }

    pub fn asset_count(&self) -> usize {
        self.all_assets.len()
    }

    pub fn all_assets(&self) -> &[Address] {
        &self.all_assets
    }

    /// Number of currently approved strategies.
    pub fn strategy_count(&self) -> usize {
        self.all_strategies.len()
    }

    pub fn all_strategies(&self) -> &[Address] {
        &self.all_strategies
    }

    pub fn is_approved_strategy(&self, strategy: &Address) -> bool {
        self.strategies
            .get(strategy)
            .map(|r| r.is_supported)
            .unwrap_or(false)
    }

    pub fn strategy_registration(&self, strategy: &Address) -> Option<&StrategyRegistration> {
        self.strategies.get(strategy)
    }

    pub fn asset_default_strategy(&self, asset: &Address) -> Option<Address> {
        self.asset_default_strategies.get(asset).copied()
    }

    pub(crate) fn ensure_governor(&self, caller: Address) -> ProtocolResult<()> {
        if caller != self.governor {
            return Err(ProtocolError::CallerNotGovernor);
        }
        Ok(())
    }

    pub(crate) fn ensure_governor_or_strategist(&self, caller: Address) -> ProtocolResult<()> {
        if caller != self.governor && caller != self.strategist {
            return Err(ProtocolError::CallerNotStrategistOrGovernor);
        }
        Ok(())
    }
}
