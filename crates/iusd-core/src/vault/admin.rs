//! Governance-gated configuration surface.
//!
//! Role model as deployed: most setters are governor-only; the
//! strategist shares pause, buffer, reallocation and withdrawal
//! duties. Unpausing rebase is governor-only even though pausing is
//! shared.

use crate::constants::{MAX_REDEEM_FEE_BPS, MAX_TRUSTEE_FEE_BPS, WAD};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::strategy::{Strategy, StrategyKind, StrategyRegistration};
use crate::types::{Address, Event};
use crate::vault::{Vault, VaultEnv};

impl Vault {
    /// Make a deployed strategy known to the vault, un-approved. The
    /// governance approval step activates it.
    pub fn register_strategy(&mut self, strategy: StrategyKind) -> ProtocolResult<()> {
        let addr = strategy.address();
        if let Some(reg) = self.strategies.get(&addr) {
            if reg.is_supported {
                return Err(ProtocolError::StrategyAlreadyApproved);
            }
        }
        self.strategies.insert(
            addr,
            StrategyRegistration {
                is_supported: false,
                strategy,
            },
        );
        Ok(())
    }

    /// Add an asset to the supported set. Requires a working price
    /// feed and a registered token ledger.
    pub fn support_asset(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        asset: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if self.is_supported_asset(&asset) {
            return Err(ProtocolError::AssetAlreadySupported);
        }
        if !env.bank.is_registered(&asset) {
            return Err(ProtocolError::UnknownToken);
        }
        env.oracle.price(&asset)?;
        self.all_assets.push(asset);
        env.events.push(Event::AssetSupported { asset });
        Ok(())
    }

    /// Approve a registered strategy. A previously removed strategy's
    /// registration persists, so re-approval finds the same struct.
    pub fn approve_strategy(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        let reg = self
            .strategies
            .get_mut(&strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?;
        if reg.is_supported {
            return Err(ProtocolError::StrategyAlreadyApproved);
        }
        reg.is_supported = true;
        self.all_strategies.push(strategy);
        events.push(Event::StrategyApproved { strategy });
        Ok(())
    }

    /// Remove an approved strategy, first withdrawing everything it
    /// holds back to the vault.
    pub fn remove_strategy(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if !self.is_approved_strategy(&strategy) {
            return Err(ProtocolError::StrategyNotApproved);
        }

        self.asset_default_strategies
            .retain(|_, default| *default != strategy);

        let vault_addr = self.address();
        let reg = self
            .strategies
            .get_mut(&strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?;
        reg.strategy.withdraw_all(env.bank, vault_addr)?;
        reg.is_supported = false;
        self.all_strategies.retain(|s| *s != strategy);
        env.events.push(Event::StrategyRemoved { strategy });
        Ok(())
    }

    pub fn set_asset_default_strategy(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        asset: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if !self.is_supported_asset(&asset) {
            return Err(ProtocolError::AssetNotSupported);
        }
        let reg = self
            .strategies
            .get(&strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?;
        if !reg.is_supported {
            return Err(ProtocolError::StrategyNotApproved);
        }
        if !reg.strategy.supports_asset(&asset) {
            return Err(ProtocolError::StrategyAssetUnsupported);
        }
        self.asset_default_strategies.insert(asset, strategy);
        events.push(Event::AssetDefaultStrategyUpdated { asset, strategy });
        Ok(())
    }

    pub fn set_vault_buffer(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        buffer: u128,
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        if buffer > WAD {
            return Err(ProtocolError::InvalidValue);
        }
        self.vault_buffer = buffer;
        events.push(Event::VaultBufferUpdated { buffer });
        Ok(())
    }

    pub fn set_redeem_fee_bps(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        bps: u64,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if bps > MAX_REDEEM_FEE_BPS {
            return Err(ProtocolError::InvalidValue);
        }
        self.redeem_fee_bps = bps;
        events.push(Event::RedeemFeeUpdated { bps });
        Ok(())
    }

    pub fn set_trustee_fee_bps(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        bps: u64,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if bps > MAX_TRUSTEE_FEE_BPS {
            return Err(ProtocolError::InvalidValue);
        }
        self.trustee_fee_bps = bps;
        events.push(Event::TrusteeFeeBpsChanged { bps });
        Ok(())
    }

    pub fn set_trustee_address(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        trustee: Option<Address>,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.trustee_address = trustee;
        events.push(Event::TrusteeAddressChanged { trustee });
        Ok(())
    }

    pub fn set_auto_allocate_threshold(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        threshold: u128,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.auto_allocate_threshold = threshold;
        events.push(Event::AutoAllocateThresholdUpdated { threshold });
        Ok(())
    }

    pub fn set_rebase_threshold(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        threshold: u128,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.rebase_threshold = threshold;
        events.push(Event::RebaseThresholdUpdated { threshold });
        Ok(())
    }

    pub fn set_strategist_addr(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        strategist: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.strategist = strategist;
        events.push(Event::StrategistUpdated { strategist });
        Ok(())
    }

    pub fn set_price_provider(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        provider: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.price_provider = provider;
        events.push(Event::PriceProviderUpdated { provider });
        Ok(())
    }

    pub fn set_uniswap_addr(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
        router: Option<Address>,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.uniswap_addr = router;
        events.push(Event::UniswapUpdated { router });
        Ok(())
    }

    pub fn pause_capital(&mut self, events: &mut Vec<Event>, caller: Address) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        self.capital_paused = true;
        events.push(Event::CapitalPaused);
        Ok(())
    }

    pub fn unpause_capital(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        self.capital_paused = false;
        events.push(Event::CapitalUnpaused);
        Ok(())
    }

    pub fn pause_rebase(&mut self, events: &mut Vec<Event>, caller: Address) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        self.rebase_paused = true;
        events.push(Event::RebasePaused);
        Ok(())
    }

    pub fn unpause_rebase(
        &mut self,
        events: &mut Vec<Event>,
        caller: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        self.rebase_paused = false;
        events.push(Event::RebaseUnpaused);
        Ok(())
    }

    pub fn withdraw_all_from_strategy(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        if !self.is_approved_strategy(&strategy) {
            return Err(ProtocolError::StrategyNotApproved);
        }
        let vault_addr = self.address();
        let reg = self
            .strategies
            .get_mut(&strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?;
        reg.strategy.withdraw_all(env.bank, vault_addr)
    }

    pub fn withdraw_all_from_strategies(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        let vault_addr = self.address();
        for strategy in self.all_strategies.clone() {
            if let Some(reg) = self.strategies.get_mut(&strategy) {
                reg.strategy.withdraw_all(env.bank, vault_addr)?;
            }
        }
        Ok(())
    }

    /// Rescue tokens accidentally sent to the vault. Supported assets
    /// are user backing and cannot be moved this way.
    pub fn transfer_token(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        token: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        if self.is_supported_asset(&token) {
            return Err(ProtocolError::OnlyUnsupportedAssets);
        }
        env.bank
            .transfer(&token, &self.address(), self.governor(), amount)
    }

    // Strategy configuration, routed through the vault because the
    // registry owns the strategy structs.

    pub fn strategy_set_platform_token(
        &mut self,
        caller: Address,
        strategy: Address,
        asset: Address,
        platform_token: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        match self
            .strategies
            .get_mut(&strategy)
            .map(|r| &mut r.strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?
        {
            StrategyKind::Lending(s) => {
                s.set_platform_token(asset, platform_token);
                Ok(())
            }
        }
    }

    pub fn strategy_remove_platform_token(
        &mut self,
        caller: Address,
        strategy: Address,
        index: usize,
    ) -> ProtocolResult<Address> {
        self.ensure_governor(caller)?;
        match self
            .strategies
            .get_mut(&strategy)
            .map(|r| &mut r.strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?
        {
            StrategyKind::Lending(s) => s.remove_platform_token(index),
        }
    }

    pub fn strategy_set_reward_token(
        &mut self,
        caller: Address,
        strategy: Address,
        token: Option<Address>,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        match self
            .strategies
            .get_mut(&strategy)
            .map(|r| &mut r.strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?
        {
            StrategyKind::Lending(s) => {
                s.set_reward_token(token);
                Ok(())
            }
        }
    }

    pub fn strategy_set_staking_contract(
        &mut self,
        caller: Address,
        strategy: Address,
        contract: Option<Address>,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        match self
            .strategies
            .get_mut(&strategy)
            .map(|r| &mut r.strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?
        {
            StrategyKind::Lending(s) => {
                s.set_staking_contract(contract);
                Ok(())
            }
        }
    }

    pub fn strategy_set_lp_pair(
        &mut self,
        caller: Address,
        strategy: Address,
        pair: Option<(Address, Address)>,
    ) -> ProtocolResult<()> {
        self.ensure_governor(caller)?;
        match self
            .strategies
            .get_mut(&strategy)
            .map(|r| &mut r.strategy)
            .ok_or(ProtocolError::StrategyNotApproved)?
        {
            StrategyKind::Lending(s) => {
                s.set_lp_pair(pair);
                Ok(())
            }
        }
    }
}
