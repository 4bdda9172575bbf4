//! Capital movement: mint, redeem, rebase, allocate, reallocate,
//! harvest.
//!
//! Every operation validates fully before mutating, so an error leaves
//! the ledger, bank and strategies exactly as they were.

use crate::constants::WAD;
use crate::errors::{ProtocolError, ProtocolResult};
use crate::math::safe_math::{safe_calculate_bps, safe_mul_div_u128};
use crate::math::wad::mul_truncate;
use crate::oracle::OracleRouter;
use crate::strategy::Strategy;
use crate::token::TokenBank;
use crate::types::{Address, Event};
use crate::vault::{Vault, VaultEnv};

impl Vault {
    /// Mint price: the raw oracle price.
    pub fn price_usd_mint(&self, oracle: &OracleRouter, asset: &Address) -> ProtocolResult<u128> {
        oracle.price(asset)
    }

    /// Redeem price: floored at 1.0 so redemptions never pay out more
    /// than a dollar's worth of a discounted asset.
    pub fn price_usd_redeem(&self, oracle: &OracleRouter, asset: &Address) -> ProtocolResult<u128> {
        Ok(oracle.price(asset)?.max(WAD))
    }

    /// Units of `asset` held by the vault plus all approved strategies.
    pub fn check_balance(&self, bank: &TokenBank, asset: &Address) -> ProtocolResult<u128> {
        let mut balance = bank.balance_of(asset, &self.address())?;
        for strategy_addr in self.all_strategies() {
            let reg = &self.strategies[strategy_addr];
            if reg.strategy.supports_asset(asset) {
                balance += reg.strategy.check_balance(bank, asset)?;
            }
        }
        Ok(balance)
    }

    /// Value (redeem-priced) of assets held directly by the vault.
    pub fn total_value_in_vault(
        &self,
        bank: &TokenBank,
        oracle: &OracleRouter,
    ) -> ProtocolResult<u128> {
        let mut value = 0u128;
        for asset in self.all_assets() {
            let balance = bank.balance_of(asset, &self.address())?;
            value += mul_truncate(balance, self.price_usd_redeem(oracle, asset)?)?;
        }
        Ok(value)
    }

    /// Value (redeem-priced) of assets deployed to approved strategies.
    pub fn total_value_in_strategies(
        &self,
        bank: &TokenBank,
        oracle: &OracleRouter,
    ) -> ProtocolResult<u128> {
        let mut value = 0u128;
        for strategy_addr in self.all_strategies() {
            let reg = &self.strategies[strategy_addr];
            for asset in self.all_assets() {
                if reg.strategy.supports_asset(asset) {
                    let balance = reg.strategy.check_balance(bank, asset)?;
                    value += mul_truncate(balance, self.price_usd_redeem(oracle, asset)?)?;
                }
            }
        }
        Ok(value)
    }

    /// Total backing value across vault and strategies.
    pub fn total_value(&self, bank: &TokenBank, oracle: &OracleRouter) -> ProtocolResult<u128> {
        Ok(self.total_value_in_vault(bank, oracle)? + self.total_value_in_strategies(bank, oracle)?)
    }

    /// Mint ledger units against a deposit of a supported asset.
    pub fn mint(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        asset: Address,
        amount: u128,
        min_units: u128,
    ) -> ProtocolResult<u128> {
        if self.capital_paused() {
            return Err(ProtocolError::CapitalPaused);
        }
        if !self.is_supported_asset(&asset) {
            return Err(ProtocolError::AssetNotSupported);
        }
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        let units = mul_truncate(amount, self.price_usd_mint(env.oracle, &asset)?)?;
        if units < min_units {
            return Err(ProtocolError::MintAmountTooLow);
        }
        env.bank
            .can_transfer_from(&asset, &self.address(), &caller, amount)?;

        // Accrue pending yield to existing holders before the deposit
        // dilutes the backing ratio
        if units >= self.rebase_threshold() && !self.rebase_paused() {
            self.rebase_internal(env)?;
        }

        let vault_addr = self.address();
        env.bank
            .transfer_from(&asset, &vault_addr, &caller, vault_addr, amount)?;
        env.ledger.mint(vault_addr, env.bank, caller, units)?;
        env.events.push(Event::Minted {
            account: caller,
            units,
        });

        if units >= self.auto_allocate_threshold() && self.vault_buffer() < WAD {
            self.allocate_internal(env)?;
        }
        Ok(units)
    }

    /// Mint against several assets atomically. Duplicate assets are
    /// summed; any failure leaves no effect.
    pub fn mint_multiple(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        assets: &[Address],
        amounts: &[u128],
        min_units: u128,
    ) -> ProtocolResult<u128> {
        if self.capital_paused() {
            return Err(ProtocolError::CapitalPaused);
        }
        if assets.len() != amounts.len() {
            return Err(ProtocolError::ParameterLengthMismatch);
        }

        // Sum duplicates, preserving first-occurrence order
        let mut summed: Vec<(Address, u128)> = Vec::new();
        for (asset, amount) in assets.iter().zip(amounts) {
            if !self.is_supported_asset(asset) {
                return Err(ProtocolError::AssetNotSupported);
            }
            match summed.iter_mut().find(|(a, _)| a == asset) {
                Some((_, total)) => *total += amount,
                None => summed.push((*asset, *amount)),
            }
        }

        let mut units_total = 0u128;
        for (asset, amount) in &summed {
            units_total += mul_truncate(*amount, self.price_usd_mint(env.oracle, asset)?)?;
        }
        if units_total < min_units {
            return Err(ProtocolError::MintAmountTooLow);
        }
        for (asset, amount) in &summed {
            env.bank
                .can_transfer_from(asset, &self.address(), &caller, *amount)?;
        }

        if units_total >= self.rebase_threshold() && !self.rebase_paused() {
            self.rebase_internal(env)?;
        }

        let vault_addr = self.address();
        for (asset, amount) in &summed {
            env.bank
                .transfer_from(asset, &vault_addr, &caller, vault_addr, *amount)?;
        }
        env.ledger.mint(vault_addr, env.bank, caller, units_total)?;
        env.events.push(Event::Minted {
            account: caller,
            units: units_total,
        });

        if units_total >= self.auto_allocate_threshold() && self.vault_buffer() < WAD {
            self.allocate_internal(env)?;
        }
        Ok(units_total)
    }

    /// Burn ledger units and pay out a proportional share of every
    /// supported asset, weighted by redeem prices.
    pub fn redeem(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        amount: u128,
        min_units: u128,
    ) -> ProtocolResult<()> {
        if self.capital_paused() {
            return Err(ProtocolError::CapitalPaused);
        }
        if env.ledger.balance_of(&caller) < amount {
            return Err(ProtocolError::RemoveExceedsBalance);
        }

        let outputs = self.calculate_redeem_outputs(env.bank, env.oracle, amount)?;
        // Slippage guard compares unit-adjusted value, not raw asset
        // amounts, so an above-par asset does not trip it
        let mut total_units = 0u128;
        for (asset, output) in self.all_assets().iter().zip(&outputs) {
            total_units += mul_truncate(*output, self.price_usd_redeem(env.oracle, asset)?)?;
        }
        if total_units < min_units {
            return Err(ProtocolError::RedeemAmountTooLow);
        }

        // Liquidity check per asset before anything moves
        let vault_addr = self.address();
        for (asset, output) in self.all_assets().iter().zip(&outputs) {
            if *output == 0 {
                continue;
            }
            let vault_balance = env.bank.balance_of(asset, &vault_addr)?;
            if vault_balance >= *output {
                continue;
            }
            let strategy_addr = self
                .asset_default_strategy(asset)
                .ok_or(ProtocolError::LiquidityError)?;
            let reg = self
                .strategies
                .get(&strategy_addr)
                .ok_or(ProtocolError::LiquidityError)?;
            if reg.strategy.check_balance(env.bank, asset)? < *output {
                return Err(ProtocolError::LiquidityError);
            }
        }

        env.ledger.burn(vault_addr, env.bank, caller, amount)?;
        let assets: Vec<Address> = self.all_assets().to_vec();
        for (asset, output) in assets.iter().zip(&outputs) {
            if *output == 0 {
                continue;
            }
            let vault_balance = env.bank.balance_of(asset, &vault_addr)?;
            if vault_balance >= *output {
                env.bank.transfer(asset, &vault_addr, caller, *output)?;
            } else {
                let strategy_addr = self
                    .asset_default_strategy(asset)
                    .ok_or(ProtocolError::LiquidityError)?;
                let reg = self
                    .strategies
                    .get_mut(&strategy_addr)
                    .ok_or(ProtocolError::LiquidityError)?;
                reg.strategy.withdraw(env.bank, caller, asset, *output)?;
            }
        }
        env.events.push(Event::Redeemed {
            account: caller,
            units: amount,
        });

        // Burning above the threshold moves enough value that holders
        // should see the backing ratio refreshed
        if amount > self.rebase_threshold() && !self.rebase_paused() {
            self.rebase_internal(env)?;
        }
        Ok(())
    }

    /// Redeem the caller's entire balance.
    pub fn redeem_all(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        min_units: u128,
    ) -> ProtocolResult<()> {
        let balance = env.ledger.balance_of(&caller);
        self.redeem(env, caller, balance, min_units)
    }

    /// Per-asset payouts for redeeming `amount` units, after the
    /// redeem fee: output_i = net * balance_i / sum(balance_j * price_j).
    pub fn calculate_redeem_outputs(
        &self,
        bank: &TokenBank,
        oracle: &OracleRouter,
        amount: u128,
    ) -> ProtocolResult<Vec<u128>> {
        let fee = safe_calculate_bps(amount, self.redeem_fee_bps())?;
        let net = amount - fee;

        let mut balances = Vec::with_capacity(self.asset_count());
        let mut total_output_value = 0u128;
        for asset in self.all_assets() {
            let balance = self.check_balance(bank, asset)?;
            total_output_value += mul_truncate(balance, self.price_usd_redeem(oracle, asset)?)?;
            balances.push(balance);
        }

        let mut outputs = Vec::with_capacity(balances.len());
        for balance in balances {
            if net == 0 || balance == 0 {
                outputs.push(0);
            } else {
                outputs.push(safe_mul_div_u128(net, balance, total_output_value)?);
            }
        }
        Ok(outputs)
    }

    /// Public rebase entry point.
    pub fn rebase(&mut self, env: &mut VaultEnv) -> ProtocolResult<()> {
        if self.rebase_paused() {
            return Err(ProtocolError::RebasePaused);
        }
        self.rebase_internal(env)
    }

    /// Ratchet the ledger supply up to the current backing value,
    /// minting the trustee's share of the yield first. Supply never
    /// adjusts downward; a value dip simply leaves balances unchanged
    /// until backing recovers.
    fn rebase_internal(&mut self, env: &mut VaultEnv) -> ProtocolResult<()> {
        let supply = env.ledger.total_supply();
        if supply == 0 {
            return Ok(());
        }
        // With no rebasing holders there is nobody to distribute to;
        // yield stays in the vault until one opts in
        if env.ledger.rebasing_credits() == 0 {
            return Ok(());
        }
        let value = self.total_value(env.bank, env.oracle)?;
        if value <= supply {
            return Ok(());
        }

        let yield_amount = value - supply;
        let fee = safe_calculate_bps(yield_amount, self.trustee_fee_bps())?;
        if fee > 0 {
            if let Some(trustee) = self.trustee_address() {
                env.ledger.mint(self.address(), env.bank, trustee, fee)?;
            }
        }
        env.ledger.change_supply(self.address(), value)?;
        env.events.push(Event::TotalSupplyUpdated {
            total_supply: env.ledger.total_supply(),
            rebasing_credits: env.ledger.rebasing_credits(),
            rebasing_credits_per_unit: env.ledger.rebasing_credits_per_unit(),
        });
        Ok(())
    }

    /// Public allocate entry point.
    pub fn allocate(&mut self, env: &mut VaultEnv) -> ProtocolResult<()> {
        if self.capital_paused() {
            return Err(ProtocolError::CapitalPaused);
        }
        self.allocate_internal(env)
    }

    /// Move vault-held assets above the buffer into each asset's
    /// default strategy. Idempotent: with no new deposits the buffer
    /// arithmetic allocates nothing on a second call.
    fn allocate_internal(&mut self, env: &mut VaultEnv) -> ProtocolResult<()> {
        let vault_value = self.total_value_in_vault(env.bank, env.oracle)?;
        if vault_value == 0 {
            return Ok(());
        }
        let strategies_value = self.total_value_in_strategies(env.bank, env.oracle)?;
        let total_value = vault_value + strategies_value;

        // Fraction of each vault balance to deploy, leaving the buffer
        // behind. E.g. 1e18 - (1e17 * 10e18)/5e18 = 8e17 deploys 80%
        // of a vault holding half the total value at a 10% buffer.
        let buffer_modifier = if strategies_value == 0 {
            WAD - self.vault_buffer()
        } else {
            let filled = safe_mul_div_u128(self.vault_buffer(), total_value, vault_value)?;
            if filled < WAD {
                WAD - filled
            } else {
                // Buffer needs filling; keep everything in the vault
                return Ok(());
            }
        };
        if buffer_modifier == 0 {
            return Ok(());
        }

        let vault_addr = self.address();
        for asset in self.all_assets().to_vec() {
            let balance = env.bank.balance_of(&asset, &vault_addr)?;
            if balance == 0 {
                continue;
            }
            let allocate_amount = mul_truncate(balance, buffer_modifier)?;
            if allocate_amount == 0 {
                continue;
            }
            let Some(strategy_addr) = self.asset_default_strategy(&asset) else {
                continue;
            };
            let Some(reg) = self.strategies.get_mut(&strategy_addr) else {
                continue;
            };
            if !reg.is_supported || !reg.strategy.supports_asset(&asset) {
                continue;
            }
            env.bank
                .transfer(&asset, &vault_addr, strategy_addr, allocate_amount)?;
            reg.strategy.deposit(env.bank, &asset, allocate_amount)?;
            env.events.push(Event::AllocatedToStrategy {
                strategy: strategy_addr,
                asset,
                amount: allocate_amount,
            });
        }
        Ok(())
    }

    /// Move specific amounts between two approved strategies.
    pub fn reallocate(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        from_strategy: Address,
        to_strategy: Address,
        assets: &[Address],
        amounts: &[u128],
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        if assets.len() != amounts.len() {
            return Err(ProtocolError::ParameterLengthMismatch);
        }
        if !self.is_approved_strategy(&from_strategy) {
            return Err(ProtocolError::InvalidFromStrategy);
        }
        if !self.is_approved_strategy(&to_strategy) {
            return Err(ProtocolError::InvalidToStrategy);
        }

        for (asset, amount) in assets.iter().zip(amounts) {
            let from = &self.strategies[&from_strategy];
            let to = &self.strategies[&to_strategy];
            if !to.strategy.supports_asset(asset) {
                return Err(ProtocolError::StrategyAssetUnsupported);
            }
            if from.strategy.check_balance(env.bank, asset)? < *amount {
                return Err(ProtocolError::LiquidityError);
            }
        }

        for (asset, amount) in assets.iter().zip(amounts) {
            let from = self
                .strategies
                .get_mut(&from_strategy)
                .ok_or(ProtocolError::InvalidFromStrategy)?;
            from.strategy.withdraw(env.bank, to_strategy, asset, *amount)?;
            let to = self
                .strategies
                .get_mut(&to_strategy)
                .ok_or(ProtocolError::InvalidToStrategy)?;
            to.strategy.deposit(env.bank, asset, *amount)?;
        }
        Ok(())
    }

    /// Collect reward tokens from every approved strategy.
    pub fn harvest(&mut self, env: &mut VaultEnv, caller: Address) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        for strategy_addr in self.all_strategies().to_vec() {
            self.harvest_internal(env, strategy_addr)?;
        }
        Ok(())
    }

    /// Collect reward tokens from one approved strategy.
    pub fn harvest_strategy(
        &mut self,
        env: &mut VaultEnv,
        caller: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.ensure_governor_or_strategist(caller)?;
        if !self.is_approved_strategy(&strategy) {
            return Err(ProtocolError::StrategyNotApproved);
        }
        self.harvest_internal(env, strategy)
    }

    /// Pull a strategy's accrued rewards into the vault and, when a
    /// swap router is configured for them, liquidate into a supported
    /// asset so the next rebase credits the proceeds. Without a router
    /// the rewards sit in the vault uncredited.
    fn harvest_internal(
        &mut self,
        env: &mut VaultEnv,
        strategy_addr: Address,
    ) -> ProtocolResult<()> {
        let vault_addr = self.address();
        let reg = self
            .strategies
            .get_mut(&strategy_addr)
            .ok_or(ProtocolError::StrategyNotApproved)?;
        let reward_token = reg.strategy.reward_token();
        let collected = reg.strategy.collect_reward_token(env.bank, vault_addr)?;
        if collected > 0 {
            env.events.push(Event::RewardTokenCollected {
                strategy: strategy_addr,
                amount: collected,
            });
        }

        let (Some(token), Some(router)) = (reward_token, env.swap_router) else {
            return Ok(());
        };
        if router.token_in() != token {
            return Ok(());
        }
        let balance = env.bank.balance_of(&token, &vault_addr)?;
        if balance > 0 {
            router.swap_exact_tokens(env.bank, vault_addr, &token, balance)?;
        }
        Ok(())
    }
}
