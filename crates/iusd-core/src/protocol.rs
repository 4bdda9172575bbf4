//! Protocol facade.
//!
//! Owns every component - ledger, token bank, vault, oracle and swap
//! router registries, governor, event log - and routes callers into
//! them the way transactions reach the deployed contracts. Governance
//! execution applies proposals against a snapshot so a failing action
//! rolls the whole proposal back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TIMELOCK_DELAY, SNAPSHOT_SCHEMA_VERSION};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::governance::{Action, Governor, ProposalState};
use crate::ledger::Ledger;
use crate::oracle::OracleRouter;
use crate::strategy::{Strategy, StrategyKind};
use crate::swap::SwapRouter;
use crate::token::{TokenBank, TransferBehavior};
use crate::types::{Address, Event};
use crate::vault::{Vault, VaultEnv};

/// Addresses and parameters the protocol deploys with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub governor: Address,
    pub strategist: Address,
    pub timelock_delay: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            governor: Address::named("governor"),
            strategist: Address::named("strategist"),
            timelock_delay: DEFAULT_TIMELOCK_DELAY,
        }
    }
}

/// Serialized protocol state with an explicit schema version. Loading
/// refuses unknown versions; migrations are explicit, never implicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub protocol: Protocol,
}

impl Snapshot {
    pub fn into_protocol(self) -> ProtocolResult<Protocol> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(ProtocolError::UnsupportedSchemaVersion(self.schema_version));
        }
        Ok(self.protocol)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub ledger: Ledger,
    pub bank: TokenBank,
    pub vault: Vault,
    pub governor: Governor,
    oracle_routers: BTreeMap<Address, OracleRouter>,
    swap_routers: BTreeMap<Address, SwapRouter>,
    events: Vec<Event>,
}

impl Protocol {
    /// Deploy the protocol: vault wired to the ledger, a dev oracle
    /// router as price provider, the governance queue at the
    /// configured delay.
    pub fn new(config: GenesisConfig) -> ProtocolResult<Self> {
        let vault_addr = Address::named("vault");
        let oracle_addr = Address::named("oracle-router");

        let mut bank = TokenBank::new();
        bank.register_contract(vault_addr);
        bank.register_contract(oracle_addr);

        let mut oracle_routers = BTreeMap::new();
        oracle_routers.insert(oracle_addr, OracleRouter::dev(oracle_addr));

        Ok(Self {
            ledger: Ledger::new(vault_addr),
            bank,
            vault: Vault::new(vault_addr, config.governor, config.strategist, oracle_addr),
            governor: Governor::new(config.governor, config.timelock_delay)?,
            oracle_routers,
            swap_routers: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            protocol: self.clone(),
        }
    }

    // ========================================================================
    // Deployment wiring
    // ========================================================================

    pub fn register_token(&mut self, token: Address, behavior: TransferBehavior) {
        self.bank.register_token(token, behavior);
    }

    pub fn register_contract(&mut self, account: Address) {
        self.bank.register_contract(account);
    }

    pub fn add_oracle_router(&mut self, router: OracleRouter) {
        self.bank.register_contract(router.address());
        self.oracle_routers.insert(router.address(), router);
    }

    pub fn add_swap_router(&mut self, router: SwapRouter) {
        self.bank.register_contract(router.address());
        self.swap_routers.insert(router.address(), router);
    }

    /// Make a deployed strategy known to the vault and the bank.
    pub fn register_strategy(&mut self, strategy: StrategyKind) -> ProtocolResult<()> {
        self.bank.register_contract(strategy.address());
        match &strategy {
            StrategyKind::Lending(s) => self.bank.register_contract(s.pool().address()),
        }
        self.vault.register_strategy(strategy)
    }

    /// Inject a price into the current price provider (dev router).
    pub fn set_price(&mut self, asset: Address, price: u128) -> ProtocolResult<()> {
        let provider = self.vault.price_provider();
        self.oracle_routers
            .get_mut(&provider)
            .ok_or(ProtocolError::PriceNotAvailable)?
            .set_price(asset, price)
    }

    pub fn oracle_router(&self, addr: &Address) -> Option<&OracleRouter> {
        self.oracle_routers.get(addr)
    }

    pub fn swap_router(&self, addr: &Address) -> Option<&SwapRouter> {
        self.swap_routers.get(addr)
    }

    fn oracle(&self) -> ProtocolResult<&OracleRouter> {
        self.oracle_routers
            .get(&self.vault.price_provider())
            .ok_or(ProtocolError::PriceNotAvailable)
    }

    /// Split borrows into the vault plus the environment its
    /// operations run against.
    fn vault_ctx(&mut self) -> ProtocolResult<(&mut Vault, VaultEnv<'_>)> {
        let oracle = self
            .oracle_routers
            .get(&self.vault.price_provider())
            .ok_or(ProtocolError::PriceNotAvailable)?;
        let swap_router = match self.vault.uniswap_addr() {
            Some(addr) => self.swap_routers.get(&addr),
            None => None,
        };
        Ok((
            &mut self.vault,
            VaultEnv {
                ledger: &mut self.ledger,
                bank: &mut self.bank,
                oracle,
                swap_router,
                events: &mut self.events,
            },
        ))
    }

    // ========================================================================
    // Ledger surface
    // ========================================================================

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> ProtocolResult<()> {
        self.ledger.transfer(&self.bank, caller, to, amount)?;
        self.events.push(Event::Transfer {
            from: caller,
            to,
            units: amount,
        });
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        self.ledger
            .transfer_from(&self.bank, caller, from, to, amount)?;
        self.events.push(Event::Transfer {
            from,
            to,
            units: amount,
        });
        Ok(())
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: u128) {
        self.ledger.approve(caller, spender, amount);
    }

    pub fn rebase_opt_in(&mut self, caller: Address) -> ProtocolResult<()> {
        self.ledger.rebase_opt_in(&self.bank, caller)
    }

    pub fn rebase_opt_out(&mut self, caller: Address) -> ProtocolResult<()> {
        self.ledger.rebase_opt_out(&self.bank, caller)
    }

    // ========================================================================
    // Vault capital movement
    // ========================================================================

    pub fn mint(
        &mut self,
        caller: Address,
        asset: Address,
        amount: u128,
        min_units: u128,
    ) -> ProtocolResult<u128> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.mint(&mut env, caller, asset, amount, min_units)
    }

    pub fn mint_multiple(
        &mut self,
        caller: Address,
        assets: &[Address],
        amounts: &[u128],
        min_units: u128,
    ) -> ProtocolResult<u128> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.mint_multiple(&mut env, caller, assets, amounts, min_units)
    }

    pub fn redeem(&mut self, caller: Address, amount: u128, min_units: u128) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.redeem(&mut env, caller, amount, min_units)
    }

    pub fn redeem_all(&mut self, caller: Address, min_units: u128) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.redeem_all(&mut env, caller, min_units)
    }

    pub fn rebase(&mut self) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.rebase(&mut env)
    }

    pub fn allocate(&mut self) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.allocate(&mut env)
    }

    pub fn reallocate(
        &mut self,
        caller: Address,
        from_strategy: Address,
        to_strategy: Address,
        assets: &[Address],
        amounts: &[u128],
    ) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.reallocate(&mut env, caller, from_strategy, to_strategy, assets, amounts)
    }

    pub fn harvest(&mut self, caller: Address) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.harvest(&mut env, caller)
    }

    pub fn harvest_strategy(&mut self, caller: Address, strategy: Address) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.harvest_strategy(&mut env, caller, strategy)
    }

    // ========================================================================
    // Vault views
    // ========================================================================

    pub fn total_value(&self) -> ProtocolResult<u128> {
        self.vault.total_value(&self.bank, self.oracle()?)
    }

    pub fn check_balance(&self, asset: &Address) -> ProtocolResult<u128> {
        self.vault.check_balance(&self.bank, asset)
    }

    pub fn price_usd_mint(&self, asset: &Address) -> ProtocolResult<u128> {
        self.vault.price_usd_mint(self.oracle()?, asset)
    }

    pub fn price_usd_redeem(&self, asset: &Address) -> ProtocolResult<u128> {
        self.vault.price_usd_redeem(self.oracle()?, asset)
    }

    // ========================================================================
    // Vault admin
    // ========================================================================

    pub fn support_asset(&mut self, caller: Address, asset: Address) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.support_asset(&mut env, caller, asset)
    }

    pub fn approve_strategy(&mut self, caller: Address, strategy: Address) -> ProtocolResult<()> {
        self.vault
            .approve_strategy(&mut self.events, caller, strategy)
    }

    pub fn remove_strategy(&mut self, caller: Address, strategy: Address) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.remove_strategy(&mut env, caller, strategy)
    }

    pub fn set_asset_default_strategy(
        &mut self,
        caller: Address,
        asset: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        self.vault
            .set_asset_default_strategy(&mut self.events, caller, asset, strategy)
    }

    pub fn set_vault_buffer(&mut self, caller: Address, buffer: u128) -> ProtocolResult<()> {
        self.vault.set_vault_buffer(&mut self.events, caller, buffer)
    }

    pub fn set_redeem_fee_bps(&mut self, caller: Address, bps: u64) -> ProtocolResult<()> {
        self.vault.set_redeem_fee_bps(&mut self.events, caller, bps)
    }

    pub fn set_trustee_fee_bps(&mut self, caller: Address, bps: u64) -> ProtocolResult<()> {
        self.vault.set_trustee_fee_bps(&mut self.events, caller, bps)
    }

    pub fn set_trustee_address(
        &mut self,
        caller: Address,
        trustee: Option<Address>,
    ) -> ProtocolResult<()> {
        self.vault
            .set_trustee_address(&mut self.events, caller, trustee)
    }

    pub fn set_auto_allocate_threshold(
        &mut self,
        caller: Address,
        threshold: u128,
    ) -> ProtocolResult<()> {
        self.vault
            .set_auto_allocate_threshold(&mut self.events, caller, threshold)
    }

    pub fn set_rebase_threshold(&mut self, caller: Address, threshold: u128) -> ProtocolResult<()> {
        self.vault
            .set_rebase_threshold(&mut self.events, caller, threshold)
    }

    pub fn set_strategist_addr(&mut self, caller: Address, strategist: Address) -> ProtocolResult<()> {
        self.vault
            .set_strategist_addr(&mut self.events, caller, strategist)
    }

    pub fn set_price_provider(&mut self, caller: Address, provider: Address) -> ProtocolResult<()> {
        self.vault
            .set_price_provider(&mut self.events, caller, provider)
    }

    pub fn set_uniswap_addr(
        &mut self,
        caller: Address,
        router: Option<Address>,
    ) -> ProtocolResult<()> {
        self.vault.set_uniswap_addr(&mut self.events, caller, router)
    }

    pub fn pause_capital(&mut self, caller: Address) -> ProtocolResult<()> {
        self.vault.pause_capital(&mut self.events, caller)
    }

    pub fn unpause_capital(&mut self, caller: Address) -> ProtocolResult<()> {
        self.vault.unpause_capital(&mut self.events, caller)
    }

    pub fn pause_rebase(&mut self, caller: Address) -> ProtocolResult<()> {
        self.vault.pause_rebase(&mut self.events, caller)
    }

    pub fn unpause_rebase(&mut self, caller: Address) -> ProtocolResult<()> {
        self.vault.unpause_rebase(&mut self.events, caller)
    }

    pub fn withdraw_all_from_strategy(
        &mut self,
        caller: Address,
        strategy: Address,
    ) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.withdraw_all_from_strategy(&mut env, caller, strategy)
    }

    pub fn withdraw_all_from_strategies(&mut self, caller: Address) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.withdraw_all_from_strategies(&mut env, caller)
    }

    pub fn transfer_token(
        &mut self,
        caller: Address,
        token: Address,
        amount: u128,
    ) -> ProtocolResult<()> {
        let (vault, mut env) = self.vault_ctx()?;
        vault.transfer_token(&mut env, caller, token, amount)
    }

    // ========================================================================
    // Governance
    // ========================================================================

    pub fn propose(
        &mut self,
        caller: Address,
        actions: Vec<Action>,
        description: String,
        now: u64,
    ) -> ProtocolResult<u64> {
        let id = self.governor.propose(caller, actions, description, now)?;
        self.events.push(Event::ProposalCreated { id });
        Ok(id)
    }

    pub fn queue_proposal(&mut self, caller: Address, id: u64, now: u64) -> ProtocolResult<u64> {
        let eta = self.governor.queue(caller, id, now)?;
        self.events.push(Event::ProposalQueued { id, eta });
        Ok(eta)
    }

    pub fn proposal_state(&self, id: u64, now: u64) -> ProtocolResult<ProposalState> {
        self.governor.state(id, now)
    }

    /// Execute a queued proposal once its timelock has elapsed. The
    /// actions apply in order against a snapshot of the whole
    /// protocol; if any action fails the snapshot is restored, the
    /// off-chain equivalent of a transaction revert.
    pub fn execute_proposal(&mut self, id: u64, now: u64) -> ProtocolResult<()> {
        let actions = self.governor.begin_execute(id, now)?;
        let checkpoint = self.clone();
        for action in actions {
            if let Err(err) = self.apply_action(action) {
                *self = checkpoint;
                return Err(err);
            }
        }
        self.governor.mark_executed(id)?;
        self.events.push(Event::ProposalExecuted { id });
        Ok(())
    }

    fn apply_action(&mut self, action: Action) -> ProtocolResult<()> {
        let governor = self.vault.governor();
        match action {
            Action::SupportAsset(asset) => self.support_asset(governor, asset),
            Action::ApproveStrategy(strategy) => self.approve_strategy(governor, strategy),
            Action::RemoveStrategy(strategy) => self.remove_strategy(governor, strategy),
            Action::SetAssetDefaultStrategy(asset, strategy) => {
                self.set_asset_default_strategy(governor, asset, strategy)
            }
            Action::SetVaultBuffer(buffer) => self.set_vault_buffer(governor, buffer),
            Action::SetRedeemFeeBps(bps) => self.set_redeem_fee_bps(governor, bps),
            Action::SetTrusteeFeeBps(bps) => self.set_trustee_fee_bps(governor, bps),
            Action::SetTrusteeAddress(trustee) => self.set_trustee_address(governor, trustee),
            Action::SetAutoAllocateThreshold(threshold) => {
                self.set_auto_allocate_threshold(governor, threshold)
            }
            Action::SetRebaseThreshold(threshold) => {
                self.set_rebase_threshold(governor, threshold)
            }
            Action::SetStrategistAddr(strategist) => {
                self.set_strategist_addr(governor, strategist)
            }
            Action::SetPriceProvider(provider) => self.set_price_provider(governor, provider),
            Action::SetUniswapAddr(router) => self.set_uniswap_addr(governor, router),
            Action::PauseCapital => self.pause_capital(governor),
            Action::UnpauseCapital => self.unpause_capital(governor),
            Action::PauseRebase => self.pause_rebase(governor),
            Action::UnpauseRebase => self.unpause_rebase(governor),
            Action::TransferToken(token, amount) => self.transfer_token(governor, token, amount),
            Action::WithdrawAllFromStrategy(strategy) => {
                self.withdraw_all_from_strategy(governor, strategy)
            }
            Action::WithdrawAllFromStrategies => self.withdraw_all_from_strategies(governor),
            Action::SetTimelockDelay(delay) => {
                let admin = self.governor.admin();
                self.governor.set_delay(admin, delay)
            }
        }
    }

    // ========================================================================
    // Strategy configuration
    // ========================================================================

    pub fn strategy_set_platform_token(
        &mut self,
        caller: Address,
        strategy: Address,
        asset: Address,
        platform_token: Address,
    ) -> ProtocolResult<()> {
        self.bank
            .register_token(platform_token, TransferBehavior::Standard);
        self.vault
            .strategy_set_platform_token(caller, strategy, asset, platform_token)
    }

    pub fn strategy_remove_platform_token(
        &mut self,
        caller: Address,
        strategy: Address,
        index: usize,
    ) -> ProtocolResult<Address> {
        self.vault
            .strategy_remove_platform_token(caller, strategy, index)
    }

    pub fn strategy_set_reward_token(
        &mut self,
        caller: Address,
        strategy: Address,
        token: Option<Address>,
    ) -> ProtocolResult<()> {
        self.vault.strategy_set_reward_token(caller, strategy, token)
    }

    pub fn strategy_set_staking_contract(
        &mut self,
        caller: Address,
        strategy: Address,
        contract: Option<Address>,
    ) -> ProtocolResult<()> {
        self.vault
            .strategy_set_staking_contract(caller, strategy, contract)
    }

    pub fn strategy_set_lp_pair(
        &mut self,
        caller: Address,
        strategy: Address,
        pair: Option<(Address, Address)>,
    ) -> ProtocolResult<()> {
        self.vault.strategy_set_lp_pair(caller, strategy, pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WAD;

    #[test]
    fn test_genesis_state() {
        let protocol = Protocol::new(GenesisConfig::default()).unwrap();
        assert!(protocol.vault.capital_paused());
        assert!(!protocol.vault.rebase_paused());
        assert_eq!(protocol.vault.redeem_fee_bps(), 0);
        assert_eq!(protocol.vault.vault_buffer(), 0);
        assert_eq!(protocol.total_supply(), 0);
        assert_eq!(protocol.governor.delay(), 60);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut protocol = Protocol::new(GenesisConfig::default()).unwrap();
        let governor = protocol.vault.governor();
        let cusd = Address::named("cusd");
        protocol.register_token(cusd, TransferBehavior::Standard);
        protocol.set_price(cusd, WAD).unwrap();
        protocol.support_asset(governor, cusd).unwrap();

        let json = serde_json::to_string(&protocol.snapshot()).unwrap();
        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        let restored = restored.into_protocol().unwrap();
        assert!(restored.vault.is_supported_asset(&cusd));
        assert_eq!(restored.events().len(), protocol.events().len());
    }

    #[test]
    fn test_snapshot_rejects_unknown_schema() {
        let protocol = Protocol::new(GenesisConfig::default()).unwrap();
        let mut snapshot = protocol.snapshot();
        snapshot.schema_version = 99;
        assert_eq!(
            snapshot.into_protocol().unwrap_err(),
            ProtocolError::UnsupportedSchemaVersion(99)
        );
    }
}
