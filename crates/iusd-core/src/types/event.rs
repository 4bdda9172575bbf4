//! Append-only protocol event log.
//!
//! Mirrors the events the deployed contracts emit for off-chain
//! indexers. Every state-changing operation pushes its events after the
//! mutation has fully applied, so a failed operation leaves no events.

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Observable protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Ledger
    Transfer { from: Address, to: Address, units: u128 },
    TotalSupplyUpdated {
        total_supply: u128,
        rebasing_credits: u128,
        rebasing_credits_per_unit: u128,
    },

    // Vault capital movement
    Minted { account: Address, units: u128 },
    Redeemed { account: Address, units: u128 },
    AllocatedToStrategy {
        strategy: Address,
        asset: Address,
        amount: u128,
    },
    RewardTokenCollected { strategy: Address, amount: u128 },

    // Vault admin
    AssetSupported { asset: Address },
    StrategyApproved { strategy: Address },
    StrategyRemoved { strategy: Address },
    AssetDefaultStrategyUpdated { asset: Address, strategy: Address },
    VaultBufferUpdated { buffer: u128 },
    RedeemFeeUpdated { bps: u64 },
    TrusteeFeeBpsChanged { bps: u64 },
    TrusteeAddressChanged { trustee: Option<Address> },
    AutoAllocateThresholdUpdated { threshold: u128 },
    RebaseThresholdUpdated { threshold: u128 },
    StrategistUpdated { strategist: Address },
    PriceProviderUpdated { provider: Address },
    UniswapUpdated { router: Option<Address> },
    CapitalPaused,
    CapitalUnpaused,
    RebasePaused,
    RebaseUnpaused,

    // Governance
    ProposalCreated { id: u64 },
    ProposalQueued { id: u64, eta: u64 },
    ProposalExecuted { id: u64 },
}
