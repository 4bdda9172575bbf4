//! # Protocol Constants
//!
//! Fundamental constants for the iUSD accounting engine:
//! - Fixed-point scales
//! - Fee bounds
//! - Genesis vault parameters
//! - Governance timelock bounds
//! - Snapshot schema version

// ============================================================================
// Fixed-Point Constants
// ============================================================================

/// Wad fixed-point scale factor: 1e18. All ledger amounts, asset amounts
/// and prices use this scale.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// The credits-per-unit ratio the rebasing ledger starts at.
pub const INITIAL_CREDITS_PER_UNIT: u128 = WAD;

/// Hard cap on the ledger's total supply, in wad units. Credit tallies
/// never exceed the supply, so the headroom below `u128::MAX` keeps
/// every accumulator in range.
pub const MAX_SUPPLY: u128 = u128::MAX / 2;

// ============================================================================
// Ledger Constants
// ============================================================================

/// Display decimals of the ledger unit.
pub const LEDGER_DECIMALS: u8 = 18;

/// Ledger unit name.
pub const LEDGER_NAME: &str = "Interest Dollar";

/// Ledger unit symbol.
pub const LEDGER_SYMBOL: &str = "iUSD";

// ============================================================================
// Fee Bounds
// ============================================================================

/// Maximum redeem fee (100%)
pub const MAX_REDEEM_FEE_BPS: u64 = 10_000;

/// Maximum trustee fee (50%)
pub const MAX_TRUSTEE_FEE_BPS: u64 = 5_000;

// ============================================================================
// Genesis Vault Parameters
// ============================================================================

/// Mint value at or above which a mint triggers an automatic allocation.
pub const DEFAULT_AUTO_ALLOCATE_THRESHOLD: u128 = 25_000 * WAD;

/// Amount at or above which mint/redeem triggers a rebase.
pub const DEFAULT_REBASE_THRESHOLD: u128 = 1_000 * WAD;

// ============================================================================
// Governance Timelock
// ============================================================================

/// Minimum timelock delay (1 minute)
pub const MIN_TIMELOCK_DELAY: u64 = 60;

/// Maximum timelock delay (2 days)
pub const MAX_TIMELOCK_DELAY: u64 = 2 * 24 * 60 * 60;

/// Queued proposals expire this long after their eta (3 days).
pub const PROPOSAL_GRACE_PERIOD: u64 = 3 * 24 * 60 * 60;

/// Timelock delay the protocol deploys with.
pub const DEFAULT_TIMELOCK_DELAY: u64 = 60;

// ============================================================================
// Persistence
// ============================================================================

/// Schema version written into protocol snapshots. Bump on any change to
/// the serialized state layout and migrate explicitly.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
