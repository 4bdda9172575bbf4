//! # Protocol Error Types
//!
//! Every failure in the engine surfaces as a typed error carrying the
//! short human-readable reason string of the original deployment. A failed
//! operation leaves the protocol state unchanged.

use thiserror::Error;

/// Protocol errors, grouped by the failure taxonomy of the original
/// contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("Caller is not the Governor")]
    CallerNotGovernor,

    #[error("Caller is not the Strategist or Governor")]
    CallerNotStrategistOrGovernor,

    #[error("Caller is not the Vault")]
    CallerNotVault,

    // ========================================================================
    // State Precondition Errors
    // ========================================================================
    #[error("Asset is not supported")]
    AssetNotSupported,

    #[error("Asset already supported")]
    AssetAlreadySupported,

    #[error("Strategy already approved")]
    StrategyAlreadyApproved,

    #[error("Strategy not approved")]
    StrategyNotApproved,

    #[error("Invalid from Strategy")]
    InvalidFromStrategy,

    #[error("Invalid to Strategy")]
    InvalidToStrategy,

    #[error("Asset unsupported")]
    StrategyAssetUnsupported,

    #[error("Account has not opted out")]
    NotOptedOut,

    #[error("Account has not opted in")]
    NotOptedIn,

    #[error("Capital paused")]
    CapitalPaused,

    #[error("Rebasing paused")]
    RebasePaused,

    #[error("Only unsupported assets")]
    OnlyUnsupportedAssets,

    #[error("Invalid value")]
    InvalidValue,

    #[error("Parameter length mismatch")]
    ParameterLengthMismatch,

    #[error("Platform token does not exist")]
    PlatformTokenMissing,

    #[error("Invalid index")]
    InvalidIndex,

    // ========================================================================
    // Balance and Arithmetic Errors
    // ========================================================================
    #[error("Amount must be greater than 0")]
    ZeroAmount,

    #[error("Remove exceeds balance")]
    RemoveExceedsBalance,

    #[error("Transfer amount exceeds balance")]
    TransferExceedsBalance,

    #[error("Transfer to the zero address")]
    TransferToZeroAddress,

    #[error("Mint to the zero address")]
    MintToZeroAddress,

    #[error("Allowance exceeded")]
    AllowanceExceeded,

    #[error("ERC20 operation did not succeed")]
    TokenOperationFailed,

    #[error("Unknown token")]
    UnknownToken,

    #[error("Liquidity error")]
    LiquidityError,

    #[error("Max supply")]
    MaxSupplyExceeded,

    #[error("Cannot increase 0 supply")]
    CannotIncreaseZeroSupply,

    #[error("Invalid change in supply")]
    InvalidSupplyChange,

    #[error("Math overflow")]
    MathOverflow,

    #[error("Math underflow")]
    MathUnderflow,

    #[error("Division by zero")]
    DivisionByZero,

    // ========================================================================
    // Slippage Errors
    // ========================================================================
    #[error("Mint amount lower than minimum")]
    MintAmountTooLow,

    #[error("Redeem amount lower than minimum")]
    RedeemAmountTooLow,

    // ========================================================================
    // Oracle Errors
    // ========================================================================
    #[error("Price is not available")]
    PriceNotAvailable,

    #[error("Price is not settable")]
    PriceNotSettable,

    // ========================================================================
    // Governance Errors
    // ========================================================================
    #[error("Proposal does not exist")]
    ProposalNotFound,

    #[error("Proposal already queued")]
    ProposalAlreadyQueued,

    #[error("Proposal is not queued")]
    ProposalNotQueued,

    #[error("Proposal already executed")]
    ProposalAlreadyExecuted,

    #[error("Proposal has expired")]
    ProposalExpired,

    #[error("Timelock delay has not elapsed")]
    TimelockNotElapsed,

    #[error("Must provide actions")]
    EmptyProposal,

    #[error("Delay must exceed minimum delay")]
    DelayBelowMinimum,

    #[error("Delay must not exceed maximum delay")]
    DelayAboveMaximum,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    #[error("Unsupported snapshot schema version: {0}")]
    UnsupportedSchemaVersion(u32),
}

/// Result type using protocol errors
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(
            ProtocolError::CallerNotGovernor.to_string(),
            "Caller is not the Governor"
        );
        assert_eq!(
            ProtocolError::MintAmountTooLow.to_string(),
            "Mint amount lower than minimum"
        );
        assert_eq!(
            ProtocolError::NotOptedOut.to_string(),
            "Account has not opted out"
        );
        assert_eq!(
            ProtocolError::UnsupportedSchemaVersion(9).to_string(),
            "Unsupported snapshot schema version: 9"
        );
    }
}
