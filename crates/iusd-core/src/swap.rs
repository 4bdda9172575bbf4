//! Swap router used by harvest to liquidate reward tokens.
//!
//! Models the uniswap-style mock of the original deployment: a single
//! configured pair converted 1:1, paid out of the router's own
//! inventory. Routers live in a registry keyed by address; the vault
//! points at one (or none) via its uniswap setting.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, ProtocolResult};
use crate::token::TokenBank;
use crate::types::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRouter {
    address: Address,
    token_in: Address,
    token_out: Address,
    /// LP token identifying the pair, carried for parity with the
    /// router's on-chain configuration surface.
    lp_token: Address,
}

impl SwapRouter {
    pub fn new(address: Address, token_in: Address, token_out: Address, lp_token: Address) -> Self {
        Self {
            address,
            token_in,
            token_out,
            lp_token,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token_in(&self) -> Address {
        self.token_in
    }

    pub fn token_out(&self) -> Address {
        self.token_out
    }

    pub fn lp_token(&self) -> Address {
        self.lp_token
    }

    /// Swap `amount` of the configured input token held by `from` for
    /// the same amount of the output token from the router's inventory.
    pub fn swap_exact_tokens(
        &self,
        bank: &mut TokenBank,
        from: Address,
        token_in: &Address,
        amount: u128,
    ) -> ProtocolResult<u128> {
        if *token_in != self.token_in {
            return Err(ProtocolError::UnknownToken);
        }
        // Inventory check first so a failed swap moves nothing
        bank.can_transfer(&self.token_out, &self.address, amount)?;
        bank.transfer(token_in, &from, self.address, amount)?;
        bank.transfer(&self.token_out, &self.address, from, amount)?;
        Ok(amount)
    }
}
