//! 1e18 fixed-point ("wad") operations.
//!
//! Truncation on multiply and the extra-precision divide mirror the
//! stable math conventions of the accounting model: integer division
//! always truncates in the protocol's favor.

use crate::constants::WAD;
use crate::errors::ProtocolResult;
use crate::math::safe_math::safe_mul_div_u128;

/// Multiply two wads, truncating the result: (a * b) / 1e18
pub fn mul_truncate(a: u128, b: u128) -> ProtocolResult<u128> {
    safe_mul_div_u128(a, b, WAD)
}

/// Divide with wad precision: (a * 1e18) / b
pub fn div_precisely(a: u128, b: u128) -> ProtocolResult<u128> {
    safe_mul_div_u128(a, WAD, b)
}
