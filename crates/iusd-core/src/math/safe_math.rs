//! # Safe Math Operations
//!
//! Overflow-checked arithmetic used throughout the accounting engine.

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{ProtocolError, ProtocolResult};

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:expr) => {
        /// Safe $fn_name with overflow/underflow check
        pub fn $fn_name(a: $type, b: $type) -> ProtocolResult<$type> {
            a.$checked_method(b).ok_or($error)
        }
    };

    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        /// Safe division with zero check
        pub fn $fn_name(a: $type, b: $type) -> ProtocolResult<$type> {
            if b == 0 {
                return Err(ProtocolError::DivisionByZero);
            }
            Ok(a / b)
        }
    };
}

// Generate basic arithmetic functions
safe_arith!(safe_add_u64, u64, checked_add, ProtocolError::MathOverflow);
safe_arith!(safe_sub_u64, u64, checked_sub, ProtocolError::MathUnderflow);
safe_arith!(safe_mul_u64, u64, checked_mul, ProtocolError::MathOverflow);
safe_arith!(div, safe_div_u64, u64);

safe_arith!(safe_add_u128, u128, checked_add, ProtocolError::MathOverflow);
safe_arith!(safe_sub_u128, u128, checked_sub, ProtocolError::MathUnderflow);
safe_arith!(safe_mul_u128, u128, checked_mul, ProtocolError::MathOverflow);
safe_arith!(div, safe_div_u128, u128);

/// Mul-div operation with u128 using a U256 intermediate
pub fn safe_mul_div_u128(a: u128, b: u128, c: u128) -> ProtocolResult<u128> {
    crate::math::big_int::mul_div_u128(a, b, c, crate::math::big_int::Rounding::Down)
}

/// Calculate a basis-points fraction of a value (truncating)
pub fn safe_calculate_bps(value: u128, bps: u64) -> ProtocolResult<u128> {
    if bps > BPS_DENOMINATOR {
        return Err(ProtocolError::InvalidValue);
    }
    safe_mul_div_u128(value, bps as u128, BPS_DENOMINATOR as u128)
}
