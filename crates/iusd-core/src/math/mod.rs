//! # Math Utilities
//!
//! Overflow-checked integer arithmetic and 1e18 fixed-point ("wad")
//! operations used throughout the accounting engine.

pub mod big_int;
pub mod safe_math;
pub mod wad;

pub use big_int::{mul_div_u128, Rounding, U256};
pub use safe_math::*;
pub use wad::{div_precisely, mul_truncate};
