//! Deterministic arithmetic for protocol quantities.
//!
//! Module layout:
//!   math::uint256 — U256, the 256-bit little-endian token amount.
//!
//! Every operation that can fail returns a Result; nothing here wraps,
//! saturates, or panics on overflow.

pub mod uint256;

pub use uint256::U256;
