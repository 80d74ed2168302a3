//! `U256` — the 256-bit unsigned token amount.
//!
//! Balances and transfer amounts are 256-bit, little-endian on the wire.
//!
//! INVARIANTS:
//! - The inner limbs are PRIVATE. All construction goes through the byte or
//!   integer constructors; all arithmetic goes through checked operations.
//! - Addition and subtraction detect the 2^256 boundary exactly and return
//!   `AmountOverflow` — a wrapped balance is a mint-from-nothing bug.
//! - Comparison is numeric, most-significant limb first.

use crate::ErrorCode;

/// Eight little-endian u32 limbs: limb 0 holds bits 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256([u32; 8]);

impl U256 {
    pub const ZERO: U256 = U256([0; 8]);
    pub const ONE: U256 = U256([1, 0, 0, 0, 0, 0, 0, 0]);
    pub const MAX: U256 = U256([u32::MAX; 8]);

    /// Decode from 32 little-endian bytes (the wire representation).
    pub fn from_le_bytes(bytes: &[u8; 32]) -> U256 {
        let mut limbs = [0u32; 8];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = u32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ]);
        }
        U256(limbs)
    }

    /// Encode to 32 little-endian bytes.
    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&limb.to_le_bytes());
        }
        bytes
    }

    pub fn from_u128(value: u128) -> U256 {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(&value.to_le_bytes());
        U256::from_le_bytes(&bytes)
    }

    pub fn from_u64(value: u64) -> U256 {
        U256::from_u128(u128::from(value))
    }

    pub fn is_zero(self) -> bool {
        self.0 == [0; 8]
    }

    /// `self + rhs`, or `AmountOverflow` past the 2^256 boundary.
    pub fn checked_add(self, rhs: U256) -> Result<U256, ErrorCode> {
        let mut limbs = [0u32; 8];
        let mut carry = 0u64;
        for i in 0..8 {
            let sum = u64::from(self.0[i]) + u64::from(rhs.0[i]) + carry;
            limbs[i] = sum as u32;
            carry = sum >> 32;
        }
        if carry != 0 {
            return Err(ErrorCode::AmountOverflow);
        }
        Ok(U256(limbs))
    }

    /// `self - rhs`, or `AmountOverflow` when `rhs > self`.
    pub fn checked_sub(self, rhs: U256) -> Result<U256, ErrorCode> {
        let mut limbs = [0u32; 8];
        let mut borrow = 0u64;
        for i in 0..8 {
            let lhs = u64::from(self.0[i]);
            let sub = u64::from(rhs.0[i]) + borrow;
            if lhs >= sub {
                limbs[i] = (lhs - sub) as u32;
                borrow = 0;
            } else {
                limbs[i] = ((1u64 << 32) + lhs - sub) as u32;
                borrow = 1;
            }
        }
        if borrow != 0 {
            return Err(ErrorCode::AmountOverflow);
        }
        Ok(U256(limbs))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        // Most-significant limb first.
        for i in (0..8).rev() {
            match self.0[i].cmp(&other.0[i]) {
                core::cmp::Ordering::Equal => continue,
                order => return order,
            }
        }
        core::cmp::Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
