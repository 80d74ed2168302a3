//! blake2b-256 binding for the validator core.
//!
//! CONSENSUS RULE: blake2b with a 32-byte digest, unkeyed, empty
//! personalization. No other hash algorithm is permitted anywhere in the
//! verification path — key derivation, SMT node merging, block hashing,
//! script hashing, and return-data commitment all use this one function.
//!
//! The zero hash (all 32 bytes zero) is a reserved sentinel meaning "absent".
//! It is not a possible blake2b output for any input we hash, and the SMT
//! merge function shortcuts on it.

/// A 256-bit hash. Zero means "absent".
pub type Hash = [u8; 32];

/// The reserved absent-value sentinel.
pub const ZERO_HASH: Hash = [0u8; 32];

/// A streaming blake2b-256 state. Callers `update` then `finalize_into`.
pub struct Blake2b(blake2b_simd::State);

impl Blake2b {
    pub fn new() -> Self {
        Blake2b(
            blake2b_simd::Params::new()
                .hash_length(32)
                .to_state(),
        )
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    pub fn finalize_into(&self, out: &mut Hash) {
        out.copy_from_slice(self.0.finalize().as_bytes());
    }

    pub fn finalize(&self) -> Hash {
        let mut out = ZERO_HASH;
        self.finalize_into(&mut out);
        out
    }
}

impl Default for Blake2b {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot blake2b-256 over a byte slice.
pub fn blake2b(data: &[u8]) -> Hash {
    let mut state = Blake2b::new();
    state.update(data);
    state.finalize()
}

/// blake2b-256 over the concatenation of two 32-byte values.
/// Used for SMT leaf hashing `H(key ‖ value)` and node merging `H(l ‖ r)`.
pub fn blake2b_pair(a: &Hash, b: &Hash) -> Hash {
    let mut state = Blake2b::new();
    state.update(a);
    state.update(b);
    state.finalize()
}

/// True iff every byte of `hash` is zero.
pub fn is_zero_hash(hash: &Hash) -> bool {
    hash.iter().all(|&b| b == 0)
}
