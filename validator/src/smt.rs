//! Sparse Merkle Tree proof verifier.
//!
//! The tree spans 256 height levels keyed by 256-bit hashes. A leaf's hash is
//! `H(key ‖ value)` when the value is non-zero, otherwise the zero hash. Two
//! nodes merge as:
//!
//! ```text
//! merge(l, r) = l          if r == 0
//!             = r          if l == 0
//!             = H(l ‖ r)   otherwise
//! ```
//!
//! A compact proof is a byte stream of opcodes executed against a stack of
//! `(key, value)` pairs:
//!
//! | Opcode       | Operands              | Effect                            |
//! |--------------|-----------------------|-----------------------------------|
//! | `0x4C` (`L`) | —                     | Push the next pre-sorted leaf.    |
//! | `0x50` (`P`) | height u8, sibling 32B| Merge top-of-stack with sibling.  |
//! | `0x48` (`H`) | height u8             | Pop two entries, merge as siblings.|
//!
//! CONSENSUS RULES:
//! 1. Bit `i` of a key is bit `i % 8` of byte `i / 8`, LSB-first — the tree
//!    walks from the least-significant bit toward the most-significant.
//! 2. The stack holds at most 32 entries. A depth-32 stack suffices for more
//!    than 2^31 leaf updates; overflow is a returned error, never a panic.
//! 3. A proof is accepted iff the opcode stream ends with every leaf
//!    consumed, exactly one stack entry, and that entry's value equal to the
//!    asserted root.

use crate::hash::{blake2b_pair, is_zero_hash, Hash, ZERO_HASH};
use crate::overlay::Pair;
use crate::ErrorCode;

/// Push the next leaf from the pre-sorted leaf list.
const OP_L: u8 = 0x4C;
/// Merge top-of-stack with an explicit sibling at a given height.
const OP_P: u8 = 0x50;
/// Merge the two top stack entries as siblings at a given height.
const OP_H: u8 = 0x48;

/// Proof stack depth. Sufficient for 2^31 updates.
const STACK_SIZE: usize = 32;

// ──────────────────────────────────────────────────────────────────────────────
// Key bit arithmetic
// ──────────────────────────────────────────────────────────────────────────────

fn get_bit(key: &Hash, offset: u8) -> bool {
    let byte = usize::from(offset) / 8;
    let bit = offset % 8;
    (key[byte] >> bit) & 1 != 0
}

fn set_bit(key: &mut Hash, offset: u8) {
    let byte = usize::from(offset) / 8;
    let bit = offset % 8;
    key[byte] |= 1 << bit;
}

/// Zero every bit below `first_kept_bit`, leaving `first_kept_bit` and above
/// untouched.
fn clear_low_bits(key: &mut Hash, first_kept_bit: usize) {
    let first_byte = first_kept_bit / 8;
    for byte in key.iter_mut().take(first_byte) {
        *byte = 0;
    }
    if first_byte < 32 {
        let keep_mask = !0u8 << (first_kept_bit % 8);
        key[first_byte] &= keep_mask;
    }
}

/// Walk a key to its parent at `height`: clear bits `[0..=height]`.
fn parent_path(key: &mut Hash, height: u8) {
    if height == u8::MAX {
        *key = ZERO_HASH;
    } else {
        clear_low_bits(key, usize::from(height) + 1);
    }
}

/// Merge two child hashes with the zero-hash shortcut.
fn merge(lhs: &Hash, rhs: &Hash) -> Hash {
    if is_zero_hash(lhs) {
        *rhs
    } else if is_zero_hash(rhs) {
        *lhs
    } else {
        blake2b_pair(lhs, rhs)
    }
}

/// Hash of a leaf: zero for an absent value, `H(key ‖ value)` otherwise.
fn leaf_hash(key: &Hash, value: &Hash) -> Hash {
    if is_zero_hash(value) {
        ZERO_HASH
    } else {
        blake2b_pair(key, value)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Proof replay
// ──────────────────────────────────────────────────────────────────────────────

/// Deterministically fold `proof` and the pre-sorted `leaves` into a root.
///
/// `leaves` must already be in SMT leaf order (`KvState::normalize`); the
/// verifier consumes them strictly left-to-right as `L` opcodes demand them.
pub fn calculate_root(leaves: &[Pair], proof: &[u8]) -> Result<Hash, ErrorCode> {
    let mut stack_keys = [ZERO_HASH; STACK_SIZE];
    let mut stack_values = [ZERO_HASH; STACK_SIZE];
    let mut stack_top = 0usize;
    let mut leaf_index = 0usize;
    let mut proof_index = 0usize;

    while proof_index < proof.len() {
        let opcode = proof[proof_index];
        proof_index += 1;
        match opcode {
            OP_L => {
                if stack_top >= STACK_SIZE {
                    return Err(ErrorCode::InvalidStack);
                }
                let Some(leaf) = leaves.get(leaf_index) else {
                    return Err(ErrorCode::InvalidProof);
                };
                stack_keys[stack_top] = leaf.key;
                stack_values[stack_top] = leaf_hash(&leaf.key, &leaf.value);
                stack_top += 1;
                leaf_index += 1;
            }
            OP_P => {
                if stack_top == 0 {
                    return Err(ErrorCode::InvalidStack);
                }
                if proof_index + 33 > proof.len() {
                    return Err(ErrorCode::InvalidProof);
                }
                let height = proof[proof_index];
                proof_index += 1;
                let mut sibling = ZERO_HASH;
                sibling.copy_from_slice(&proof[proof_index..proof_index + 32]);
                proof_index += 32;

                let key = &mut stack_keys[stack_top - 1];
                let value = &mut stack_values[stack_top - 1];
                *value = if get_bit(key, height) {
                    merge(&sibling, value)
                } else {
                    merge(value, &sibling)
                };
                parent_path(key, height);
            }
            OP_H => {
                if stack_top < 2 {
                    return Err(ErrorCode::InvalidStack);
                }
                if proof_index >= proof.len() {
                    return Err(ErrorCode::InvalidProof);
                }
                let height = proof[proof_index];
                proof_index += 1;

                // A sits deeper in the stack than B.
                let key_b = stack_keys[stack_top - 1];
                let value_b = stack_values[stack_top - 1];
                let key_a = &mut stack_keys[stack_top - 2];
                let value_a = &mut stack_values[stack_top - 2];
                stack_top -= 1;

                let a_set = get_bit(key_a, height);
                let b_set = get_bit(&key_b, height);
                clear_low_bits(key_a, usize::from(height));
                let mut key_b = key_b;
                clear_low_bits(&mut key_b, usize::from(height));

                // A and B must be siblings: identical parent paths above
                // `height` and opposite sides of the bit at `height`.
                let mut expected_sibling = *key_a;
                if !a_set {
                    set_bit(&mut expected_sibling, height);
                }
                if expected_sibling != key_b || a_set == b_set {
                    return Err(ErrorCode::InvalidSibling);
                }

                *value_a = if a_set {
                    merge(&value_b, value_a)
                } else {
                    merge(value_a, &value_b)
                };
                // The surviving entry's key is already the parent path.
            }
            _ => return Err(ErrorCode::InvalidProof),
        }
    }

    // Every leaf must have been consumed and exactly one entry must remain.
    if leaf_index != leaves.len() {
        return Err(ErrorCode::InvalidProof);
    }
    if stack_top != 1 {
        return Err(ErrorCode::InvalidStack);
    }
    Ok(stack_values[0])
}

/// Replay `proof` over `leaves` and require the reconstructed root to equal
/// `expected_root`.
pub fn verify(expected_root: &Hash, leaves: &[Pair], proof: &[u8]) -> Result<(), ErrorCode> {
    let root = calculate_root(leaves, proof)?;
    if &root != expected_root {
        log::debug!("smt root mismatch");
        return Err(ErrorCode::InvalidProof);
    }
    Ok(())
}
