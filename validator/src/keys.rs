//! State-key schema — derives raw 32-byte SMT keys from high-level reads
//! and writes.
//!
//! CONSENSUS RULES (all frozen):
//! 1. Every key kind carries a domain byte (0x00–0x05) inside its pre-image.
//! 2. Account KV, script-hash→id, data-hash, and short-hash keys are HASHED
//!    for uniform distribution across the tree.
//! 3. Account FIELD keys (nonce, script hash) and block-hash keys are
//!    deliberately UNHASHED: their first bytes form a prefix sortable by
//!    account id / block number. Do not "uniformize" them by hashing — the
//!    external state layout depends on the raw prefix.
//!
//! The same schema is shared by the witness generator off-chain; the two
//! sides must derive byte-identical keys or every proof fails.

use crate::hash::{Blake2b, Hash, ZERO_HASH};

// ──────────────────────────────────────────────────────────────────────────────
// Domain bytes
// ──────────────────────────────────────────────────────────────────────────────

/// Account KV storage: `H(id_LE32 ‖ 0x00 ‖ user_key)`.
pub const KEY_KIND_ACCOUNT_KV: u8 = 0x00;
/// Account nonce field: `id_LE32 ‖ 0x01 ‖ 0…` — unhashed.
pub const KEY_KIND_ACCOUNT_NONCE: u8 = 0x01;
/// Account script-hash field: `id_LE32 ‖ 0x02 ‖ 0…` — unhashed.
pub const KEY_KIND_ACCOUNT_SCRIPT_HASH: u8 = 0x02;
/// Reverse lookup: `H(0_LE32 ‖ 0x03 ‖ script_hash)`.
pub const KEY_KIND_SCRIPT_HASH_TO_ID: u8 = 0x03;
/// Data-hash presence: `H(0_LE32 ‖ 0x04 ‖ data_hash)`.
pub const KEY_KIND_DATA_HASH: u8 = 0x04;
/// Short-hash alias: `H(0_LE32 ‖ 0x05 ‖ len_LE32 ‖ short_hash)`.
pub const KEY_KIND_SHORT_SCRIPT_HASH: u8 = 0x05;

/// The two unhashed per-account fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Nonce,
    ScriptHash,
}

impl AccountField {
    fn kind(self) -> u8 {
        match self {
            AccountField::Nonce => KEY_KIND_ACCOUNT_NONCE,
            AccountField::ScriptHash => KEY_KIND_ACCOUNT_SCRIPT_HASH,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Key derivation
// ──────────────────────────────────────────────────────────────────────────────

/// Raw key for an account's user KV entry: `H(id_LE32 ‖ 0x00 ‖ user_key)`.
pub fn account_kv_key(account_id: u32, user_key: &[u8]) -> Hash {
    let mut state = Blake2b::new();
    state
        .update(&account_id.to_le_bytes())
        .update(&[KEY_KIND_ACCOUNT_KV])
        .update(user_key);
    state.finalize()
}

/// Raw key for an account field. UNHASHED: bytes 0..4 are the account id in
/// little-endian, byte 4 is the field kind, bytes 5..32 are zero.
pub fn account_field_key(account_id: u32, field: AccountField) -> Hash {
    let mut key = ZERO_HASH;
    key[..4].copy_from_slice(&account_id.to_le_bytes());
    key[4] = field.kind();
    key
}

/// Raw key mapping a script hash back to its account id:
/// `H(0_LE32 ‖ 0x03 ‖ script_hash)`.
pub fn script_hash_to_id_key(script_hash: &Hash) -> Hash {
    reserved_key(KEY_KIND_SCRIPT_HASH_TO_ID, script_hash)
}

/// Raw key recording that a data blob with this hash exists:
/// `H(0_LE32 ‖ 0x04 ‖ data_hash)`.
pub fn data_hash_key(data_hash: &Hash) -> Hash {
    reserved_key(KEY_KIND_DATA_HASH, data_hash)
}

/// Raw key mapping a short script-hash prefix to the full script hash:
/// `H(0_LE32 ‖ 0x05 ‖ len_LE32 ‖ short_hash)`.
pub fn short_script_hash_key(short_hash: &[u8]) -> Hash {
    let mut state = Blake2b::new();
    state
        .update(&0u32.to_le_bytes())
        .update(&[KEY_KIND_SHORT_SCRIPT_HASH])
        .update(&(short_hash.len() as u32).to_le_bytes())
        .update(short_hash);
    state.finalize()
}

/// Raw key for a block hash in the block SMT. UNHASHED: bytes 0..8 are the
/// block number in little-endian, bytes 8..32 are zero.
pub fn block_smt_key(number: u64) -> Hash {
    let mut key = ZERO_HASH;
    key[..8].copy_from_slice(&number.to_le_bytes());
    key
}

/// Keys in the reserved (account 0) namespace: `H(0_LE32 ‖ kind ‖ payload)`.
fn reserved_key(kind: u8, payload: &Hash) -> Hash {
    let mut state = Blake2b::new();
    state
        .update(&0u32.to_le_bytes())
        .update(&[kind])
        .update(payload);
    state.finalize()
}
