//! Rollup Validator — deterministic transaction-challenge verification core.
//!
//! This crate is the on-chain half of an optimistic rollup's fraud-proof
//! machinery. Given a challenged block, a challenged transaction index, and a
//! compact witness (a KV snapshot plus Sparse Merkle Tree proofs), it
//! re-executes the transaction against the witness state and decides whether
//! the block producer's asserted post-state root is correct.
//!
//! INVARIANTS:
//! 1. Determinism is absolute. Two runs on the same witness produce
//!    bit-identical roots, error codes, and receipt bytes. No map with
//!    hash-randomized ordering, no unstable sort, no wall clock.
//! 2. Every buffer has a compile-time upper bound. Overrunning a bound is a
//!    returned `FatalBufferOverflow`, never a panic and never a reallocation.
//! 3. All arithmetic on protocol quantities uses checked_* variants.
//! 4. No floating point. No dynamic dispatch on the verification hot path —
//!    the host seam is a generic parameter, monomorphized per build target.
//! 5. Diagnostics (`log::debug!`) never alter control flow.

pub mod context;
pub mod contracts;
pub mod hash;
pub mod host;
pub mod keys;
pub mod math;
pub mod overlay;
pub mod policy;
pub mod smt;
pub mod sudt;
pub mod wire;

#[cfg(test)]
pub(crate) mod testutil;

use thiserror::Error;

// ──────────────────────────────────────────────────────────────────────────────
// Frozen protocol limits
// ──────────────────────────────────────────────────────────────────────────────

/// Maximum byte length of the program return data (ethereum max contract size).
pub const MAX_RETURN_DATA_SIZE: usize = 24 * 1024;
/// Maximum byte length of a transaction's args field.
pub const MAX_TX_ARGS_SIZE: usize = 128 * 1024;
/// Maximum KV state pairs touched by one transaction.
pub const MAX_KV_PAIRS: usize = 1024;
/// Maximum byte length of an account script.
pub const MAX_SCRIPT_SIZE: usize = 256;
/// Maximum account scripts carried by one witness.
pub const MAX_SCRIPT_ENTRIES: usize = 100;
/// Maximum byte length of the serialized rollup config.
pub const MAX_ROLLUP_CONFIG_SIZE: usize = 4 * 1024;
/// Maximum byte length of one witness blob.
pub const MAX_WITNESS_SIZE: usize = 300 * 1024;
/// Maximum byte length of one compact SMT proof.
pub const MAX_KV_PROOF_SIZE: usize = 4 * 1024;
/// How far back `get_block_hash` may reach from the challenged block.
pub const MAX_GET_BLOCK_HASH_DEPTH: usize = 256;

// ──────────────────────────────────────────────────────────────────────────────
// Error space
// ──────────────────────────────────────────────────────────────────────────────

/// The canonical error type for all verification failures.
///
/// Discriminants are FROZEN protocol values: the first non-zero code
/// short-circuits to the host exit code, and off-chain tooling matches on the
/// numeric value. Success is the absence of an error (`Ok(())` → exit 0).
///
/// Codes below 50 are recoverable — an executed contract may observe them and
/// continue (e.g. `NotFound` from a balance lookup). Codes 50 and above are
/// fatal and must propagate to the host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(i8)]
pub enum ErrorCode {
    /// Key absent from the overlay.
    #[error("key not found")]
    NotFound = 10,
    /// The account's script-hash field is the zero hash.
    #[error("account does not exist")]
    AccountNotExists = 11,
    /// Script code-hash is in neither the EOA nor the contract allow-list.
    #[error("unknown script code hash")]
    UnknownScriptCodeHash = 12,
    /// Contract script args do not begin with the rollup script hash.
    #[error("invalid contract script")]
    InvalidContractScript = 13,
    /// No script entry matches the requested short-hash prefix.
    /// Split from `FatalInvalidContext`: a prefix miss is an answer, not a
    /// missing-witness condition.
    #[error("no script matches prefix")]
    ScriptNotFound = 14,

    /// Sender balance is below the transfer amount.
    #[error("insufficient balance")]
    InsufficientBalance = 20,
    /// Balance arithmetic crossed the 2^256 boundary.
    #[error("amount overflow")]
    AmountOverflow = 21,
    /// Registry address length is out of the accepted range.
    #[error("invalid short address length")]
    ShortAddrLen = 22,

    /// SMT proof under- or over-ran its 32-entry stack.
    #[error("smt: invalid stack")]
    InvalidStack = 30,
    /// SMT merge of two nodes that are not siblings at the stated height.
    #[error("smt: invalid sibling")]
    InvalidSibling = 31,
    /// SMT proof malformed, unconsumed leaves, or root mismatch.
    #[error("smt: invalid proof")]
    InvalidProof = 32,

    #[error("fatal: invalid context")]
    FatalInvalidContext = 50,
    #[error("fatal: invalid data")]
    FatalInvalidData = 51,
    #[error("fatal: buffer overflow")]
    FatalBufferOverflow = 52,
    #[error("fatal: account not found")]
    FatalAccountNotFound = 53,
    #[error("fatal: data cell not found")]
    FatalDataCellNotFound = 54,
    #[error("fatal: signature cell not found")]
    FatalSignatureCellNotFound = 55,
    #[error("fatal: return data hash mismatch")]
    FatalMismatchReturnData = 56,
    #[error("fatal: invalid sUDT script")]
    FatalInvalidSudtScript = 57,
    #[error("fatal: unknown contract args")]
    FatalUnknownArgs = 58,
}

impl ErrorCode {
    /// The host exit code for this error.
    pub fn exit_code(self) -> i8 {
        self as i8
    }

    /// Fatal errors terminate the program unconditionally; recoverable ones
    /// may be observed by the executed contract. SMT errors (3x) surface only
    /// from root checks and are terminal in practice, but are kept out of the
    /// fatal class so the numeric space stays stable.
    pub fn is_fatal(self) -> bool {
        self as i8 >= 50
    }
}
