//! Structured-binary wire schema reader.
//!
//! The witness, block header, transactions, and rollup config arrive in the
//! host chain's canonical tag-length-value encoding. Four composition rules
//! cover every entity:
//!
//! - **struct**  — fixed-width fields concatenated, no header.
//! - **table**   — `full_size:u32le ‖ offsets[n]:u32le ‖ payloads`. Offsets
//!   are absolute within the table, non-decreasing, and the header itself
//!   fixes `n` (`offsets[0] == 4 + 4n`).
//! - **fixvec**  — `count:u32le ‖ items` with a fixed item width. `Bytes` is
//!   the item-width-1 case.
//! - **dynvec**  — like a table, but the count is carried by the header
//!   rather than the schema.
//! - **option**  — empty buffer = absent; otherwise the payload itself.
//! - **union**   — `item_id:u32le ‖ payload`.
//!
//! Every reader here is total: truncation, inconsistent offsets, and
//! out-of-schema sizes surface as `FatalInvalidData`, never as a panic or an
//! out-of-bounds read. Readers borrow from the input buffer; nothing is
//! copied until the loader moves fields into its bounded context buffers.

use crate::hash::Hash;
use crate::ErrorCode;

// ──────────────────────────────────────────────────────────────────────────────
// Composition primitives
// ──────────────────────────────────────────────────────────────────────────────

fn u32le(buf: &[u8], offset: usize) -> Result<u32, ErrorCode> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or(ErrorCode::FatalInvalidData)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn u64le(buf: &[u8], offset: usize) -> Result<u64, ErrorCode> {
    let bytes = buf
        .get(offset..offset + 8)
        .ok_or(ErrorCode::FatalInvalidData)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(raw))
}

fn hash_at(buf: &[u8], offset: usize) -> Result<Hash, ErrorCode> {
    let bytes = buf
        .get(offset..offset + 32)
        .ok_or(ErrorCode::FatalInvalidData)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

fn expect_len(buf: &[u8], len: usize) -> Result<(), ErrorCode> {
    if buf.len() != len {
        log::debug!("wire: fixed struct length {} != expected {len}", buf.len());
        return Err(ErrorCode::FatalInvalidData);
    }
    Ok(())
}

/// Split a table buffer into its `N` field payloads.
fn table<const N: usize>(buf: &[u8]) -> Result<[&[u8]; N], ErrorCode> {
    let full_size = u32le(buf, 0)? as usize;
    if full_size != buf.len() {
        return Err(ErrorCode::FatalInvalidData);
    }
    let header_end = 4 + 4 * N;
    if N == 0 || full_size < header_end {
        return Err(ErrorCode::FatalInvalidData);
    }
    // The first offset pins the field count; a table with a different count
    // is a schema violation, not a forward-compatible extension.
    if u32le(buf, 4)? as usize != header_end {
        return Err(ErrorCode::FatalInvalidData);
    }

    let mut fields = [&buf[0..0]; N];
    let mut previous_end = full_size;
    // Walk backwards so each field's end is the next field's start.
    for i in (0..N).rev() {
        let start = u32le(buf, 4 + 4 * i)? as usize;
        if start > previous_end || previous_end > full_size {
            return Err(ErrorCode::FatalInvalidData);
        }
        fields[i] = &buf[start..previous_end];
        previous_end = start;
    }
    Ok(fields)
}

/// A vector of fixed-width items.
#[derive(Debug, Clone, Copy)]
pub struct FixVec<'a> {
    body: &'a [u8],
    item_size: usize,
}

impl<'a> FixVec<'a> {
    fn parse(buf: &'a [u8], item_size: usize) -> Result<Self, ErrorCode> {
        let count = u32le(buf, 0)? as usize;
        let body = &buf[4..];
        if body.len() != count.checked_mul(item_size).ok_or(ErrorCode::FatalInvalidData)? {
            return Err(ErrorCode::FatalInvalidData);
        }
        Ok(FixVec { body, item_size })
    }

    pub fn len(&self) -> usize {
        self.body.len() / self.item_size
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&'a [u8], ErrorCode> {
        let start = index
            .checked_mul(self.item_size)
            .ok_or(ErrorCode::FatalInvalidData)?;
        self.body
            .get(start..start + self.item_size)
            .ok_or(ErrorCode::FatalInvalidData)
    }
}

/// `Bytes` — a fixvec of single bytes.
fn bytes_body(buf: &[u8]) -> Result<&[u8], ErrorCode> {
    let v = FixVec::parse(buf, 1)?;
    Ok(v.body)
}

/// A vector of variable-width items (offset table header).
#[derive(Debug, Clone, Copy)]
pub struct DynVec<'a> {
    buf: &'a [u8],
    count: usize,
}

impl<'a> DynVec<'a> {
    fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let full_size = u32le(buf, 0)? as usize;
        if full_size != buf.len() {
            return Err(ErrorCode::FatalInvalidData);
        }
        if full_size == 4 {
            return Ok(DynVec { buf, count: 0 });
        }
        let first = u32le(buf, 4)? as usize;
        if first < 8 || first % 4 != 0 || first > full_size {
            return Err(ErrorCode::FatalInvalidData);
        }
        let count = (first - 4) / 4;
        // Validate monotonicity once so `get` stays cheap.
        let mut previous = first;
        for i in 1..count {
            let offset = u32le(buf, 4 + 4 * i)? as usize;
            if offset < previous || offset > full_size {
                return Err(ErrorCode::FatalInvalidData);
            }
            previous = offset;
        }
        Ok(DynVec { buf, count })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Result<&'a [u8], ErrorCode> {
        if index >= self.count {
            return Err(ErrorCode::FatalInvalidData);
        }
        let start = u32le(self.buf, 4 + 4 * index)? as usize;
        let end = if index + 1 < self.count {
            u32le(self.buf, 4 + 4 * (index + 1))? as usize
        } else {
            self.buf.len()
        };
        self.buf.get(start..end).ok_or(ErrorCode::FatalInvalidData)
    }
}

/// An optional field: an empty buffer means absent.
fn option(buf: &[u8]) -> Option<&[u8]> {
    if buf.is_empty() {
        None
    } else {
        Some(buf)
    }
}

fn union(buf: &[u8]) -> Result<(u32, &[u8]), ErrorCode> {
    let id = u32le(buf, 0)?;
    Ok((id, &buf[4..]))
}

/// A vector of 32-byte hashes.
#[derive(Debug, Clone, Copy)]
pub struct Byte32Vec<'a>(FixVec<'a>);

impl<'a> Byte32Vec<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        Ok(Byte32Vec(FixVec::parse(buf, 32)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Hash, ErrorCode> {
        hash_at(self.0.get(index)?, 0)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        (0..self.len()).any(|i| self.get(i).map(|h| &h == hash).unwrap_or(false))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Chain entities
// ──────────────────────────────────────────────────────────────────────────────

/// `hash_type` value binding a script to a type-script hash.
pub const SCRIPT_HASH_TYPE_TYPE: u8 = 1;

/// An account or lock script: `table(code_hash: 32, hash_type: u8, args: Bytes)`.
#[derive(Debug, Clone, Copy)]
pub struct Script<'a> {
    pub code_hash: Hash,
    pub hash_type: u8,
    pub args: &'a [u8],
}

impl<'a> Script<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [code_hash, hash_type, args] = table::<3>(buf)?;
        expect_len(code_hash, 32)?;
        expect_len(hash_type, 1)?;
        Ok(Script {
            code_hash: hash_at(code_hash, 0)?,
            hash_type: hash_type[0],
            args: bytes_body(args)?,
        })
    }
}

/// Per-input witness envelope: `table(lock?, input_type?, output_type?)`,
/// each an optional `Bytes`.
#[derive(Debug, Clone, Copy)]
pub struct WitnessArgs<'a> {
    pub lock: Option<&'a [u8]>,
    pub input_type: Option<&'a [u8]>,
    pub output_type: Option<&'a [u8]>,
}

impl<'a> WitnessArgs<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [lock, input_type, output_type] = table::<3>(buf)?;
        let unwrap_bytes = |field: &'a [u8]| -> Result<Option<&'a [u8]>, ErrorCode> {
            option(field).map(bytes_body).transpose()
        };
        Ok(WitnessArgs {
            lock: unwrap_bytes(lock)?,
            input_type: unwrap_bytes(input_type)?,
            output_type: unwrap_bytes(output_type)?,
        })
    }
}

/// A commitment to the account SMT: `struct(merkle_root: 32, count: u32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMerkleState {
    pub merkle_root: Hash,
    pub count: u32,
}

impl AccountMerkleState {
    pub const WIRE_SIZE: usize = 36;

    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        expect_len(buf, Self::WIRE_SIZE)?;
        Ok(AccountMerkleState {
            merkle_root: hash_at(buf, 0)?,
            count: u32le(buf, 32)?,
        })
    }
}

/// The rollup cell's data. Fixed struct:
/// `account(36) ‖ block_root(32) ‖ block_count(8) ‖ reverted_block_root(32)
///  ‖ tip_block_hash(32) ‖ last_finalized_block_number(8)
///  ‖ rollup_config_hash(32) ‖ status(1)`.
#[derive(Debug, Clone, Copy)]
pub struct GlobalState {
    pub account: AccountMerkleState,
    pub block_merkle_root: Hash,
    pub block_count: u64,
    pub reverted_block_root: Hash,
    pub tip_block_hash: Hash,
    pub last_finalized_block_number: u64,
    pub rollup_config_hash: Hash,
    pub status: u8,
}

impl GlobalState {
    pub const WIRE_SIZE: usize = 181;

    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        expect_len(buf, Self::WIRE_SIZE)?;
        Ok(GlobalState {
            account: AccountMerkleState::parse(&buf[0..36])?,
            block_merkle_root: hash_at(buf, 36)?,
            block_count: u64le(buf, 68)?,
            reverted_block_root: hash_at(buf, 76)?,
            tip_block_hash: hash_at(buf, 108)?,
            last_finalized_block_number: u64le(buf, 140)?,
            rollup_config_hash: hash_at(buf, 148)?,
            status: buf[180],
        })
    }
}

/// The rollup's governing parameters:
/// `table(challenge_script_type_hash: 32, l2_sudt_validator_script_type_hash: 32,
///        finality_blocks: u64, allowed_eoa_type_hashes: Byte32Vec,
///        allowed_contract_type_hashes: Byte32Vec)`.
#[derive(Debug, Clone, Copy)]
pub struct RollupConfig<'a> {
    pub challenge_script_type_hash: Hash,
    pub l2_sudt_validator_script_type_hash: Hash,
    pub finality_blocks: u64,
    pub allowed_eoa_type_hashes: Byte32Vec<'a>,
    pub allowed_contract_type_hashes: Byte32Vec<'a>,
}

impl<'a> RollupConfig<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [challenge, sudt, finality, eoa, contract] = table::<5>(buf)?;
        expect_len(challenge, 32)?;
        expect_len(sudt, 32)?;
        expect_len(finality, 8)?;
        Ok(RollupConfig {
            challenge_script_type_hash: hash_at(challenge, 0)?,
            l2_sudt_validator_script_type_hash: hash_at(sudt, 0)?,
            finality_blocks: u64le(finality, 0)?,
            allowed_eoa_type_hashes: Byte32Vec::parse(eoa)?,
            allowed_contract_type_hashes: Byte32Vec::parse(contract)?,
        })
    }
}

/// Challenge target kind accepted by this verifier.
pub const TARGET_TYPE_TRANSACTION: u8 = 0;

/// What a challenge points at:
/// `struct(block_hash: 32, target_index: u32, target_type: u8)`.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeTarget {
    pub block_hash: Hash,
    pub target_index: u32,
    pub target_type: u8,
}

impl ChallengeTarget {
    pub const WIRE_SIZE: usize = 37;

    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        expect_len(buf, Self::WIRE_SIZE)?;
        Ok(ChallengeTarget {
            block_hash: hash_at(buf, 0)?,
            target_index: u32le(buf, 32)?,
            target_type: buf[36],
        })
    }
}

/// The challenge cell's lock args (after the rollup script hash prefix):
/// `table(target: ChallengeTarget, rewards_receiver_lock: Script)`.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeLockArgs<'a> {
    pub target: ChallengeTarget,
    /// Carried for the reward path, unused during verification.
    pub rewards_receiver_lock: &'a [u8],
}

impl<'a> ChallengeLockArgs<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [target, rewards_receiver_lock] = table::<2>(buf)?;
        Ok(ChallengeLockArgs {
            target: ChallengeTarget::parse(target)?,
            rewards_receiver_lock,
        })
    }
}

/// The executable payload of a transaction:
/// `table(from_id: u32, to_id: u32, nonce: u32, args: Bytes)`.
#[derive(Debug, Clone, Copy)]
pub struct RawL2Transaction<'a> {
    pub from_id: u32,
    pub to_id: u32,
    pub nonce: u32,
    pub args: &'a [u8],
}

impl<'a> RawL2Transaction<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [from_id, to_id, nonce, args] = table::<4>(buf)?;
        expect_len(from_id, 4)?;
        expect_len(to_id, 4)?;
        expect_len(nonce, 4)?;
        Ok(RawL2Transaction {
            from_id: u32le(from_id, 0)?,
            to_id: u32le(to_id, 0)?,
            nonce: u32le(nonce, 0)?,
            args: bytes_body(args)?,
        })
    }
}

/// A signed transaction: `table(raw: RawL2Transaction, signature: Bytes)`.
#[derive(Debug, Clone, Copy)]
pub struct L2Transaction<'a> {
    pub raw: &'a [u8],
    pub signature: &'a [u8],
}

impl<'a> L2Transaction<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [raw, signature] = table::<2>(buf)?;
        // Validate the nested payload eagerly so later reparses cannot fail.
        RawL2Transaction::parse(raw)?;
        Ok(L2Transaction {
            raw,
            signature: bytes_body(signature)?,
        })
    }
}

/// `struct(tx_witness_root: 32, tx_count: u32, prev_state_checkpoint: 32)`.
#[derive(Debug, Clone, Copy)]
pub struct SubmitTransactions {
    pub tx_witness_root: Hash,
    pub tx_count: u32,
    pub prev_state_checkpoint: Hash,
}

impl SubmitTransactions {
    pub const WIRE_SIZE: usize = 68;

    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        expect_len(buf, Self::WIRE_SIZE)?;
        Ok(SubmitTransactions {
            tx_witness_root: hash_at(buf, 0)?,
            tx_count: u32le(buf, 32)?,
            prev_state_checkpoint: hash_at(buf, 36)?,
        })
    }
}

/// `struct(withdrawal_witness_root: 32, withdrawal_count: u32)`.
#[derive(Debug, Clone, Copy)]
pub struct SubmitWithdrawals {
    pub withdrawal_witness_root: Hash,
    pub withdrawal_count: u32,
}

impl SubmitWithdrawals {
    pub const WIRE_SIZE: usize = 36;

    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        expect_len(buf, Self::WIRE_SIZE)?;
        Ok(SubmitWithdrawals {
            withdrawal_witness_root: hash_at(buf, 0)?,
            withdrawal_count: u32le(buf, 32)?,
        })
    }
}

/// The challenged block's header:
/// `table(number: u64, block_producer_id: u32, parent_block_hash: 32,
///        stake_cell_owner_lock_hash: 32, timestamp: u64,
///        prev_account: AccountMerkleState, post_account: AccountMerkleState,
///        submit_transactions: SubmitTransactions,
///        submit_withdrawals: SubmitWithdrawals,
///        state_checkpoint_list: Byte32Vec)`.
#[derive(Debug, Clone, Copy)]
pub struct RawL2Block<'a> {
    pub number: u64,
    pub block_producer_id: u32,
    pub parent_block_hash: Hash,
    pub stake_cell_owner_lock_hash: Hash,
    pub timestamp: u64,
    pub prev_account: AccountMerkleState,
    pub post_account: AccountMerkleState,
    pub submit_transactions: SubmitTransactions,
    pub submit_withdrawals: SubmitWithdrawals,
    pub state_checkpoint_list: Byte32Vec<'a>,
}

impl<'a> RawL2Block<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [number, producer, parent, stake_owner, timestamp, prev_account, post_account, submit_txs, submit_withdrawals, checkpoints] =
            table::<10>(buf)?;
        expect_len(number, 8)?;
        expect_len(producer, 4)?;
        expect_len(parent, 32)?;
        expect_len(stake_owner, 32)?;
        expect_len(timestamp, 8)?;
        Ok(RawL2Block {
            number: u64le(number, 0)?,
            block_producer_id: u32le(producer, 0)?,
            parent_block_hash: hash_at(parent, 0)?,
            stake_cell_owner_lock_hash: hash_at(stake_owner, 0)?,
            timestamp: u64le(timestamp, 0)?,
            prev_account: AccountMerkleState::parse(prev_account)?,
            post_account: AccountMerkleState::parse(post_account)?,
            submit_transactions: SubmitTransactions::parse(submit_txs)?,
            submit_withdrawals: SubmitWithdrawals::parse(submit_withdrawals)?,
            state_checkpoint_list: Byte32Vec::parse(checkpoints)?,
        })
    }
}

/// `struct(k: 32, v: 32)`; carried as a fixvec of 64-byte items.
#[derive(Debug, Clone, Copy)]
pub struct KvPairVec<'a>(FixVec<'a>);

impl<'a> KvPairVec<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        Ok(KvPairVec(FixVec::parse(buf, 64)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<(Hash, Hash), ErrorCode> {
        let item = self.0.get(index)?;
        Ok((hash_at(item, 0)?, hash_at(item, 32)?))
    }
}

/// `struct(number: u64, hash: 32)`; carried as a fixvec of 40-byte items.
#[derive(Debug, Clone, Copy)]
pub struct BlockHashEntryVec<'a>(FixVec<'a>);

impl<'a> BlockHashEntryVec<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        Ok(BlockHashEntryVec(FixVec::parse(buf, 40)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<(u64, Hash), ErrorCode> {
        let item = self.0.get(index)?;
        Ok((u64le(item, 0)?, hash_at(item, 8)?))
    }
}

/// The witness sub-structure carrying state context:
/// `table(kv_state: KVPairVec, scripts: ScriptVec, return_data_hash: 32,
///        block_hashes: BlockHashEntryVec)`.
#[derive(Debug, Clone, Copy)]
pub struct VerifyTransactionContext<'a> {
    pub kv_state: KvPairVec<'a>,
    pub scripts: DynVec<'a>,
    pub return_data_hash: Hash,
    pub block_hashes: BlockHashEntryVec<'a>,
}

impl<'a> VerifyTransactionContext<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [kv_state, scripts, return_data_hash, block_hashes] = table::<4>(buf)?;
        expect_len(return_data_hash, 32)?;
        Ok(VerifyTransactionContext {
            kv_state: KvPairVec::parse(kv_state)?,
            scripts: DynVec::parse(scripts)?,
            return_data_hash: hash_at(return_data_hash, 0)?,
            block_hashes: BlockHashEntryVec::parse(block_hashes)?,
        })
    }
}

/// The top-level challenge witness:
/// `table(raw_l2block: RawL2Block, l2tx: L2Transaction, tx_proof: Bytes,
///        kv_state_proof: Bytes, block_hashes_proof: Bytes,
///        context: VerifyTransactionContext)`.
#[derive(Debug, Clone, Copy)]
pub struct VerifyTransactionWitness<'a> {
    pub raw_l2block: &'a [u8],
    pub l2tx: &'a [u8],
    pub tx_proof: &'a [u8],
    pub kv_state_proof: &'a [u8],
    pub block_hashes_proof: &'a [u8],
    pub context: VerifyTransactionContext<'a>,
}

impl<'a> VerifyTransactionWitness<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let [raw_l2block, l2tx, tx_proof, kv_state_proof, block_hashes_proof, context] =
            table::<6>(buf)?;
        // Validate nested structures eagerly.
        RawL2Block::parse(raw_l2block)?;
        L2Transaction::parse(l2tx)?;
        Ok(VerifyTransactionWitness {
            raw_l2block,
            l2tx,
            tx_proof: bytes_body(tx_proof)?,
            kv_state_proof: bytes_body(kv_state_proof)?,
            block_hashes_proof: bytes_body(block_hashes_proof)?,
            context: VerifyTransactionContext::parse(context)?,
        })
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Built-in contract argument unions
// ──────────────────────────────────────────────────────────────────────────────

/// Meta-contract messages: `union { 0: CreateAccount }` where
/// `CreateAccount = table(script: Script, fee: u64)`.
#[derive(Debug, Clone, Copy)]
pub enum MetaContractArgs<'a> {
    CreateAccount { script: &'a [u8], fee: u64 },
}

impl<'a> MetaContractArgs<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let (id, payload) = union(buf)?;
        match id {
            0 => {
                let [script, fee] = table::<2>(payload)?;
                expect_len(fee, 8)?;
                Script::parse(script)?;
                Ok(MetaContractArgs::CreateAccount {
                    script,
                    fee: u64le(fee, 0)?,
                })
            }
            _ => Err(ErrorCode::FatalUnknownArgs),
        }
    }
}

/// sUDT messages: `union { 0: Query, 1: Transfer }` where
/// `Query = table(address: Bytes)` and
/// `Transfer = table(to: Bytes, amount: 32 LE, fee: 32 LE)`.
#[derive(Debug, Clone, Copy)]
pub enum SudtArgs<'a> {
    Query { address: &'a [u8] },
    Transfer { to: &'a [u8], amount: [u8; 32], fee: [u8; 32] },
}

impl<'a> SudtArgs<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, ErrorCode> {
        let (id, payload) = union(buf)?;
        match id {
            0 => {
                let [address] = table::<1>(payload)?;
                Ok(SudtArgs::Query {
                    address: bytes_body(address)?,
                })
            }
            1 => {
                let [to, amount, fee] = table::<3>(payload)?;
                expect_len(amount, 32)?;
                expect_len(fee, 32)?;
                Ok(SudtArgs::Transfer {
                    to: bytes_body(to)?,
                    amount: hash_at(amount, 0)?,
                    fee: hash_at(fee, 0)?,
                })
            }
            _ => Err(ErrorCode::FatalUnknownArgs),
        }
    }
}

/// Byte length of an ethereum-style address.
pub const ETH_ADDRESS_LEN: usize = 20;

/// Address-registry messages: `union { 0: EthToGw(20), 1: GwToEth(32) }`.
#[derive(Debug, Clone, Copy)]
pub enum EthAddrRegArgs {
    EthToGw { eth_address: [u8; ETH_ADDRESS_LEN] },
    GwToEth { script_hash: Hash },
}

impl EthAddrRegArgs {
    pub fn parse(buf: &[u8]) -> Result<Self, ErrorCode> {
        let (id, payload) = union(buf)?;
        match id {
            0 => {
                expect_len(payload, ETH_ADDRESS_LEN)?;
                let mut eth_address = [0u8; ETH_ADDRESS_LEN];
                eth_address.copy_from_slice(payload);
                Ok(EthAddrRegArgs::EthToGw { eth_address })
            }
            1 => {
                expect_len(payload, 32)?;
                Ok(EthAddrRegArgs::GwToEth {
                    script_hash: hash_at(payload, 0)?,
                })
            }
            _ => Err(ErrorCode::FatalUnknownArgs),
        }
    }
}
