//! The verification context — witness loading, the syscall surface, and the
//! init/finalize lifecycle.
//!
//! # What This Is
//!
//! One by-value struct holding every buffer a single verification run needs:
//! the transaction, the block info, the KV overlay, the block-hash snapshot,
//! the script table, the SMT proof, and the receipt. The context is created
//! on the stack, lives for one run, and is discarded — there is no shared
//! mutable state between runs and no heap allocation.
//!
//! # Execution Sequence (Frozen)
//!
//! ```text
//! init:
//!  1. Owner unlock — our cell's data names an owner lock hash; some input
//!     must carry that lock.
//!  2. Rollup identity — first 32 bytes of our script args.
//!  3. Locate the rollup cell by type hash. Absent → NotInChallenge (the
//!     entry point exits 0 without consulting the witness).
//!  4. Global state from the rollup cell; rollup config from a dep cell
//!     matched by data hash.
//!  5. Locate the challenge cell by lock; decode ChallengeLockArgs; only
//!     transaction targets are accepted.
//!  6. Decode the witness; verify the block hash, the challenged
//!     transaction's membership, and the block-hash snapshot.
//!  7. Load checkpoints, pre/post account states, KV pairs, scripts.
//!  8. normalize + verify the KV snapshot against the PRE-state root.
//!  9. Bootstrap the sender's nonce.
//!
//! finalize:
//!  1. post_account.count == account_count.
//!  2. Sender-nonce policy (see `increase_sender_nonce`).
//!  3. blake2b(receipt) == committed return-data hash.
//!  4. normalize + verify the KV overlay against the POST-state root.
//! ```
//!
//! A successful `finalize` means the challenger has failed: the producer's
//! post-root is consistent with correct execution.

use crate::hash::{blake2b, is_zero_hash, Hash, ZERO_HASH};
use crate::host::{find_cell_by_data_hash, find_cell_by_type_hash, ChainHost, HostError, Source};
use crate::keys::{account_field_key, account_kv_key, block_smt_key, data_hash_key, script_hash_to_id_key, AccountField};
use crate::math::U256;
use crate::overlay::{BlockHashState, KvState, TxKvState};
use crate::policy::check_account_script_allowed;
use crate::smt;
use crate::wire::{
    ChallengeLockArgs, GlobalState, L2Transaction, RawL2Block, RawL2Transaction, RollupConfig,
    Script, VerifyTransactionWitness, WitnessArgs, SCRIPT_HASH_TYPE_TYPE,
    TARGET_TYPE_TRANSACTION,
};
use crate::ErrorCode;
use crate::{
    MAX_GET_BLOCK_HASH_DEPTH, MAX_KV_PAIRS, MAX_KV_PROOF_SIZE, MAX_RETURN_DATA_SIZE,
    MAX_ROLLUP_CONFIG_SIZE, MAX_SCRIPT_ENTRIES, MAX_SCRIPT_SIZE, MAX_TX_ARGS_SIZE,
    MAX_WITNESS_SIZE,
};

// ──────────────────────────────────────────────────────────────────────────────
// Context value types
// ──────────────────────────────────────────────────────────────────────────────

/// The challenged transaction, immutable for the duration of a run.
pub struct TransactionContext {
    pub from_id: u32,
    pub to_id: u32,
    args: [u8; MAX_TX_ARGS_SIZE],
    args_len: u32,
}

impl TransactionContext {
    pub fn args(&self) -> &[u8] {
        &self.args[..self.args_len as usize]
    }
}

/// The challenged block's execution environment, immutable for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub block_producer_id: u32,
}

/// One witness-provided account script, addressable by hash or prefix.
#[derive(Clone, Copy)]
struct ScriptEntry {
    hash: Hash,
    script: [u8; MAX_SCRIPT_SIZE],
    script_len: u32,
}

impl ScriptEntry {
    const EMPTY: ScriptEntry = ScriptEntry {
        hash: ZERO_HASH,
        script: [0; MAX_SCRIPT_SIZE],
        script_len: 0,
    };

    fn script(&self) -> &[u8] {
        &self.script[..self.script_len as usize]
    }
}

/// The program's return data, written exactly once by the executed program.
pub struct Receipt {
    return_data: [u8; MAX_RETURN_DATA_SIZE],
    return_data_len: u32,
}

impl Receipt {
    pub fn return_data(&self) -> &[u8] {
        &self.return_data[..self.return_data_len as usize]
    }
}

/// A witness-provided commitment to the account SMT.
pub use crate::wire::AccountMerkleState;

/// What `init` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// No input carries the rollup type hash: this verifier is not being
    /// used for a challenge and has no obligation. Exit 0.
    NotInChallenge,
    /// The witness checked out against the pre-state root; the transaction
    /// may now be executed against the overlay.
    Ready,
}

// ──────────────────────────────────────────────────────────────────────────────
// The context
// ──────────────────────────────────────────────────────────────────────────────

/// All state for one verification run. Generic over the host so dispatch is
/// monomorphized — no function-pointer table, no `dyn`.
pub struct Context<H> {
    host: H,

    rollup_script_hash: Hash,
    rollup_config: [u8; MAX_ROLLUP_CONFIG_SIZE],
    rollup_config_len: u32,

    pub transaction: TransactionContext,
    pub block_info: BlockInfo,

    prev_account: AccountMerkleState,
    post_account: AccountMerkleState,

    tx_index: u32,
    original_sender_nonce: u32,

    prev_tx_checkpoint: Hash,
    post_tx_checkpoint: Hash,

    kv_state: TxKvState,
    block_hashes: BlockHashState,

    kv_state_proof: [u8; MAX_KV_PROOF_SIZE],
    kv_state_proof_len: u32,

    account_count: u32,

    scripts: [ScriptEntry; MAX_SCRIPT_ENTRIES],
    script_entries: u32,

    return_data_hash: Hash,
    receipt: Receipt,
}

impl<H: ChainHost> Context<H> {
    pub fn new(host: H) -> Self {
        Context {
            host,
            rollup_script_hash: ZERO_HASH,
            rollup_config: [0; MAX_ROLLUP_CONFIG_SIZE],
            rollup_config_len: 0,
            transaction: TransactionContext {
                from_id: 0,
                to_id: 0,
                args: [0; MAX_TX_ARGS_SIZE],
                args_len: 0,
            },
            block_info: BlockInfo {
                number: 0,
                timestamp: 0,
                block_producer_id: 0,
            },
            prev_account: AccountMerkleState {
                merkle_root: ZERO_HASH,
                count: 0,
            },
            post_account: AccountMerkleState {
                merkle_root: ZERO_HASH,
                count: 0,
            },
            tx_index: 0,
            original_sender_nonce: 0,
            prev_tx_checkpoint: ZERO_HASH,
            post_tx_checkpoint: ZERO_HASH,
            kv_state: KvState::new(),
            block_hashes: KvState::new(),
            kv_state_proof: [0; MAX_KV_PROOF_SIZE],
            kv_state_proof_len: 0,
            account_count: 0,
            scripts: [ScriptEntry::EMPTY; MAX_SCRIPT_ENTRIES],
            script_entries: 0,
            return_data_hash: ZERO_HASH,
            receipt: Receipt {
                return_data: [0; MAX_RETURN_DATA_SIZE],
                return_data_len: 0,
            },
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn rollup_script_hash(&self) -> &Hash {
        &self.rollup_script_hash
    }

    /// The cached rollup config. Parsed on demand; structural validity was
    /// established during `init`.
    pub fn rollup_config(&self) -> Result<RollupConfig<'_>, ErrorCode> {
        RollupConfig::parse(&self.rollup_config[..self.rollup_config_len as usize])
    }

    pub fn account_count(&self) -> u32 {
        self.account_count
    }

    pub fn original_sender_nonce(&self) -> u32 {
        self.original_sender_nonce
    }

    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    pub fn prev_tx_checkpoint(&self) -> &Hash {
        &self.prev_tx_checkpoint
    }

    pub fn post_tx_checkpoint(&self) -> &Hash {
        &self.post_tx_checkpoint
    }

    pub fn prev_account(&self) -> &AccountMerkleState {
        &self.prev_account
    }

    pub fn post_account(&self) -> &AccountMerkleState {
        &self.post_account
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Load and verify the challenge context. See the module docs for the
    /// frozen sequence.
    pub fn init(&mut self) -> Result<InitOutcome, ErrorCode> {
        // ── Step 1: Owner unlock ──────────────────────────────────────────────
        check_owner_lock(&self.host)?;

        // ── Step 2: Rollup identity ───────────────────────────────────────────
        self.rollup_script_hash = load_rollup_script_hash(&self.host)?;

        // ── Step 3: Locate the rollup cell ────────────────────────────────────
        let Some(rollup_cell_index) =
            find_cell_by_type_hash(&self.host, &self.rollup_script_hash, Source::Input)
        else {
            log::debug!("no rollup cell among inputs: not in a challenge");
            return Ok(InitOutcome::NotInChallenge);
        };

        // ── Steps 4–5: Global state, config, challenge cell ───────────────────
        let scope = load_verification_scope(
            &self.host,
            rollup_cell_index,
            &self.rollup_script_hash,
            &mut self.rollup_config,
            &mut self.rollup_config_len,
        )?;
        self.tx_index = scope.tx_index;

        // ── Step 6: Decode and verify the witness ─────────────────────────────
        let witness_bytes = self
            .host
            .witness(Source::Input, scope.challenge_cell_index)
            .map_err(|_| ErrorCode::FatalInvalidData)?;
        if witness_bytes.len() > MAX_WITNESS_SIZE {
            return Err(ErrorCode::FatalBufferOverflow);
        }
        let witness_args = WitnessArgs::parse(witness_bytes)?;
        let Some(witness_lock) = witness_args.lock else {
            log::debug!("challenge witness has no lock field");
            return Err(ErrorCode::FatalInvalidData);
        };
        let witness = VerifyTransactionWitness::parse(witness_lock)?;
        let raw_block = RawL2Block::parse(witness.raw_l2block)?;

        // The witness must describe the challenged block, bit for bit.
        if blake2b(witness.raw_l2block) != scope.challenged_block_hash {
            log::debug!("block hash mismatched with challenged block hash");
            return Err(ErrorCode::FatalInvalidData);
        }

        // The challenged transaction must be the leaf at tx_index of the
        // block's transaction witness root.
        let tx_witness_hash = blake2b(witness.l2tx);
        let mut tx_key = ZERO_HASH;
        tx_key[..4].copy_from_slice(&self.tx_index.to_le_bytes());
        let mut txs_state: KvState<1> = KvState::new();
        txs_state.insert(&tx_key, &tx_witness_hash)?;
        txs_state.normalize();
        smt::verify(
            &raw_block.submit_transactions.tx_witness_root,
            txs_state.pairs(),
            witness.tx_proof,
        )?;

        // Transaction context.
        let l2tx = L2Transaction::parse(witness.l2tx)?;
        let raw_tx = RawL2Transaction::parse(l2tx.raw)?;
        if raw_tx.args.len() > MAX_TX_ARGS_SIZE {
            return Err(ErrorCode::FatalInvalidData);
        }
        self.transaction.from_id = raw_tx.from_id;
        self.transaction.to_id = raw_tx.to_id;
        self.transaction.args[..raw_tx.args.len()].copy_from_slice(raw_tx.args);
        self.transaction.args_len = raw_tx.args.len() as u32;

        // Block info.
        self.block_info = BlockInfo {
            number: raw_block.number,
            timestamp: raw_block.timestamp,
            block_producer_id: raw_block.block_producer_id,
        };

        // Block-hash snapshot: every entry must fall inside the reachable
        // window, and the set must verify against the block SMT root.
        let max_block_number = raw_block.number.saturating_sub(1);
        let min_block_number = raw_block
            .number
            .saturating_sub(MAX_GET_BLOCK_HASH_DEPTH as u64);
        for i in 0..witness.context.block_hashes.len() {
            let (number, hash) = witness.context.block_hashes.get(i)?;
            if number < min_block_number || number > max_block_number {
                log::debug!("block hash entry {number} outside the reachable window");
                return Err(ErrorCode::FatalInvalidData);
            }
            self.block_hashes.insert(&block_smt_key(number), &hash)?;
        }
        if !self.block_hashes.is_empty() {
            self.block_hashes.normalize();
            smt::verify(
                &scope.block_merkle_root,
                self.block_hashes.pairs(),
                witness.block_hashes_proof,
            )?;
        }

        // KV snapshot.
        if witness.context.kv_state.len() > MAX_KV_PAIRS {
            log::debug!("too many key/value pairs");
            return Err(ErrorCode::FatalInvalidData);
        }
        for i in 0..witness.context.kv_state.len() {
            let (key, value) = witness.context.kv_state.get(i)?;
            self.kv_state.insert(&key, &value)?;
        }

        // KV proof (shared between the pre- and post-root checks).
        if witness.kv_state_proof.len() > MAX_KV_PROOF_SIZE {
            log::debug!("kv state proof is too long");
            return Err(ErrorCode::FatalBufferOverflow);
        }
        self.kv_state_proof[..witness.kv_state_proof.len()]
            .copy_from_slice(witness.kv_state_proof);
        self.kv_state_proof_len = witness.kv_state_proof.len() as u32;

        // ── Step 7: Checkpoints and account states ────────────────────────────
        let (prev_checkpoint, post_checkpoint) =
            load_tx_checkpoints(&raw_block, self.tx_index)?;
        self.prev_tx_checkpoint = prev_checkpoint;
        self.post_tx_checkpoint = post_checkpoint;
        self.prev_account = raw_block.prev_account;
        self.post_account = raw_block.post_account;

        // Script table: every entry is keyed by its own hash.
        if witness.context.scripts.len() > MAX_SCRIPT_ENTRIES {
            log::debug!("script entry count exceeds the table bound");
            return Err(ErrorCode::FatalBufferOverflow);
        }
        for i in 0..witness.context.scripts.len() {
            let script_bytes = witness.context.scripts.get(i)?;
            if script_bytes.len() > MAX_SCRIPT_SIZE {
                return Err(ErrorCode::FatalInvalidData);
            }
            let mut entry = ScriptEntry::EMPTY;
            entry.hash = blake2b(script_bytes);
            entry.script[..script_bytes.len()].copy_from_slice(script_bytes);
            entry.script_len = script_bytes.len() as u32;
            self.scripts[self.script_entries as usize] = entry;
            self.script_entries += 1;
        }

        self.return_data_hash = witness.context.return_data_hash;
        self.account_count = self.prev_account.count;

        // ── Step 8: Pre-state root check ──────────────────────────────────────
        self.kv_state.normalize();
        smt::verify(
            &self.prev_account.merkle_root,
            self.kv_state.pairs(),
            &self.kv_state_proof[..self.kv_state_proof_len as usize],
        )?;

        // ── Step 9: Sender nonce bootstrap ────────────────────────────────────
        self.original_sender_nonce = self.load_sender_nonce()?;

        Ok(InitOutcome::Ready)
    }

    /// The post-execution checks. Order is frozen; the first failure is the
    /// program's exit code.
    pub fn finalize(&mut self) -> Result<(), ErrorCode> {
        // ── Step 1: Account count ─────────────────────────────────────────────
        if self.post_account.count != self.account_count {
            log::debug!("account count not match");
            return Err(ErrorCode::FatalInvalidData);
        }

        // ── Step 2: Sender nonce ──────────────────────────────────────────────
        self.increase_sender_nonce()?;

        // ── Step 3: Return data commitment ────────────────────────────────────
        let receipt_hash = blake2b(self.receipt.return_data());
        if receipt_hash != self.return_data_hash {
            log::debug!("return data hash not match");
            return Err(ErrorCode::FatalMismatchReturnData);
        }

        // ── Step 4: Post-state root check ─────────────────────────────────────
        self.kv_state.normalize();
        smt::verify(
            &self.post_account.merkle_root,
            self.kv_state.pairs(),
            &self.kv_state_proof[..self.kv_state_proof_len as usize],
        )
    }

    // ── Internal raw-key channel ──────────────────────────────────────────────
    // Programs go through the typed syscalls; only nonce bootstrap and
    // finalization touch raw keys directly.

    pub(crate) fn load_raw(&self, raw_key: &Hash) -> Result<Hash, ErrorCode> {
        self.kv_state.fetch(raw_key)
    }

    pub(crate) fn store_raw(&mut self, raw_key: &Hash, value: &Hash) -> Result<(), ErrorCode> {
        self.kv_state.insert(raw_key, value)
    }

    fn load_sender_nonce(&self) -> Result<u32, ErrorCode> {
        let nonce_key = account_field_key(self.transaction.from_id, AccountField::Nonce);
        let value = self.load_raw(&nonce_key).inspect_err(|_| {
            log::debug!("failed to fetch sender nonce value");
        })?;
        Ok(u32_from_value(&value))
    }

    /// Sender-nonce policy: a program that never touched the nonce gets it
    /// bumped by exactly one here; a program that already bumped it (e.g.
    /// through an internal call) is accepted unchanged. A nonce below the
    /// original is fatal.
    fn increase_sender_nonce(&mut self) -> Result<(), ErrorCode> {
        let new_nonce = self.load_sender_nonce()?;
        if new_nonce < self.original_sender_nonce {
            log::debug!("sender nonce moved backwards");
            return Err(ErrorCode::FatalInvalidContext);
        }
        if new_nonce == self.original_sender_nonce {
            let nonce_key = account_field_key(self.transaction.from_id, AccountField::Nonce);
            let bumped = new_nonce
                .checked_add(1)
                .ok_or(ErrorCode::FatalInvalidContext)?;
            self.store_raw(&nonce_key, &u32_to_value(bumped))?;
        }
        Ok(())
    }

    fn ensure_account_exists(&self, account_id: u32) -> Result<(), ErrorCode> {
        let script_hash = self.get_script_hash_by_account_id(account_id)?;
        if is_zero_hash(&script_hash) {
            return Err(ErrorCode::FatalAccountNotFound);
        }
        Ok(())
    }

    fn find_script_entry(&self, script_hash: &Hash) -> Option<&ScriptEntry> {
        self.scripts[..self.script_entries as usize]
            .iter()
            .find(|entry| &entry.hash == script_hash)
    }

    // ── Syscall surface ───────────────────────────────────────────────────────

    /// Read a value from an account's KV storage.
    pub fn load(&self, account_id: u32, key: &[u8]) -> Result<Hash, ErrorCode> {
        self.ensure_account_exists(account_id)?;
        self.load_raw(&account_kv_key(account_id, key))
    }

    /// Write a value into an account's KV storage.
    pub fn store(&mut self, account_id: u32, key: &[u8], value: &Hash) -> Result<(), ErrorCode> {
        self.ensure_account_exists(account_id)?;
        self.store_raw(&account_kv_key(account_id, key), value)
    }

    /// Set the program's return data. Written into the receipt and checked
    /// against the committed hash at finalization.
    pub fn set_return_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        if data.len() > MAX_RETURN_DATA_SIZE {
            log::debug!("exceeded max return data size");
            return Err(ErrorCode::FatalBufferOverflow);
        }
        self.receipt.return_data[..data.len()].copy_from_slice(data);
        self.receipt.return_data_len = data.len() as u32;
        Ok(())
    }

    /// Create a new account from `script`. The script must pass policy; the
    /// new id is the current account count.
    pub fn create(&mut self, script: &[u8]) -> Result<u32, ErrorCode> {
        if self.script_entries as usize >= MAX_SCRIPT_ENTRIES {
            log::debug!("script table is full");
            return Err(ErrorCode::FatalBufferOverflow);
        }

        let config = self.rollup_config()?;
        check_account_script_allowed(&self.rollup_script_hash, script, &config)?;

        let id = self.account_count;
        let script_hash = blake2b(script);

        // (id, NONCE) = 0
        self.store_raw(
            &account_field_key(id, AccountField::Nonce),
            &ZERO_HASH,
        )?;
        // (id, SCRIPT_HASH) = H(script)
        self.store_raw(
            &account_field_key(id, AccountField::ScriptHash),
            &script_hash,
        )?;
        // H(script) → id
        self.store_raw(&script_hash_to_id_key(&script_hash), &u32_to_value(id))?;

        let mut entry = ScriptEntry::EMPTY;
        entry.hash = script_hash;
        entry.script[..script.len()].copy_from_slice(script);
        entry.script_len = script.len() as u32;
        self.scripts[self.script_entries as usize] = entry;
        self.script_entries += 1;
        self.account_count += 1;

        Ok(id)
    }

    /// Look an account id up by its script hash.
    pub fn get_account_id_by_script_hash(&self, script_hash: &Hash) -> Result<u32, ErrorCode> {
        let value = self.load_raw(&script_hash_to_id_key(script_hash))?;
        Ok(u32_from_value(&value))
    }

    /// Look a script hash up by account id. The zero hash means the account
    /// does not exist.
    pub fn get_script_hash_by_account_id(&self, account_id: u32) -> Result<Hash, ErrorCode> {
        self.load_raw(&account_field_key(account_id, AccountField::ScriptHash))
    }

    /// An account's nonce.
    pub fn get_account_nonce(&self, account_id: u32) -> Result<u32, ErrorCode> {
        self.ensure_account_exists(account_id)?;
        let value = self.load_raw(&account_field_key(account_id, AccountField::Nonce))?;
        Ok(u32_from_value(&value))
    }

    /// Copy a slice of an account's script into `out`. Returns the copied
    /// length: `min(out.len(), max(0, script_len - offset))`.
    pub fn get_account_script(
        &self,
        account_id: u32,
        offset: usize,
        out: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        let script_hash = self.get_script_hash_by_account_id(account_id)?;
        if is_zero_hash(&script_hash) {
            log::debug!("account script hash is zero: account does not exist");
            return Err(ErrorCode::NotFound);
        }

        let Some(entry) = self.find_script_entry(&script_hash) else {
            log::debug!("account exists but its script is missing from the witness");
            return Err(ErrorCode::FatalAccountNotFound);
        };

        let script = entry.script();
        let available = script.len().saturating_sub(offset);
        let copied = available.min(out.len());
        if copied > 0 {
            out[..copied].copy_from_slice(&script[offset..offset + copied]);
        }
        Ok(copied)
    }

    /// Record that a data blob with this content exists. The validator does
    /// not store the payload — only the presence flag in the state tree.
    pub fn store_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        if data.len() > MAX_RETURN_DATA_SIZE {
            log::debug!("exceeded max store data size");
            return Err(ErrorCode::FatalInvalidData);
        }
        let data_hash = blake2b(data);
        self.store_raw(&data_hash_key(&data_hash), &u32_to_value(1))
    }

    /// Copy a slice of a dep cell's data, located by data hash. Returns the
    /// copied length.
    pub fn load_data(
        &self,
        data_hash: &Hash,
        offset: usize,
        out: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        let Some(index) = find_cell_by_data_hash(&self.host, data_hash, Source::CellDep) else {
            log::debug!("no dep cell matches the data hash");
            return Err(ErrorCode::FatalDataCellNotFound);
        };
        let data = self
            .host
            .cell_data(Source::CellDep, index)
            .map_err(|_| ErrorCode::FatalDataCellNotFound)?;
        let available = data.len().saturating_sub(offset);
        let copied = available.min(out.len());
        if copied > 0 {
            out[..copied].copy_from_slice(&data[offset..offset + copied]);
        }
        Ok(copied)
    }

    /// A layer-2 block hash from the witness snapshot.
    pub fn get_block_hash(&self, number: u64) -> Result<Hash, ErrorCode> {
        self.block_hashes.fetch(&block_smt_key(number))
    }

    /// Find the full script hash whose prefix matches. A miss is
    /// `ScriptNotFound` — distinct from a missing verification context.
    pub fn get_script_hash_by_prefix(&self, prefix: &[u8]) -> Result<Hash, ErrorCode> {
        if prefix.is_empty() || prefix.len() > 32 {
            return Err(ErrorCode::FatalInvalidData);
        }
        self.scripts[..self.script_entries as usize]
            .iter()
            .find(|entry| &entry.hash[..prefix.len()] == prefix)
            .map(|entry| entry.hash)
            .ok_or(ErrorCode::ScriptNotFound)
    }

    /// Recover the lock script that signed `message`. Scans inputs for a
    /// lock with the given code hash whose cell data bytes `[32..64]` equal
    /// the message and whose witness lock field equals the signature.
    pub fn recover_account(
        &self,
        message: &Hash,
        signature: &[u8],
        code_hash: &Hash,
        out_script: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        let mut index = 0;
        loop {
            let lock = match self.host.cell_lock_script(Source::Input, index) {
                Ok(lock) => lock,
                Err(HostError::IndexOutOfBound) | Err(HostError::ItemMissing) => {
                    log::debug!("no input carries the account signature lock");
                    return Err(ErrorCode::FatalSignatureCellNotFound);
                }
            };
            let script = Script::parse(lock)?;
            if &script.code_hash != code_hash || script.hash_type != SCRIPT_HASH_TYPE_TYPE {
                index += 1;
                continue;
            }

            // cell data layout: owner_lock_hash(32) ‖ message(32).
            let matches = self
                .host
                .cell_data(Source::Input, index)
                .ok()
                .filter(|data| data.len() >= 64 && &data[32..64] == message)
                .is_some();
            if !matches {
                index += 1;
                continue;
            }

            let signature_matches = self
                .host
                .witness(Source::Input, index)
                .ok()
                .and_then(|witness| WitnessArgs::parse(witness).ok())
                .and_then(|args| args.lock)
                .is_some_and(|lock_field| lock_field == signature);
            if !signature_matches {
                index += 1;
                continue;
            }

            if out_script.len() < lock.len() {
                return Err(ErrorCode::FatalBufferOverflow);
            }
            out_script[..lock.len()].copy_from_slice(lock);
            return Ok(lock.len());
        }
    }

    /// Emit a log. No state effect in validator mode; the account must exist.
    pub fn log(&self, account_id: u32, service_flag: u8, data: &[u8]) -> Result<(), ErrorCode> {
        self.ensure_account_exists(account_id)?;
        log::debug!(
            "log: account {account_id} flag {service_flag} ({} bytes)",
            data.len()
        );
        Ok(())
    }

    /// Record a fee payment. No state effect in validator mode — the sUDT
    /// transfer itself was already performed through `store` by the
    /// executing contract. The sUDT account must exist.
    pub fn pay_fee(
        &self,
        payer_addr: &[u8],
        sudt_id: u32,
        amount: U256,
    ) -> Result<(), ErrorCode> {
        self.ensure_account_exists(sudt_id)?;
        log::debug!(
            "pay_fee: payer addr {} bytes, sudt {sudt_id}, amount is_zero={}",
            payer_addr.len(),
            amount.is_zero()
        );
        Ok(())
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// The capability set as a trait
// ──────────────────────────────────────────────────────────────────────────────

/// The syscall menu exposed to an executed program, as a trait seam.
///
/// Built-in contracts call `Context` directly; external execution backends
/// are written against this trait so the context stays swappable under test.
/// Implemented once, for `Context<H>`, and monomorphized — the trait exists
/// for the seam, not for dynamic dispatch.
pub trait Syscalls {
    fn load(&self, account_id: u32, key: &[u8]) -> Result<Hash, ErrorCode>;
    fn store(&mut self, account_id: u32, key: &[u8], value: &Hash) -> Result<(), ErrorCode>;
    fn set_return_data(&mut self, data: &[u8]) -> Result<(), ErrorCode>;
    fn create(&mut self, script: &[u8]) -> Result<u32, ErrorCode>;
    fn get_account_id_by_script_hash(&self, script_hash: &Hash) -> Result<u32, ErrorCode>;
    fn get_script_hash_by_account_id(&self, account_id: u32) -> Result<Hash, ErrorCode>;
    fn get_account_nonce(&self, account_id: u32) -> Result<u32, ErrorCode>;
    fn get_account_script(
        &self,
        account_id: u32,
        offset: usize,
        out: &mut [u8],
    ) -> Result<usize, ErrorCode>;
    fn store_data(&mut self, data: &[u8]) -> Result<(), ErrorCode>;
    fn load_data(&self, data_hash: &Hash, offset: usize, out: &mut [u8])
        -> Result<usize, ErrorCode>;
    fn get_block_hash(&self, number: u64) -> Result<Hash, ErrorCode>;
    fn get_script_hash_by_prefix(&self, prefix: &[u8]) -> Result<Hash, ErrorCode>;
    fn recover_account(
        &self,
        message: &Hash,
        signature: &[u8],
        code_hash: &Hash,
        out_script: &mut [u8],
    ) -> Result<usize, ErrorCode>;
    fn log(&self, account_id: u32, service_flag: u8, data: &[u8]) -> Result<(), ErrorCode>;
    fn pay_fee(&self, payer_addr: &[u8], sudt_id: u32, amount: U256) -> Result<(), ErrorCode>;
}

impl<H: ChainHost> Syscalls for Context<H> {
    fn load(&self, account_id: u32, key: &[u8]) -> Result<Hash, ErrorCode> {
        Context::load(self, account_id, key)
    }

    fn store(&mut self, account_id: u32, key: &[u8], value: &Hash) -> Result<(), ErrorCode> {
        Context::store(self, account_id, key, value)
    }

    fn set_return_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        Context::set_return_data(self, data)
    }

    fn create(&mut self, script: &[u8]) -> Result<u32, ErrorCode> {
        Context::create(self, script)
    }

    fn get_account_id_by_script_hash(&self, script_hash: &Hash) -> Result<u32, ErrorCode> {
        Context::get_account_id_by_script_hash(self, script_hash)
    }

    fn get_script_hash_by_account_id(&self, account_id: u32) -> Result<Hash, ErrorCode> {
        Context::get_script_hash_by_account_id(self, account_id)
    }

    fn get_account_nonce(&self, account_id: u32) -> Result<u32, ErrorCode> {
        Context::get_account_nonce(self, account_id)
    }

    fn get_account_script(
        &self,
        account_id: u32,
        offset: usize,
        out: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        Context::get_account_script(self, account_id, offset, out)
    }

    fn store_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        Context::store_data(self, data)
    }

    fn load_data(
        &self,
        data_hash: &Hash,
        offset: usize,
        out: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        Context::load_data(self, data_hash, offset, out)
    }

    fn get_block_hash(&self, number: u64) -> Result<Hash, ErrorCode> {
        Context::get_block_hash(self, number)
    }

    fn get_script_hash_by_prefix(&self, prefix: &[u8]) -> Result<Hash, ErrorCode> {
        Context::get_script_hash_by_prefix(self, prefix)
    }

    fn recover_account(
        &self,
        message: &Hash,
        signature: &[u8],
        code_hash: &Hash,
        out_script: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        Context::recover_account(self, message, signature, code_hash, out_script)
    }

    fn log(&self, account_id: u32, service_flag: u8, data: &[u8]) -> Result<(), ErrorCode> {
        Context::log(self, account_id, service_flag, data)
    }

    fn pay_fee(&self, payer_addr: &[u8], sudt_id: u32, amount: U256) -> Result<(), ErrorCode> {
        Context::pay_fee(self, payer_addr, sudt_id, amount)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Init helpers
// ──────────────────────────────────────────────────────────────────────────────

fn u32_from_value(value: &Hash) -> u32 {
    u32::from_le_bytes([value[0], value[1], value[2], value[3]])
}

fn u32_to_value(n: u32) -> Hash {
    let mut value = ZERO_HASH;
    value[..4].copy_from_slice(&n.to_le_bytes());
    value
}

/// Our cell's data names an owner lock hash; an input must carry that lock.
/// This prevents anyone but the owner from consuming the verifier cell.
fn check_owner_lock<H: ChainHost>(host: &H) -> Result<(), ErrorCode> {
    let data = host
        .cell_data(Source::GroupInput, 0)
        .map_err(|_| ErrorCode::FatalInvalidData)?;
    if data.len() != 32 {
        log::debug!("owner lock data has length {}", data.len());
        return Err(ErrorCode::FatalInvalidData);
    }
    let mut owner_lock_hash = ZERO_HASH;
    owner_lock_hash.copy_from_slice(data);

    let mut index = 0;
    loop {
        match host.cell_lock_hash(Source::Input, index) {
            Ok(lock_hash) if lock_hash == owner_lock_hash => return Ok(()),
            Ok(_) | Err(HostError::ItemMissing) => index += 1,
            Err(HostError::IndexOutOfBound) => {
                log::debug!("no input unlocks the owner lock");
                return Err(ErrorCode::FatalInvalidContext);
            }
        }
    }
}

/// The rollup's identity is the first 32 bytes of our script args.
fn load_rollup_script_hash<H: ChainHost>(host: &H) -> Result<Hash, ErrorCode> {
    let script_bytes = host.script().map_err(|_| ErrorCode::FatalInvalidData)?;
    if script_bytes.len() > MAX_SCRIPT_SIZE {
        return Err(ErrorCode::FatalBufferOverflow);
    }
    let script = Script::parse(script_bytes)?;
    if script.args.len() < 32 {
        log::debug!("current script args is less than 32 bytes");
        return Err(ErrorCode::FatalInvalidData);
    }
    let mut rollup_script_hash = ZERO_HASH;
    rollup_script_hash.copy_from_slice(&script.args[..32]);
    Ok(rollup_script_hash)
}

struct VerificationScope {
    challenge_cell_index: usize,
    challenged_block_hash: Hash,
    block_merkle_root: Hash,
    tx_index: u32,
}

/// Steps 4–5: global state from the rollup cell, the config dep, and the
/// challenge cell's decoded lock args.
fn load_verification_scope<H: ChainHost>(
    host: &H,
    rollup_cell_index: usize,
    rollup_script_hash: &Hash,
    rollup_config_buf: &mut [u8; MAX_ROLLUP_CONFIG_SIZE],
    rollup_config_len: &mut u32,
) -> Result<VerificationScope, ErrorCode> {
    // Global state lives in the rollup cell's data.
    let global_state_bytes = host
        .cell_data(Source::Input, rollup_cell_index)
        .map_err(|_| ErrorCode::FatalInvalidData)?;
    let global_state = GlobalState::parse(global_state_bytes)?;

    // The config cell is a dep whose data hashes to the committed value.
    let Some(config_cell_index) =
        find_cell_by_data_hash(host, &global_state.rollup_config_hash, Source::CellDep)
    else {
        log::debug!("failed to find rollup config cell");
        return Err(ErrorCode::FatalDataCellNotFound);
    };
    let config_bytes = host
        .cell_data(Source::CellDep, config_cell_index)
        .map_err(|_| ErrorCode::FatalDataCellNotFound)?;
    if config_bytes.len() > MAX_ROLLUP_CONFIG_SIZE {
        return Err(ErrorCode::FatalBufferOverflow);
    }
    let config = RollupConfig::parse(config_bytes)?;
    rollup_config_buf[..config_bytes.len()].copy_from_slice(config_bytes);
    *rollup_config_len = config_bytes.len() as u32;

    // Locate the challenge cell: a lock with the configured code hash whose
    // args begin with our rollup script hash.
    let mut index = 0;
    loop {
        let lock = match host.cell_lock_script(Source::Input, index) {
            Ok(lock) => lock,
            Err(_) => {
                log::debug!("no challenge cell among inputs");
                return Err(ErrorCode::FatalInvalidContext);
            }
        };
        let script = Script::parse(lock)?;
        if script.code_hash != config.challenge_script_type_hash
            || script.hash_type != SCRIPT_HASH_TYPE_TYPE
        {
            index += 1;
            continue;
        }

        if script.args.len() < 32 {
            log::debug!("challenge lock args is less than 32 bytes");
            return Err(ErrorCode::FatalInvalidData);
        }
        if &script.args[..32] != rollup_script_hash {
            log::debug!("challenge lock rollup_script_hash mismatch");
            return Err(ErrorCode::FatalInvalidData);
        }

        let lock_args = ChallengeLockArgs::parse(&script.args[32..])?;
        if lock_args.target.target_type != TARGET_TYPE_TRANSACTION {
            log::debug!("challenge target type is not a transaction");
            return Err(ErrorCode::FatalInvalidData);
        }

        return Ok(VerificationScope {
            challenge_cell_index: index,
            challenged_block_hash: lock_args.target.block_hash,
            block_merkle_root: global_state.block_merkle_root,
            tx_index: lock_args.target.target_index,
        });
    }
}

/// Checkpoints pinning the state before and after the challenged
/// transaction. With `W` withdrawals and transaction index `T`:
/// the previous checkpoint is `state_checkpoints[W + T - 1]` (or the
/// block's `prev_state_checkpoint` when `T == 0`) and the post checkpoint
/// is `state_checkpoints[W + T]`.
fn load_tx_checkpoints(
    raw_block: &RawL2Block<'_>,
    tx_index: u32,
) -> Result<(Hash, Hash), ErrorCode> {
    let withdrawals_count = raw_block.submit_withdrawals.withdrawal_count;
    let checkpoints = &raw_block.state_checkpoint_list;
    let post_index = withdrawals_count
        .checked_add(tx_index)
        .ok_or(ErrorCode::FatalInvalidData)? as usize;

    let prev = if tx_index == 0 {
        raw_block.submit_transactions.prev_state_checkpoint
    } else {
        checkpoints.get(post_index - 1).map_err(|_| {
            log::debug!("invalid prev tx checkpoint");
            ErrorCode::FatalInvalidData
        })?
    };

    let post = checkpoints.get(post_index).map_err(|_| {
        log::debug!("invalid post tx checkpoint");
        ErrorCode::FatalInvalidData
    })?;

    Ok((prev, post))
}
