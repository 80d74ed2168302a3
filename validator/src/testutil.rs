//! Test support: an in-memory chain host, wire-format encoders, and a
//! reference SMT proof generator.
//!
//! Everything here is `cfg(test)`. The encoders and the proof generator are
//! deliberately independent implementations of the wire format and of the
//! tree semantics — round-trip tests compare the production readers and the
//! production verifier against them, so a shared bug cannot hide.

use crate::hash::{blake2b, blake2b_pair, is_zero_hash, Hash, ZERO_HASH};
use crate::host::{ChainHost, HostError, Source};
use crate::overlay::Pair;

// ──────────────────────────────────────────────────────────────────────────────
// Mock chain host
// ──────────────────────────────────────────────────────────────────────────────

/// One mock cell. The lock hash is `blake2b(lock)`; the data hash is the
/// zero hash for empty data, `blake2b(data)` otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockCell {
    pub lock: Vec<u8>,
    pub type_hash: Option<Hash>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MockHost {
    pub script: Vec<u8>,
    pub inputs: Vec<MockCell>,
    pub cell_deps: Vec<MockCell>,
    pub group_inputs: Vec<MockCell>,
    /// Witnesses aligned with `inputs` by index.
    pub witnesses: Vec<Vec<u8>>,
}

impl MockHost {
    fn cells(&self, source: Source) -> Result<&[MockCell], HostError> {
        match source {
            Source::Input => Ok(&self.inputs),
            Source::CellDep => Ok(&self.cell_deps),
            Source::GroupInput => Ok(&self.group_inputs),
            Source::Output => Ok(&[]),
        }
    }

    fn cell(&self, source: Source, index: usize) -> Result<&MockCell, HostError> {
        self.cells(source)?
            .get(index)
            .ok_or(HostError::IndexOutOfBound)
    }
}

impl ChainHost for MockHost {
    fn script(&self) -> Result<&[u8], HostError> {
        Ok(&self.script)
    }

    fn cell_lock_script(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        Ok(&self.cell(source, index)?.lock)
    }

    fn cell_lock_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        Ok(blake2b(&self.cell(source, index)?.lock))
    }

    fn cell_type_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        self.cell(source, index)?
            .type_hash
            .ok_or(HostError::ItemMissing)
    }

    fn cell_data(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        Ok(&self.cell(source, index)?.data)
    }

    fn cell_data_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        let data = &self.cell(source, index)?.data;
        if data.is_empty() {
            Ok(ZERO_HASH)
        } else {
            Ok(blake2b(data))
        }
    }

    fn witness(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        match source {
            Source::Input => self
                .witnesses
                .get(index)
                .map(Vec::as_slice)
                .ok_or(HostError::IndexOutOfBound),
            _ => Err(HostError::IndexOutOfBound),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Reference SMT: naive root + compiled-proof generator
// ──────────────────────────────────────────────────────────────────────────────

pub mod smt_gen {
    use super::*;

    fn get_bit(key: &Hash, offset: i32) -> bool {
        let byte = (offset / 8) as usize;
        let bit = (offset % 8) as u8;
        (key[byte] >> bit) & 1 != 0
    }

    fn leaf_hash(pair: &Pair) -> Hash {
        if is_zero_hash(&pair.value) {
            ZERO_HASH
        } else {
            blake2b_pair(&pair.key, &pair.value)
        }
    }

    fn merge(lhs: &Hash, rhs: &Hash) -> Hash {
        if is_zero_hash(lhs) {
            *rhs
        } else if is_zero_hash(rhs) {
            *lhs
        } else {
            blake2b_pair(lhs, rhs)
        }
    }

    /// Root of the full 256-level tree holding exactly `leaves` (which must
    /// be in normalized leaf order). Recursive over the key bits, entirely
    /// independent of the stack-program verifier.
    pub fn naive_root(leaves: &[Pair]) -> Hash {
        fn subtree(leaves: &[Pair], height: i32) -> Hash {
            if leaves.is_empty() {
                return ZERO_HASH;
            }
            if height < 0 {
                assert_eq!(leaves.len(), 1, "duplicate keys reached the leaf level");
                return leaf_hash(&leaves[0]);
            }
            let split = leaves.partition_point(|p| !get_bit(&p.key, height));
            let (left, right) = leaves.split_at(split);
            merge(&subtree(left, height - 1), &subtree(right, height - 1))
        }
        subtree(leaves, 255)
    }

    /// Compile a stack-program proof covering exactly `leaves` (normalized
    /// order). Empty siblings are skipped — merging with the zero hash is
    /// the identity, so only fork points emit `H` opcodes.
    pub fn compile_proof(leaves: &[Pair]) -> Vec<u8> {
        fn build(leaves: &[Pair], height: i32, ops: &mut Vec<u8>) {
            if leaves.len() == 1 {
                ops.push(0x4C);
                return;
            }
            assert!(height >= 0, "duplicate keys in proof compilation");
            let split = leaves.partition_point(|p| !get_bit(&p.key, height));
            let (left, right) = leaves.split_at(split);
            if right.is_empty() {
                build(left, height - 1, ops);
            } else if left.is_empty() {
                build(right, height - 1, ops);
            } else {
                build(left, height - 1, ops);
                build(right, height - 1, ops);
                ops.push(0x48);
                ops.push(height as u8);
            }
        }

        let mut ops = Vec::new();
        if !leaves.is_empty() {
            build(leaves, 255, &mut ops);
        }
        ops
    }

    /// Normalize raw pairs into leaf order.
    pub fn normalized(pairs: &[(Hash, Hash)]) -> Vec<Pair> {
        let mut state: crate::overlay::KvState<1024> = crate::overlay::KvState::new();
        for (k, v) in pairs {
            state.insert(k, v).unwrap();
        }
        state.normalize();
        state.pairs().to_vec()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Wire encoders
// ──────────────────────────────────────────────────────────────────────────────

pub mod enc {
    use super::*;
    use crate::wire::{AccountMerkleState, SCRIPT_HASH_TYPE_TYPE, TARGET_TYPE_TRANSACTION};

    pub fn table(fields: &[&[u8]]) -> Vec<u8> {
        let header = 4 + 4 * fields.len();
        let full_size = header + fields.iter().map(|f| f.len()).sum::<usize>();
        let mut out = Vec::with_capacity(full_size);
        out.extend_from_slice(&(full_size as u32).to_le_bytes());
        let mut offset = header;
        for field in fields {
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            offset += field.len();
        }
        for field in fields {
            out.extend_from_slice(field);
        }
        out
    }

    pub fn bytes(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    pub fn dynvec(items: &[&[u8]]) -> Vec<u8> {
        // Same header shape as a table; the count is data, not schema.
        table(items)
    }

    pub fn union(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    pub fn byte32_vec(hashes: &[Hash]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 32 * hashes.len());
        out.extend_from_slice(&(hashes.len() as u32).to_le_bytes());
        for hash in hashes {
            out.extend_from_slice(hash);
        }
        out
    }

    pub fn script(code_hash: &Hash, hash_type: u8, args: &[u8]) -> Vec<u8> {
        table(&[code_hash, &[hash_type], &bytes(args)])
    }

    pub fn witness_args(
        lock: Option<&[u8]>,
        input_type: Option<&[u8]>,
        output_type: Option<&[u8]>,
    ) -> Vec<u8> {
        let encode_opt = |field: Option<&[u8]>| field.map(bytes).unwrap_or_default();
        table(&[
            &encode_opt(lock),
            &encode_opt(input_type),
            &encode_opt(output_type),
        ])
    }

    pub fn account_merkle_state(merkle_root: &Hash, count: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(AccountMerkleState::WIRE_SIZE);
        out.extend_from_slice(merkle_root);
        out.extend_from_slice(&count.to_le_bytes());
        out
    }

    pub fn global_state(
        account: &AccountMerkleState,
        block_merkle_root: &Hash,
        block_count: u64,
        rollup_config_hash: &Hash,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(crate::wire::GlobalState::WIRE_SIZE);
        out.extend_from_slice(&account_merkle_state(&account.merkle_root, account.count));
        out.extend_from_slice(block_merkle_root);
        out.extend_from_slice(&block_count.to_le_bytes());
        out.extend_from_slice(&ZERO_HASH); // reverted_block_root
        out.extend_from_slice(&ZERO_HASH); // tip_block_hash
        out.extend_from_slice(&0u64.to_le_bytes()); // last_finalized_block_number
        out.extend_from_slice(rollup_config_hash);
        out.push(0); // status
        out
    }

    pub fn rollup_config(
        challenge_script_type_hash: &Hash,
        l2_sudt_validator_script_type_hash: &Hash,
        allowed_eoa_type_hashes: &[Hash],
        allowed_contract_type_hashes: &[Hash],
    ) -> Vec<u8> {
        table(&[
            challenge_script_type_hash,
            l2_sudt_validator_script_type_hash,
            &100u64.to_le_bytes(), // finality_blocks
            &byte32_vec(allowed_eoa_type_hashes),
            &byte32_vec(allowed_contract_type_hashes),
        ])
    }

    pub fn challenge_target(block_hash: &Hash, target_index: u32, target_type: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(37);
        out.extend_from_slice(block_hash);
        out.extend_from_slice(&target_index.to_le_bytes());
        out.push(target_type);
        out
    }

    pub fn challenge_lock_args(block_hash: &Hash, target_index: u32) -> Vec<u8> {
        let rewards_receiver_lock = script(&blake2b(b"rewards-lock-code"), SCRIPT_HASH_TYPE_TYPE, b"");
        table(&[
            &challenge_target(block_hash, target_index, TARGET_TYPE_TRANSACTION),
            &rewards_receiver_lock,
        ])
    }

    pub fn raw_l2_transaction(from_id: u32, to_id: u32, nonce: u32, args: &[u8]) -> Vec<u8> {
        table(&[
            &from_id.to_le_bytes(),
            &to_id.to_le_bytes(),
            &nonce.to_le_bytes(),
            &bytes(args),
        ])
    }

    pub fn l2_transaction(raw: &[u8], signature: &[u8]) -> Vec<u8> {
        table(&[raw, &bytes(signature)])
    }

    pub fn submit_transactions(
        tx_witness_root: &Hash,
        tx_count: u32,
        prev_state_checkpoint: &Hash,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(68);
        out.extend_from_slice(tx_witness_root);
        out.extend_from_slice(&tx_count.to_le_bytes());
        out.extend_from_slice(prev_state_checkpoint);
        out
    }

    pub fn submit_withdrawals(withdrawal_witness_root: &Hash, withdrawal_count: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(withdrawal_witness_root);
        out.extend_from_slice(&withdrawal_count.to_le_bytes());
        out
    }

    #[allow(clippy::too_many_arguments)]
    pub fn raw_l2_block(
        number: u64,
        block_producer_id: u32,
        timestamp: u64,
        prev_account: &AccountMerkleState,
        post_account: &AccountMerkleState,
        submit_txs: &[u8],
        submit_wdr: &[u8],
        state_checkpoints: &[Hash],
    ) -> Vec<u8> {
        table(&[
            &number.to_le_bytes(),
            &block_producer_id.to_le_bytes(),
            &blake2b(b"parent-block"),
            &blake2b(b"stake-owner-lock"),
            &timestamp.to_le_bytes(),
            &account_merkle_state(&prev_account.merkle_root, prev_account.count),
            &account_merkle_state(&post_account.merkle_root, post_account.count),
            submit_txs,
            submit_wdr,
            &byte32_vec(state_checkpoints),
        ])
    }

    pub fn kv_pair_vec(pairs: &[(Hash, Hash)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 64 * pairs.len());
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for (k, v) in pairs {
            out.extend_from_slice(k);
            out.extend_from_slice(v);
        }
        out
    }

    pub fn block_hash_entry_vec(entries: &[(u64, Hash)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 40 * entries.len());
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (number, hash) in entries {
            out.extend_from_slice(&number.to_le_bytes());
            out.extend_from_slice(hash);
        }
        out
    }

    pub fn verify_tx_context(
        kv_state: &[(Hash, Hash)],
        scripts: &[Vec<u8>],
        return_data_hash: &Hash,
        block_hashes: &[(u64, Hash)],
    ) -> Vec<u8> {
        let script_slices: Vec<&[u8]> = scripts.iter().map(Vec::as_slice).collect();
        table(&[
            &kv_pair_vec(kv_state),
            &dynvec(&script_slices),
            return_data_hash,
            &block_hash_entry_vec(block_hashes),
        ])
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_tx_witness(
        raw_l2block: &[u8],
        l2tx: &[u8],
        tx_proof: &[u8],
        kv_state_proof: &[u8],
        block_hashes_proof: &[u8],
        context: &[u8],
    ) -> Vec<u8> {
        table(&[
            raw_l2block,
            l2tx,
            &bytes(tx_proof),
            &bytes(kv_state_proof),
            &bytes(block_hashes_proof),
            context,
        ])
    }

    pub fn meta_create_account_args(script: &[u8], fee: u64) -> Vec<u8> {
        union(0, &table(&[script, &fee.to_le_bytes()]))
    }

    pub fn sudt_query_args(address: &[u8]) -> Vec<u8> {
        union(0, &table(&[&bytes(address)]))
    }

    pub fn sudt_transfer_args(to: &[u8], amount: &[u8; 32], fee: &[u8; 32]) -> Vec<u8> {
        union(1, &table(&[&bytes(to), amount, fee]))
    }

    pub fn eth_to_gw_args(eth_address: &[u8; 20]) -> Vec<u8> {
        union(0, eth_address)
    }

    pub fn gw_to_eth_args(script_hash: &Hash) -> Vec<u8> {
        union(1, script_hash)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Full challenge fixture
// ──────────────────────────────────────────────────────────────────────────────

use crate::wire::{AccountMerkleState, SCRIPT_HASH_TYPE_TYPE};

/// Everything configurable about a synthetic challenge. The builder derives
/// all roots and proofs from these inputs with the reference generator, so a
/// fixture is valid by construction.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub kv: Vec<(Hash, Hash)>,
    pub from_id: u32,
    pub to_id: u32,
    pub tx_nonce: u32,
    pub tx_args: Vec<u8>,
    pub tx_index: u32,
    pub withdrawals_count: u32,
    pub scripts: Vec<Vec<u8>>,
    pub return_data_hash: Hash,
    pub block_number: u64,
    pub block_producer_id: u32,
    pub timestamp: u64,
    pub account_count: u32,
    pub post_account_count: u32,
    /// Expected pairs after execution (same key set as `kv`, plus any keys
    /// the program creates — which must then also appear in `kv` with their
    /// pre-state values for the proof to cover them).
    pub post_kv: Vec<(Hash, Hash)>,
    pub block_hashes: Vec<(u64, Hash)>,
    pub allowed_eoa_type_hashes: Vec<Hash>,
    pub allowed_contract_type_hashes: Vec<Hash>,
}

impl Default for Fixture {
    fn default() -> Self {
        Fixture {
            kv: Vec::new(),
            from_id: 2,
            to_id: 3,
            tx_nonce: 7,
            tx_args: Vec::new(),
            tx_index: 0,
            withdrawals_count: 0,
            scripts: Vec::new(),
            return_data_hash: blake2b(b""),
            block_number: 100,
            block_producer_id: 4,
            timestamp: 1_700_000_000,
            account_count: 5,
            post_account_count: 5,
            post_kv: Vec::new(),
            block_hashes: Vec::new(),
            allowed_eoa_type_hashes: vec![eoa_code_hash()],
            allowed_contract_type_hashes: vec![contract_code_hash()],
        }
    }
}

/// Fixed identities shared by every fixture.
pub fn rollup_type_hash() -> Hash {
    blake2b(b"fixture-rollup-type-hash")
}

pub fn challenge_code_hash() -> Hash {
    blake2b(b"fixture-challenge-lock-code")
}

pub fn sudt_validator_code_hash() -> Hash {
    blake2b(b"fixture-sudt-validator-code")
}

pub fn eoa_code_hash() -> Hash {
    blake2b(b"fixture-eoa-lock-code")
}

pub fn contract_code_hash() -> Hash {
    blake2b(b"fixture-contract-backend-code")
}

/// Derived commitments the builder computed while assembling the host.
pub struct FixtureOut {
    pub host: MockHost,
    pub prev_root: Hash,
    pub post_root: Hash,
}

impl Fixture {
    /// Assemble a complete mock host: owner cell, rollup cell, challenge
    /// cell, config dep, and the challenge witness.
    pub fn build(&self) -> FixtureOut {
        let rollup_hash = rollup_type_hash();

        // Pre/post state commitments and the shared kv proof.
        let prev_leaves = smt_gen::normalized(&self.kv);
        let kv_proof = smt_gen::compile_proof(&prev_leaves);
        let prev_root = smt_gen::naive_root(&prev_leaves);
        let post_leaves = smt_gen::normalized(&self.post_kv);
        let post_root = if self.post_kv.is_empty() {
            prev_root
        } else {
            smt_gen::naive_root(&post_leaves)
        };

        // The challenged transaction and its membership proof.
        let raw_tx =
            enc::raw_l2_transaction(self.from_id, self.to_id, self.tx_nonce, &self.tx_args);
        let l2tx = enc::l2_transaction(&raw_tx, b"fixture-signature");
        let tx_hash = blake2b(&l2tx);
        let mut tx_key = ZERO_HASH;
        tx_key[..4].copy_from_slice(&self.tx_index.to_le_bytes());
        let tx_leaves = smt_gen::normalized(&[(tx_key, tx_hash)]);
        let tx_proof = smt_gen::compile_proof(&tx_leaves);
        let tx_witness_root = smt_gen::naive_root(&tx_leaves);

        // Block-hash snapshot and its proof against the block SMT.
        let bh_pairs: Vec<(Hash, Hash)> = self
            .block_hashes
            .iter()
            .map(|(number, hash)| (crate::keys::block_smt_key(*number), *hash))
            .collect();
        let bh_leaves = smt_gen::normalized(&bh_pairs);
        let bh_proof = smt_gen::compile_proof(&bh_leaves);
        let block_merkle_root = smt_gen::naive_root(&bh_leaves);

        // Checkpoint list long enough for W + T + 1 entries.
        let checkpoint_count = self.withdrawals_count + self.tx_index + 1;
        let checkpoints: Vec<Hash> = (0..checkpoint_count)
            .map(|i| blake2b(&i.to_le_bytes()))
            .collect();

        let raw_block = enc::raw_l2_block(
            self.block_number,
            self.block_producer_id,
            self.timestamp,
            &AccountMerkleState {
                merkle_root: prev_root,
                count: self.account_count,
            },
            &AccountMerkleState {
                merkle_root: post_root,
                count: self.post_account_count,
            },
            &enc::submit_transactions(
                &tx_witness_root,
                self.tx_index + 1,
                &blake2b(b"prev-state-checkpoint"),
            ),
            &enc::submit_withdrawals(
                &blake2b(b"withdrawal-witness-root"),
                self.withdrawals_count,
            ),
            &checkpoints,
        );
        let block_hash = blake2b(&raw_block);

        let witness_context = enc::verify_tx_context(
            &self.kv,
            &self.scripts,
            &self.return_data_hash,
            &self.block_hashes,
        );
        let witness = enc::verify_tx_witness(
            &raw_block,
            &l2tx,
            &tx_proof,
            &kv_proof,
            &bh_proof,
            &witness_context,
        );
        let witness_args = enc::witness_args(Some(&witness), None, None);

        // Rollup config dep cell.
        let config = enc::rollup_config(
            &challenge_code_hash(),
            &sudt_validator_code_hash(),
            &self.allowed_eoa_type_hashes,
            &self.allowed_contract_type_hashes,
        );
        let config_hash = blake2b(&config);

        // Rollup cell data.
        let global_state = enc::global_state(
            &AccountMerkleState {
                merkle_root: prev_root,
                count: self.account_count,
            },
            &block_merkle_root,
            self.block_number,
            &config_hash,
        );

        // Challenge cell lock: rollup hash prefix, then the lock args.
        let mut challenge_args = rollup_hash.to_vec();
        challenge_args.extend_from_slice(&enc::challenge_lock_args(&block_hash, self.tx_index));
        let challenge_lock =
            enc::script(&challenge_code_hash(), SCRIPT_HASH_TYPE_TYPE, &challenge_args);

        // Owner unlock: the verifier cell's data names the owner lock hash,
        // and an input carries that lock.
        let owner_lock = enc::script(&blake2b(b"owner-lock-code"), SCRIPT_HASH_TYPE_TYPE, b"owner");
        let owner_lock_hash = blake2b(&owner_lock);

        let filler_lock = enc::script(&blake2b(b"filler-lock-code"), SCRIPT_HASH_TYPE_TYPE, b"");
        let host = MockHost {
            script: enc::script(&blake2b(b"verifier-code"), SCRIPT_HASH_TYPE_TYPE, &rollup_hash),
            inputs: vec![
                MockCell {
                    lock: owner_lock,
                    type_hash: None,
                    data: Vec::new(),
                },
                MockCell {
                    lock: filler_lock,
                    type_hash: Some(rollup_hash),
                    data: global_state,
                },
                MockCell {
                    lock: challenge_lock,
                    type_hash: None,
                    data: Vec::new(),
                },
            ],
            cell_deps: vec![MockCell {
                lock: Vec::new(),
                type_hash: None,
                data: config,
            }],
            group_inputs: vec![MockCell {
                lock: Vec::new(),
                type_hash: None,
                data: owner_lock_hash.to_vec(),
            }],
            witnesses: vec![Vec::new(), Vec::new(), witness_args],
        };

        FixtureOut {
            host,
            prev_root,
            post_root,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Common KV pair helpers
// ──────────────────────────────────────────────────────────────────────────────

/// Value encoding a u32 in the low four bytes.
pub fn u32_value(n: u32) -> Hash {
    let mut value = ZERO_HASH;
    value[..4].copy_from_slice(&n.to_le_bytes());
    value
}

/// (key, value) for an account's nonce field.
pub fn nonce_pair(account_id: u32, nonce: u32) -> (Hash, Hash) {
    (
        crate::keys::account_field_key(account_id, crate::keys::AccountField::Nonce),
        u32_value(nonce),
    )
}

/// (key, value) for an account's script-hash field.
pub fn script_hash_pair(account_id: u32, script_hash: Hash) -> (Hash, Hash) {
    (
        crate::keys::account_field_key(account_id, crate::keys::AccountField::ScriptHash),
        script_hash,
    )
}

/// (key, value) registering `script_hash → account_id`.
pub fn script_hash_to_id_pair(script_hash: &Hash, account_id: u32) -> (Hash, Hash) {
    (
        crate::keys::script_hash_to_id_key(script_hash),
        u32_value(account_id),
    )
}
