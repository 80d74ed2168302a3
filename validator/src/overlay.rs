//! KV overlay — the append-only write buffer between the executed
//! transaction and the Sparse Merkle Tree.
//!
//! The overlay is not a database. It is a bounded list of `(key, value,
//! order)` triples with two phases:
//!
//! - **Mutation phase** — `insert` appends, `fetch` scans newest-to-oldest.
//!   Late writes shadow earlier writes with the same key (last-wins reads).
//! - **Proof phase** — `normalize` sorts the pairs into the SMT's leaf order
//!   and drops shadowed writes, so the proof replay sees exactly one leaf per
//!   key: the newest one.
//!
//! CONSENSUS RULES:
//! 1. Capacity is a compile-time constant. A full buffer with no matching key
//!    to overwrite is `FatalBufferOverflow`, never a reallocation.
//! 2. Leaf order compares keys from byte 31 down to byte 0 — the SMT walks
//!    from the least-significant bit toward the most-significant, so byte 31
//!    is the most significant for path purposes.
//! 3. Normalization is idempotent and preserves fetch semantics.

use crate::hash::{Hash, ZERO_HASH};
use crate::ErrorCode;

/// One overlay entry. `order` is meaningful only during normalization:
/// newer pairs receive smaller order values so that the stable leaf order
/// puts the newest write first within a key run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub key: Hash,
    pub value: Hash,
    order: u32,
}

impl Pair {
    const EMPTY: Pair = Pair {
        key: ZERO_HASH,
        value: ZERO_HASH,
        order: 0,
    };
}

/// A fixed-capacity KV overlay. `N` is the compile-time pair capacity
/// (`MAX_KV_PAIRS` for transaction state, `MAX_GET_BLOCK_HASH_DEPTH` for the
/// block-hash snapshot).
#[derive(Debug, Clone)]
pub struct KvState<const N: usize> {
    pairs: [Pair; N],
    len: usize,
}

/// Transaction KV overlay.
pub type TxKvState = KvState<{ crate::MAX_KV_PAIRS }>;
/// Block-hash snapshot overlay.
pub type BlockHashState = KvState<{ crate::MAX_GET_BLOCK_HASH_DEPTH }>;

impl<const N: usize> KvState<N> {
    pub const fn new() -> Self {
        KvState {
            pairs: [Pair::EMPTY; N],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The live pairs, in insertion order before `normalize` and in leaf
    /// order afterwards.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs[..self.len]
    }

    /// Record a write. Appends while capacity remains; once full, overwrites
    /// the newest existing entry with the same key in place.
    pub fn insert(&mut self, key: &Hash, value: &Hash) -> Result<(), ErrorCode> {
        if self.len < N {
            self.pairs[self.len] = Pair {
                key: *key,
                value: *value,
                order: 0,
            };
            self.len += 1;
            return Ok(());
        }

        // Full: find the newest matching key and overwrite it in place.
        for i in (0..self.len).rev() {
            if &self.pairs[i].key == key {
                self.pairs[i].value = *value;
                return Ok(());
            }
        }

        log::debug!("overlay full and key has no prior write");
        Err(ErrorCode::FatalBufferOverflow)
    }

    /// Read the newest write for `key`. Scans newest-to-oldest so shadowed
    /// writes are never observed.
    pub fn fetch(&self, key: &Hash) -> Result<Hash, ErrorCode> {
        for i in (0..self.len).rev() {
            if &self.pairs[i].key == key {
                return Ok(self.pairs[i].value);
            }
        }
        Err(ErrorCode::NotFound)
    }

    /// Sort into SMT leaf order and drop shadowed writes.
    ///
    /// Post-condition: keys strictly ascend under the leaf comparator and
    /// each surviving pair is the newest write for its key. Running
    /// `normalize` again is a no-op.
    pub fn normalize(&mut self) {
        // Newer pairs get smaller order, so equal keys sort newest-first.
        for (i, pair) in self.pairs[..self.len].iter_mut().enumerate() {
            pair.order = (self.len - i) as u32;
        }
        // The (key, order) comparator is total — orders are pairwise distinct
        // — so the sort result is unique and stability is immaterial. The
        // unstable sort is chosen because it sorts in place without a
        // temporary allocation.
        self.pairs[..self.len]
            .sort_unstable_by(|a, b| leaf_key_cmp(&a.key, &b.key).then(a.order.cmp(&b.order)));

        // Compact: keep the first (= newest) pair of every equal-key run.
        let mut sorted = 0;
        let mut next = 0;
        while next < self.len {
            let item = next;
            next += 1;
            while next < self.len && self.pairs[next].key == self.pairs[item].key {
                next += 1;
            }
            if item != sorted {
                self.pairs[sorted] = self.pairs[item];
            }
            sorted += 1;
        }
        self.len = sorted;
    }
}

impl<const N: usize> Default for KvState<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// SMT leaf order: compare key bytes from index 31 down to index 0.
/// Byte 31 holds the most significant tree-path bits.
pub fn leaf_key_cmp(a: &Hash, b: &Hash) -> core::cmp::Ordering {
    for i in (0..32).rev() {
        match a[i].cmp(&b[i]) {
            core::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    core::cmp::Ordering::Equal
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(n: u8) -> Hash {
        let mut k = ZERO_HASH;
        k[0] = n;
        k
    }

    fn value(n: u8) -> Hash {
        let mut v = ZERO_HASH;
        v[31] = n;
        v
    }

    // ── Last-wins reads ───────────────────────────────────────────────────────

    #[test]
    fn fetch_returns_the_newest_write() {
        let mut state: KvState<8> = KvState::new();
        state.insert(&key(1), &value(1)).unwrap();
        state.insert(&key(2), &value(2)).unwrap();
        state.insert(&key(1), &value(3)).unwrap();
        assert_eq!(state.fetch(&key(1)).unwrap(), value(3));
        assert_eq!(state.fetch(&key(2)).unwrap(), value(2));
    }

    #[test]
    fn fetch_missing_key_is_not_found() {
        let state: KvState<8> = KvState::new();
        assert_eq!(state.fetch(&key(9)), Err(ErrorCode::NotFound));
    }

    // ── Capacity behavior ─────────────────────────────────────────────────────

    #[test]
    fn full_buffer_overwrites_existing_key_in_place() {
        let mut state: KvState<2> = KvState::new();
        state.insert(&key(1), &value(1)).unwrap();
        state.insert(&key(2), &value(2)).unwrap();
        // Full now; writing to an existing key must still succeed.
        state.insert(&key(1), &value(7)).unwrap();
        assert_eq!(state.fetch(&key(1)).unwrap(), value(7));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn full_buffer_with_fresh_key_overflows() {
        let mut state: KvState<2> = KvState::new();
        state.insert(&key(1), &value(1)).unwrap();
        state.insert(&key(2), &value(2)).unwrap();
        assert_eq!(
            state.insert(&key(3), &value(3)),
            Err(ErrorCode::FatalBufferOverflow)
        );
    }

    // ── Leaf comparator ───────────────────────────────────────────────────────

    #[test]
    fn leaf_order_weighs_byte_31_most() {
        // a has byte 0 = 0xFF; b has byte 31 = 0x01. Under the leaf order the
        // high byte index dominates, so a < b despite a's larger low byte.
        let mut a = ZERO_HASH;
        a[0] = 0xFF;
        let mut b = ZERO_HASH;
        b[31] = 0x01;
        assert_eq!(leaf_key_cmp(&a, &b), core::cmp::Ordering::Less);
        assert_eq!(leaf_key_cmp(&b, &a), core::cmp::Ordering::Greater);
        assert_eq!(leaf_key_cmp(&a, &a), core::cmp::Ordering::Equal);
    }

    // ── Normalization ─────────────────────────────────────────────────────────

    #[test]
    fn normalize_sorts_into_leaf_order() {
        let mut state: KvState<8> = KvState::new();
        let mut high = ZERO_HASH;
        high[31] = 2;
        let mut low = ZERO_HASH;
        low[0] = 0xFF;
        state.insert(&high, &value(1)).unwrap();
        state.insert(&low, &value(2)).unwrap();
        state.normalize();
        assert_eq!(state.pairs()[0].key, low);
        assert_eq!(state.pairs()[1].key, high);
    }

    #[test]
    fn normalize_keeps_the_newest_write_per_key() {
        let mut state: KvState<8> = KvState::new();
        state.insert(&key(1), &value(1)).unwrap();
        state.insert(&key(2), &value(2)).unwrap();
        state.insert(&key(1), &value(9)).unwrap();
        state.normalize();
        assert_eq!(state.len(), 2);
        assert_eq!(state.fetch(&key(1)).unwrap(), value(9),
            "normalization must not resurrect a shadowed write");
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut state: KvState<8> = KvState::new();
        state.insert(&key(3), &value(1)).unwrap();
        state.insert(&key(1), &value(2)).unwrap();
        state.insert(&key(3), &value(3)).unwrap();
        state.normalize();
        let once: Vec<Pair> = state.pairs().to_vec();
        state.normalize();
        assert_eq!(state.pairs(), &once[..]);
    }

    #[test]
    fn normalize_on_empty_state_is_a_no_op() {
        let mut state: KvState<8> = KvState::new();
        state.normalize();
        assert_eq!(state.len(), 0);
    }

    // ── Properties ────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn last_wins_holds_for_any_write_sequence(
            writes in proptest::collection::vec((0u8..8, any::<u8>()), 1..64),
        ) {
            let mut state: KvState<64> = KvState::new();
            let mut expected: std::collections::BTreeMap<u8, u8> =
                std::collections::BTreeMap::new();
            for &(k, v) in &writes {
                state.insert(&key(k), &value(v)).unwrap();
                expected.insert(k, v);
            }
            for (&k, &v) in &expected {
                prop_assert_eq!(state.fetch(&key(k)).unwrap(), value(v));
            }
        }

        #[test]
        fn normalize_preserves_fetch_semantics(
            writes in proptest::collection::vec((0u8..8, any::<u8>()), 1..64),
        ) {
            let mut state: KvState<64> = KvState::new();
            for &(k, v) in &writes {
                state.insert(&key(k), &value(v)).unwrap();
            }
            let before: Vec<(u8, Hash)> =
                (0u8..8).filter_map(|k| state.fetch(&key(k)).ok().map(|v| (k, v))).collect();
            state.normalize();
            let after: Vec<(u8, Hash)> =
                (0u8..8).filter_map(|k| state.fetch(&key(k)).ok().map(|v| (k, v))).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn normalized_keys_strictly_ascend(
            writes in proptest::collection::vec((any::<u8>(), any::<u8>()), 1..64),
        ) {
            let mut state: KvState<64> = KvState::new();
            for &(k, v) in &writes {
                state.insert(&key(k), &value(v)).unwrap();
            }
            state.normalize();
            for pair in state.pairs().windows(2) {
                prop_assert_eq!(
                    leaf_key_cmp(&pair[0].key, &pair[1].key),
                    core::cmp::Ordering::Less
                );
            }
        }
    }
}
