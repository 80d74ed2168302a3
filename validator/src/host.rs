//! Host seam — the verification machine's syscall surface, as a trait.
//!
//! The original runtime exposes cell and witness access through numbered
//! syscalls; this module renders that capability set as `ChainHost`. The
//! context is generic over an implementation, so dispatch is monomorphized
//! per build target: the production binary binds the real syscalls, tests
//! bind an in-memory mock. There is no `dyn` anywhere on the hot path.
//!
//! Termination is NOT part of the trait. "Exit with code 0" is modeled as a
//! typed init outcome (`InitOutcome::NotInChallenge`) plus the entry-point
//! helper's returned exit code — the library never aborts the process.
//!
//! I/O through this trait happens only during `init` and inside the
//! `load_data` / `recover_account` syscalls; all calls are blocking and
//! deterministic given identical host inputs.

use crate::hash::Hash;

/// Where a cell or witness is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Transaction inputs.
    Input,
    /// Transaction outputs.
    Output,
    /// Dependency cells (read-only).
    CellDep,
    /// Inputs sharing the currently executing lock script.
    GroupInput,
}

/// Host-level lookup failures. These are distinct from `ErrorCode`: an
/// out-of-bound index ends an iteration, it does not by itself decide the
/// verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// No cell/witness at this index.
    IndexOutOfBound,
    /// The cell exists but the requested field does not (e.g. no type script).
    ItemMissing,
}

/// The host syscalls the validator consumes.
///
/// Accessors return slices borrowed from the host: nothing is copied until
/// the loader moves bytes into its bounded context buffers, where every copy
/// is length-checked.
pub trait ChainHost {
    /// Bytes of the currently executing script.
    fn script(&self) -> Result<&[u8], HostError>;

    /// A cell's lock script bytes.
    fn cell_lock_script(&self, source: Source, index: usize) -> Result<&[u8], HostError>;

    /// Hash of a cell's lock script.
    fn cell_lock_hash(&self, source: Source, index: usize) -> Result<Hash, HostError>;

    /// Hash of a cell's type script; `ItemMissing` when the cell has none.
    fn cell_type_hash(&self, source: Source, index: usize) -> Result<Hash, HostError>;

    /// A cell's data bytes.
    fn cell_data(&self, source: Source, index: usize) -> Result<&[u8], HostError>;

    /// Hash of a cell's data (zero hash for empty data).
    fn cell_data_hash(&self, source: Source, index: usize) -> Result<Hash, HostError>;

    /// The witness blob at `index` for `source`.
    fn witness(&self, source: Source, index: usize) -> Result<&[u8], HostError>;
}

impl<H: ChainHost + ?Sized> ChainHost for &H {
    fn script(&self) -> Result<&[u8], HostError> {
        (**self).script()
    }

    fn cell_lock_script(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        (**self).cell_lock_script(source, index)
    }

    fn cell_lock_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        (**self).cell_lock_hash(source, index)
    }

    fn cell_type_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        (**self).cell_type_hash(source, index)
    }

    fn cell_data(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        (**self).cell_data(source, index)
    }

    fn cell_data_hash(&self, source: Source, index: usize) -> Result<Hash, HostError> {
        (**self).cell_data_hash(source, index)
    }

    fn witness(&self, source: Source, index: usize) -> Result<&[u8], HostError> {
        (**self).witness(source, index)
    }
}

/// Scan `source` for the first cell whose type hash equals `type_hash`.
/// Cells without a type script are skipped. `None` means the scan exhausted
/// the source — which `init` treats as "not in a challenge" for the rollup
/// cell, and callers elsewhere treat as fatal.
pub fn find_cell_by_type_hash<H: ChainHost>(
    host: &H,
    type_hash: &Hash,
    source: Source,
) -> Option<usize> {
    let mut index = 0;
    loop {
        match host.cell_type_hash(source, index) {
            Ok(hash) if &hash == type_hash => return Some(index),
            Ok(_) | Err(HostError::ItemMissing) => index += 1,
            Err(HostError::IndexOutOfBound) => return None,
        }
    }
}

/// Scan `source` for the first cell whose data hash equals `data_hash`.
pub fn find_cell_by_data_hash<H: ChainHost>(
    host: &H,
    data_hash: &Hash,
    source: Source,
) -> Option<usize> {
    let mut index = 0;
    loop {
        match host.cell_data_hash(source, index) {
            Ok(hash) if &hash == data_hash => return Some(index),
            Ok(_) | Err(HostError::ItemMissing) => index += 1,
            Err(HostError::IndexOutOfBound) => return None,
        }
    }
}
