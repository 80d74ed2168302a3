//! Built-in layer-2 contracts, layered entirely on the syscall surface.
//!
//! Module layout:
//!   contracts::meta         — account creation (account id 0).
//!   contracts::sudt         — token query/transfer.
//!   contracts::eth_registry — eth address ↔ script hash lookup.
//!
//! Each contract exposes `run(&mut Context)` — parse the transaction args,
//! dispatch, and leave lifecycle management to the caller. `execute` wires
//! the full program shape: init → dispatch → finalize → exit code.

pub mod eth_registry;
pub mod meta;
pub mod sudt;

use crate::context::{Context, InitOutcome};
use crate::host::ChainHost;
use crate::ErrorCode;

/// Run a contract through the complete verification lifecycle and produce
/// the host exit code. A rollup cell missing from the inputs means this
/// verifier has no obligation: exit 0 without touching the witness.
pub fn execute<H, F>(host: H, contract: F) -> i8
where
    H: ChainHost,
    F: FnOnce(&mut Context<H>) -> Result<(), ErrorCode>,
{
    let mut ctx = Context::new(host);
    match ctx.init() {
        Ok(InitOutcome::NotInChallenge) => return 0,
        Ok(InitOutcome::Ready) => {}
        Err(err) => return err.exit_code(),
    }
    if let Err(err) = contract(&mut ctx) {
        return err.exit_code();
    }
    match ctx.finalize() {
        Ok(()) => 0,
        Err(err) => err.exit_code(),
    }
}
