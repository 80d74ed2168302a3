//! Meta contract — the builtin at account id 0.
//!
//! Special rollup features that no user contract may perform, currently one
//! message: `CreateAccount { script, fee }`. The fee is paid in the
//! canonical sUDT before the account is provisioned; the new account id is
//! returned as four little-endian bytes.

use crate::context::Context;
use crate::host::ChainHost;
use crate::math::U256;
use crate::sudt;
use crate::wire::MetaContractArgs;
use crate::ErrorCode;
use crate::MAX_SCRIPT_SIZE;

/// The meta contract's reserved account id.
pub const META_CONTRACT_ACCOUNT_ID: u32 = 0;

/// Fee addresses are 20-byte short script hashes.
const DEFAULT_SHORT_SCRIPT_HASH_LEN: usize = 20;

/// Dispatch one meta-contract transaction.
pub fn run<H: ChainHost>(ctx: &mut Context<H>) -> Result<(), ErrorCode> {
    if ctx.transaction.to_id != META_CONTRACT_ACCOUNT_ID {
        log::debug!("meta contract invoked with a non-zero to_id");
        return Err(ErrorCode::FatalInvalidContext);
    }

    // Copy the script out of the transaction args before any mutation.
    let (script_buf, script_len, fee) = {
        let args = ctx.transaction.args();
        match MetaContractArgs::parse(args)? {
            MetaContractArgs::CreateAccount { script, fee } => {
                if script.len() > MAX_SCRIPT_SIZE {
                    return Err(ErrorCode::FatalInvalidData);
                }
                let mut buf = [0u8; MAX_SCRIPT_SIZE];
                buf[..script.len()].copy_from_slice(script);
                (buf, script.len(), fee)
            }
        }
    };

    handle_fee(ctx, fee)?;

    let account_id = ctx.create(&script_buf[..script_len])?;
    ctx.set_return_data(&account_id.to_le_bytes())
}

/// Charge the account-creation fee in the canonical sUDT, addressed by the
/// payer's short script hash.
fn handle_fee<H: ChainHost>(ctx: &mut Context<H>, fee: u64) -> Result<(), ErrorCode> {
    let payer_script_hash = ctx.get_script_hash_by_account_id(ctx.transaction.from_id)?;
    sudt::pay_fee(
        ctx,
        sudt::CANONICAL_SUDT_ACCOUNT_ID,
        &payer_script_hash[..DEFAULT_SHORT_SCRIPT_HASH_LEN],
        U256::from_u64(fee),
    )
}
