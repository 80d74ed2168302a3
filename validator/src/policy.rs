//! Account-script policy.
//!
//! An account script is allowed iff it is structurally valid, at most
//! `MAX_SCRIPT_SIZE` bytes, bound by type (`hash_type == type`), and its
//! code hash appears in the rollup config's EOA or contract allow-list.
//! Contract scripts additionally must carry the 32-byte rollup script hash
//! as their args prefix — a contract account is meaningless outside the
//! rollup that deployed it.

use crate::hash::Hash;
use crate::wire::{RollupConfig, Script, SCRIPT_HASH_TYPE_TYPE};
use crate::ErrorCode;
use crate::MAX_SCRIPT_SIZE;

/// Gate for `create`: reject any script the rollup config does not allow.
pub fn check_account_script_allowed(
    rollup_script_hash: &Hash,
    script_bytes: &[u8],
    config: &RollupConfig<'_>,
) -> Result<(), ErrorCode> {
    let script = Script::parse(script_bytes).inspect_err(|_| {
        log::debug!("disallowed script: invalid format");
    })?;

    if script_bytes.len() > MAX_SCRIPT_SIZE {
        log::debug!("disallowed script: too large");
        return Err(ErrorCode::FatalInvalidData);
    }

    if script.hash_type != SCRIPT_HASH_TYPE_TYPE {
        log::debug!("disallowed script: hash type is not 'type'");
        return Err(ErrorCode::UnknownScriptCodeHash);
    }

    if config.allowed_eoa_type_hashes.contains(&script.code_hash) {
        return Ok(());
    }

    if config.allowed_contract_type_hashes.contains(&script.code_hash) {
        // A contract script must be rooted in this rollup.
        if script.args.len() < 32 {
            log::debug!("disallowed contract script: args shorter than 32 bytes");
            return Err(ErrorCode::InvalidContractScript);
        }
        if &script.args[..32] != rollup_script_hash {
            log::debug!("disallowed contract script: args not prefixed by the rollup hash");
            return Err(ErrorCode::InvalidContractScript);
        }
        return Ok(());
    }

    log::debug!("disallowed script: unknown code hash");
    Err(ErrorCode::UnknownScriptCodeHash)
}
