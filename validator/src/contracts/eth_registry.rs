//! ETH address registry — two-way mapping between 20-byte ethereum-style
//! addresses and 32-byte account script hashes.
//!
//! Mappings live in the registry account's own KV space under one-byte
//! prefixed keys. A forward miss falls back to the short-script-hash lookup:
//! contract addresses created before registration are still resolvable
//! because their address IS the leading 20 bytes of their script hash.

use crate::context::Context;
use crate::hash::{is_zero_hash, Hash};
use crate::host::ChainHost;
use crate::wire::{EthAddrRegArgs, ETH_ADDRESS_LEN};
use crate::ErrorCode;

/// Key prefix for `eth_address → script_hash`.
const KEY_PREFIX_ETH_TO_GW: u8 = 0x01;
/// Key prefix for `script_hash → eth_address`.
const KEY_PREFIX_GW_TO_ETH: u8 = 0x02;

fn eth_to_gw_key(eth_address: &[u8; ETH_ADDRESS_LEN]) -> [u8; 1 + ETH_ADDRESS_LEN] {
    let mut key = [0u8; 1 + ETH_ADDRESS_LEN];
    key[0] = KEY_PREFIX_ETH_TO_GW;
    key[1..].copy_from_slice(eth_address);
    key
}

fn gw_to_eth_key(script_hash: &Hash) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = KEY_PREFIX_GW_TO_ETH;
    key[1..].copy_from_slice(script_hash);
    key
}

/// Dispatch one registry transaction against the account in `to_id`.
pub fn run<H: ChainHost>(ctx: &mut Context<H>) -> Result<(), ErrorCode> {
    let registry_id = ctx.transaction.to_id;
    let message = EthAddrRegArgs::parse(ctx.transaction.args())?;

    match message {
        EthAddrRegArgs::EthToGw { eth_address } => {
            let script_hash = match ctx.load(registry_id, &eth_to_gw_key(&eth_address)) {
                Ok(value) if !is_zero_hash(&value) => value,
                // Not registered: assume a contract address, whose leading
                // 20 bytes alias its script hash.
                Ok(_) | Err(ErrorCode::NotFound) => {
                    ctx.get_script_hash_by_prefix(&eth_address)?
                }
                Err(err) => return Err(err),
            };
            ctx.set_return_data(&script_hash)
        }
        EthAddrRegArgs::GwToEth { script_hash } => {
            let value = ctx.load(registry_id, &gw_to_eth_key(&script_hash))?;
            if is_zero_hash(&value) {
                return Err(ErrorCode::NotFound);
            }
            ctx.set_return_data(&value[..ETH_ADDRESS_LEN])
        }
    }
}
