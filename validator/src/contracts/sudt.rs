//! sUDT contract — the layer-2 face of a fungible token.
//!
//! One layer-2 sUDT account maps to one layer-1 sUDT token, distinguished
//! by the token script hash in the account script's args. Messages:
//!
//! - `Query { address }` — return the 32-byte little-endian balance.
//! - `Transfer { to, amount, fee }` — pay the fee to the block producer,
//!   then move `amount` from the sender's address to `to`.
//!
//! Mint and burn are not transactions: deposits and withdrawals rewrite the
//! state tree directly and never reach this dispatch.

use crate::context::Context;
use crate::host::ChainHost;
use crate::math::U256;
use crate::sudt;
use crate::wire::SudtArgs;
use crate::ErrorCode;

enum Message {
    Query {
        address: [u8; sudt::MAX_SHORT_ADDRESS_LEN],
        address_len: usize,
    },
    Transfer {
        to: [u8; sudt::MAX_SHORT_ADDRESS_LEN],
        to_len: usize,
        amount: U256,
        fee: U256,
    },
}

/// Dispatch one sUDT transaction against the account in `to_id`.
pub fn run<H: ChainHost>(ctx: &mut Context<H>) -> Result<(), ErrorCode> {
    let sudt_id = ctx.transaction.to_id;

    // Copy addresses out of the transaction args before any mutation.
    let message = {
        let args = ctx.transaction.args();
        match SudtArgs::parse(args)? {
            SudtArgs::Query { address } => {
                if address.len() > sudt::MAX_SHORT_ADDRESS_LEN {
                    return Err(ErrorCode::ShortAddrLen);
                }
                let mut buf = [0u8; sudt::MAX_SHORT_ADDRESS_LEN];
                buf[..address.len()].copy_from_slice(address);
                Message::Query {
                    address: buf,
                    address_len: address.len(),
                }
            }
            SudtArgs::Transfer { to, amount, fee } => {
                if to.len() > sudt::MAX_SHORT_ADDRESS_LEN {
                    return Err(ErrorCode::ShortAddrLen);
                }
                let mut buf = [0u8; sudt::MAX_SHORT_ADDRESS_LEN];
                buf[..to.len()].copy_from_slice(to);
                Message::Transfer {
                    to: buf,
                    to_len: to.len(),
                    amount: U256::from_le_bytes(&amount),
                    fee: U256::from_le_bytes(&fee),
                }
            }
        }
    };

    match message {
        Message::Query {
            address,
            address_len,
        } => {
            let balance = sudt::get_balance(ctx, sudt_id, &address[..address_len])?;
            ctx.set_return_data(&balance.to_le_bytes())
        }
        Message::Transfer {
            to,
            to_len,
            amount,
            fee,
        } => {
            // The sender's address is its script hash truncated to the
            // recipient address length.
            let from_script_hash =
                ctx.get_script_hash_by_account_id(ctx.transaction.from_id)?;
            let from_addr = &from_script_hash[..to_len];

            sudt::pay_fee(ctx, sudt_id, from_addr, fee).inspect_err(|_| {
                log::debug!("sudt: pay fee failed");
            })?;
            sudt::transfer(ctx, sudt_id, from_addr, &to[..to_len], amount).inspect_err(|_| {
                log::debug!("sudt: transfer failed");
            })
        }
    }
}
