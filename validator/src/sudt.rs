//! sUDT state utilities — balance, transfer, fee, total supply, allowance.
//!
//! Balances live inside the sUDT contract account's KV space under
//! `u32le(flag) ‖ u32le(addr_len) ‖ addr` keys; amounts are 256-bit
//! little-endian. Every mutation funnels through the context's `store`, so
//! the post-state root check covers token movements exactly like any other
//! write.
//!
//! CONSENSUS RULES:
//! 1. A transfer requires `balance(from) ≥ amount`; the receiving side is
//!    checked against the 2^256 ceiling.
//! 2. Self-transfer is ALLOWED and balance-neutral; it is logged with a
//!    warning and still emits the transfer log. (One historical variant
//!    rejected it; the accepted semantics are log-only.)
//! 3. The sender's debit is written before the receiver's balance is read —
//!    this is what makes a self-transfer net out to zero.
//! 4. `pay_fee` is a transfer to the block producer's address followed by
//!    the fee-notification syscall; the syscall itself moves no state.

use crate::context::Context;
use crate::host::ChainHost;
use crate::math::U256;
use crate::wire::{Script, SCRIPT_HASH_TYPE_TYPE};
use crate::ErrorCode;
use crate::MAX_SCRIPT_SIZE;

/// The canonical gas-token sUDT account, created at genesis.
pub const CANONICAL_SUDT_ACCOUNT_ID: u32 = 1;

/// Log service flags.
pub const LOG_SUDT_TRANSFER: u8 = 0x0;
pub const LOG_SUDT_PAY_FEE: u8 = 0x1;

/// Longest accepted short address.
pub const MAX_SHORT_ADDRESS_LEN: usize = 32;

/// Key-space flags inside an sUDT account.
const SUDT_KEY_FLAG_BALANCE: u32 = 1;
const SUDT_KEY_FLAG_ALLOWANCE: u32 = 2;

/// The total-supply entry sits under the all-ones user key.
pub const SUDT_TOTAL_SUPPLY_KEY: [u8; 32] = [0xFF; 32];

/// `u32le(1) ‖ u32le(addr_len) ‖ addr` — the balance slot for an address.
pub fn balance_key(short_address: &[u8]) -> ([u8; 8 + MAX_SHORT_ADDRESS_LEN], usize) {
    let mut key = [0u8; 8 + MAX_SHORT_ADDRESS_LEN];
    key[..4].copy_from_slice(&SUDT_KEY_FLAG_BALANCE.to_le_bytes());
    key[4..8].copy_from_slice(&(short_address.len() as u32).to_le_bytes());
    key[8..8 + short_address.len()].copy_from_slice(short_address);
    (key, 8 + short_address.len())
}

/// `u32le(2) ‖ u32le(owner) ‖ u32le(spender)` — an allowance slot.
pub fn allowance_key(owner_id: u32, spender_id: u32) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..4].copy_from_slice(&SUDT_KEY_FLAG_ALLOWANCE.to_le_bytes());
    key[4..8].copy_from_slice(&owner_id.to_le_bytes());
    key[8..12].copy_from_slice(&spender_id.to_le_bytes());
    key
}

/// Check that `sudt_id` really is an sUDT contract instance: its script's
/// code hash must equal the configured sUDT validator type hash, bound by
/// type.
pub fn verify_sudt_account<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
) -> Result<(), ErrorCode> {
    let mut script_buf = [0u8; MAX_SCRIPT_SIZE];
    let script_len = match ctx.get_account_script(sudt_id, 0, &mut script_buf) {
        Ok(len) => len,
        Err(ErrorCode::NotFound) => return Err(ErrorCode::AccountNotExists),
        Err(err) => return Err(err),
    };
    let script = Script::parse(&script_buf[..script_len]).map_err(|_| {
        log::debug!("sudt account script does not parse");
        ErrorCode::FatalInvalidSudtScript
    })?;

    let config = ctx.rollup_config()?;
    if script.code_hash != config.l2_sudt_validator_script_type_hash
        || script.hash_type != SCRIPT_HASH_TYPE_TYPE
    {
        return Err(ErrorCode::FatalInvalidSudtScript);
    }
    Ok(())
}

fn fetch_balance<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
    short_address: &[u8],
) -> Result<U256, ErrorCode> {
    let (key, key_len) = balance_key(short_address);
    let value = ctx.load(sudt_id, &key[..key_len])?;
    Ok(U256::from_le_bytes(&value))
}

fn write_balance<H: ChainHost>(
    ctx: &mut Context<H>,
    sudt_id: u32,
    short_address: &[u8],
    balance: U256,
) -> Result<(), ErrorCode> {
    let (key, key_len) = balance_key(short_address);
    ctx.store(sudt_id, &key[..key_len], &balance.to_le_bytes())
}

fn emit_log<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
    service_flag: u8,
) -> Result<(), ErrorCode> {
    // In validator mode the log carries no payload; only the account
    // existence check and the flag matter.
    ctx.log(sudt_id, service_flag, &[])
}

/// Balance of `short_address` in `sudt_id`.
pub fn get_balance<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
    short_address: &[u8],
) -> Result<U256, ErrorCode> {
    if short_address.len() > MAX_SHORT_ADDRESS_LEN {
        return Err(ErrorCode::ShortAddrLen);
    }
    verify_sudt_account(ctx, sudt_id)?;
    fetch_balance(ctx, sudt_id, short_address)
}

fn transfer_inner<H: ChainHost>(
    ctx: &mut Context<H>,
    sudt_id: u32,
    from_addr: &[u8],
    to_addr: &[u8],
    amount: U256,
    service_flag: u8,
) -> Result<(), ErrorCode> {
    let from_balance = fetch_balance(ctx, sudt_id, from_addr)?;
    if from_balance < amount {
        log::debug!("transfer: insufficient balance");
        return Err(ErrorCode::InsufficientBalance);
    }
    if from_addr == to_addr {
        log::debug!("transfer: [warning] transfer to self");
    }

    let new_from_balance = from_balance.checked_sub(amount)?;
    write_balance(ctx, sudt_id, from_addr, new_from_balance)?;

    // Read AFTER the debit so a self-transfer observes its own deduction.
    let to_balance = fetch_balance(ctx, sudt_id, to_addr)?;
    let new_to_balance = to_balance.checked_add(amount).inspect_err(|_| {
        log::debug!("transfer: balance overflow");
    })?;
    write_balance(ctx, sudt_id, to_addr, new_to_balance)?;

    emit_log(ctx, sudt_id, service_flag)
}

/// Move `amount` from one address to another inside `sudt_id`.
pub fn transfer<H: ChainHost>(
    ctx: &mut Context<H>,
    sudt_id: u32,
    from_addr: &[u8],
    to_addr: &[u8],
    amount: U256,
) -> Result<(), ErrorCode> {
    if from_addr.len() > MAX_SHORT_ADDRESS_LEN || to_addr.len() > MAX_SHORT_ADDRESS_LEN {
        return Err(ErrorCode::ShortAddrLen);
    }
    verify_sudt_account(ctx, sudt_id)?;
    transfer_inner(ctx, sudt_id, from_addr, to_addr, amount, LOG_SUDT_TRANSFER)
}

/// Pay a fee: transfer to the block producer's address (the producer's
/// script hash truncated to the payer address length), then notify the host.
pub fn pay_fee<H: ChainHost>(
    ctx: &mut Context<H>,
    sudt_id: u32,
    payer_addr: &[u8],
    amount: U256,
) -> Result<(), ErrorCode> {
    if payer_addr.len() > MAX_SHORT_ADDRESS_LEN {
        return Err(ErrorCode::ShortAddrLen);
    }
    verify_sudt_account(ctx, sudt_id)?;

    let producer_id = ctx.block_info.block_producer_id;
    let producer_script_hash = ctx.get_script_hash_by_account_id(producer_id)?;
    transfer_inner(
        ctx,
        sudt_id,
        payer_addr,
        &producer_script_hash[..payer_addr.len()],
        amount,
        LOG_SUDT_PAY_FEE,
    )?;

    // The transfer above moved the state; the syscall only records the event.
    ctx.pay_fee(payer_addr, sudt_id, amount)
}

/// The token's total supply, maintained by deposits and withdrawals.
pub fn get_total_supply<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
) -> Result<U256, ErrorCode> {
    verify_sudt_account(ctx, sudt_id)?;
    let value = ctx.load(sudt_id, &SUDT_TOTAL_SUPPLY_KEY)?;
    Ok(U256::from_le_bytes(&value))
}

/// Spending allowance granted by `owner_id` to `spender_id`.
pub fn get_allowance<H: ChainHost>(
    ctx: &Context<H>,
    sudt_id: u32,
    owner_id: u32,
    spender_id: u32,
) -> Result<U256, ErrorCode> {
    verify_sudt_account(ctx, sudt_id)?;
    let value = ctx.load(sudt_id, &allowance_key(owner_id, spender_id))?;
    Ok(U256::from_le_bytes(&value))
}

/// Record an allowance. The caller is responsible for `owner_id` being the
/// acting account — this is a state utility, not an authorization check.
pub fn set_allowance<H: ChainHost>(
    ctx: &mut Context<H>,
    sudt_id: u32,
    owner_id: u32,
    spender_id: u32,
    amount: U256,
) -> Result<(), ErrorCode> {
    verify_sudt_account(ctx, sudt_id)?;
    ctx.store(
        sudt_id,
        &allowance_key(owner_id, spender_id),
        &amount.to_le_bytes(),
    )
}
