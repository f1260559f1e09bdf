//! # Trade Exchange
//!
//! The out-of-band boundary between counterparties: the trade record is
//! exported as JSON, carried by any channel, and imported on the other side.
//! Detached ed25519 signatures let the receiver check who authored a file.

use crate::domain::{verify_signature, Address, Commitment, PartyKey, SwapError, Trade};

pub use crate::algorithms::new_secret_pair;

/// Pretty JSON for handing to the counterparty.
pub fn export_trade(trade: &Trade) -> Result<String, SwapError> {
    Ok(serde_json::to_string_pretty(trade)?)
}

/// Parse and validate a trade received from the counterparty.
pub fn import_trade(json: &str) -> Result<Trade, SwapError> {
    let trade: Trade = serde_json::from_str(json)?;
    trade.validate()?;
    Ok(trade)
}

/// Parse a commitment, with or without a `0x` prefix.
pub fn parse_commitment(s: &str) -> Result<Commitment, SwapError> {
    Commitment::from_hex(s.trim()).map_err(SwapError::InvalidTrade)
}

/// Hex ed25519 signature over the raw bytes of a trade file.
pub fn sign_trade_file(key: &PartyKey, bytes: &[u8]) -> String {
    key.sign_hex(bytes)
}

/// Check a detached trade file signature against `address`.
pub fn verify_trade_signature(
    address: &Address,
    signature_hex: &str,
    bytes: &[u8],
) -> Result<(), SwapError> {
    verify_signature(address, bytes, signature_hex)
}
