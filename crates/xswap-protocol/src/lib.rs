//! # xswap Protocol Engine
//!
//! Trustless exchange of value across two independent ledgers using
//! hash-and-time-locked escrows.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Each leg of a swap locks funds in an escrow account on its own ledger:
//! - Withdraw path: the preimage of the shared SHA-256 commitment
//! - Refund path: an envelope pre-signed by the withdrawer, valid only from
//!   the leg's timelock
//! - The leg opened second expires no later than the first
//!
//! The swap status is never stored. [`ProtocolEngine`] re-derives it from
//! both ledgers on every call.
//!
//! ## Module Structure
//!
//! ```text
//! xswap-protocol/
//! ├── domain/          # Trade, Leg, SwapStatus, keys, errors, invariants
//! ├── algorithms/      # Secrets, timelocks, status checklist
//! ├── ports/           # SwapProtocolApi, LedgerAdapter, TradeStore, TimeSource
//! ├── adapters/        # InMemoryLedger, trade stores, clocks
//! ├── service/         # ProtocolEngine
//! ├── exchange.rs      # Export/import/sign trade files
//! └── config.rs        # ProtocolConfig, PartyConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod exchange;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{FileTradeStore, InMemoryLedger, InMemoryTradeStore, ManualClock, SystemTimeSource};
pub use algorithms::{
    calculate_timelocks, create_commitment, derive_status, generate_random_secret,
    new_secret_pair, validate_swap_timelocks, verify_refund, verify_secret, Derivation,
    EnvelopeObservation, LegObservation, Observation,
};
pub use config::{ConfigError, PartyConfig, ProtocolConfig};
pub use domain::{
    invariant_not_self_dealing, invariant_positive_amount, invariant_refund_terms,
    invariant_secret_matches, invariant_timelock_ordering, verify_signature, Address, ChainSide,
    Commitment, ErrorCategory, Hash, LedgerError, Leg, PartyIdentity, PartyKey, RefundEnvelope,
    RefundTerms, Role, SecureSecret, StoreError, SwapError, SwapStatus, Trade, TradeBuilder,
    TradeId, TxRef,
};
pub use exchange::{export_trade, import_trade, parse_commitment, sign_trade_file, verify_trade_signature};
pub use ports::{LedgerAdapter, SwapProtocolApi, TimeSource, TradeStore};
pub use service::{ProtocolDependencies, ProtocolEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
