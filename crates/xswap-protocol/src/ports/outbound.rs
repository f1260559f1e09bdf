//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the engine requires the host to provide: one ledger adapter
//! per chain, a trade store and a clock.

use crate::domain::{
    Address, Commitment, LedgerError, PartyKey, RefundEnvelope, RefundTerms, SecureSecret,
    StoreError, Trade, TradeId, TxRef,
};
use async_trait::async_trait;

/// Escrow operations on one ledger.
///
/// Reference implementation: [`crate::adapters::InMemoryLedger`].
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Create an escrow account controlled by `new_account_key`, funded by
    /// `local_signer`, claimable by `counterparty` with the preimage of
    /// `commitment`. The creating key's authority is removed afterwards.
    async fn create_escrow(
        &self,
        new_account_key: &PartyKey,
        local_signer: &PartyKey,
        counterparty: &Address,
        commitment: &Commitment,
    ) -> Result<Address, LedgerError>;

    /// Current balance. `AccountNotFound` if the account does not exist.
    async fn get_balance(&self, account: &Address) -> Result<u64, LedgerError>;

    /// Transfer `amount` from the signer into `account`.
    async fn fund_escrow(
        &self,
        local_signer: &PartyKey,
        account: &Address,
        amount: u64,
    ) -> Result<TxRef, LedgerError>;

    /// Pre-sign a refund of `account` to `depositor`, executable no earlier
    /// than `not_before`. Signed by the escrow's withdrawer.
    async fn build_refund_envelope(
        &self,
        account: &Address,
        signer: &PartyKey,
        depositor: &Address,
        not_before: u64,
        amount: u64,
    ) -> Result<RefundEnvelope, LedgerError>;

    /// Submit a refund envelope.
    async fn submit_envelope(&self, envelope: &RefundEnvelope) -> Result<TxRef, LedgerError>;

    /// Drain `account` to its withdrawer, revealing `secret`.
    async fn withdraw_with_preimage(
        &self,
        account: &Address,
        local_signer: &PartyKey,
        secret: &SecureSecret,
        amount: u64,
    ) -> Result<TxRef, LedgerError>;

    /// True when the account is restricted to exactly the withdraw path for
    /// `expected_withdrawer` and `commitment` plus a pre-signed refund path.
    async fn is_valid_escrow(
        &self,
        account: &Address,
        expected_withdrawer: &Address,
        commitment: &Commitment,
    ) -> Result<bool, LedgerError>;

    /// True when the account was merged into `expected_withdrawer`.
    async fn is_escrow_closed(
        &self,
        account: &Address,
        expected_withdrawer: &Address,
    ) -> Result<bool, LedgerError>;

    /// True when the account exists.
    async fn account_exists(&self, account: &Address) -> Result<bool, LedgerError>;

    /// Decode what a refund envelope commits to. No ledger access.
    fn inspect_envelope(&self, envelope: &RefundEnvelope) -> Result<RefundTerms, LedgerError>;

    /// Preimage revealed by a withdrawal from `account`, if any.
    async fn revealed_preimage(
        &self,
        account: &Address,
    ) -> Result<Option<SecureSecret>, LedgerError>;
}

/// Durable storage for trade records.
///
/// Production: [`crate::adapters::FileTradeStore`]
/// Testing: [`crate::adapters::InMemoryTradeStore`]
pub trait TradeStore: Send + Sync {
    /// Persist `trade`, assigning an id if it has none. Returns the stored
    /// record.
    fn save(&self, trade: &Trade) -> Result<Trade, StoreError>;

    /// Fetch a trade by id.
    fn get(&self, id: &TradeId) -> Result<Option<Trade>, StoreError>;

    /// Ids of all stored trades.
    fn list(&self) -> Result<Vec<TradeId>, StoreError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<S: TradeStore + ?Sized> TradeStore for std::sync::Arc<S> {
    fn save(&self, trade: &Trade) -> Result<Trade, StoreError> {
        (**self).save(trade)
    }

    fn get(&self, id: &TradeId) -> Result<Option<Trade>, StoreError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<TradeId>, StoreError> {
        (**self).list()
    }
}
