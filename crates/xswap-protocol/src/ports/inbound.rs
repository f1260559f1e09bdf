//! # Inbound Ports
//!
//! API trait defining what the swap engine can do for the local party.

use crate::algorithms::Derivation;
use crate::domain::{ChainSide, SecureSecret, SwapError, SwapStatus, Trade, TxRef};
use async_trait::async_trait;

/// Swap protocol API - inbound port.
///
/// Every mutating operation persists the trade record on success.
#[async_trait]
pub trait SwapProtocolApi: Send {
    /// Create the escrow for `side` and record it as the holding account.
    async fn prepare_leg(&mut self, side: ChainSide) -> Result<(), SwapError>;

    /// As the withdrawer of `side`, pre-sign the refund envelope.
    async fn create_refund_tx(&mut self, side: ChainSide) -> Result<(), SwapError>;

    /// As the depositor of `side`, top the escrow up to the amount.
    /// `None` when it is already funded.
    async fn deposit(&mut self, side: ChainSide) -> Result<Option<TxRef>, SwapError>;

    /// As the withdrawer of `side`, claim the escrow with the preimage.
    async fn fulfill(&mut self, side: ChainSide, secret: &SecureSecret)
        -> Result<TxRef, SwapError>;

    /// Submit the refund envelope of `side`.
    async fn refund(&mut self, side: ChainSide) -> Result<TxRef, SwapError>;

    /// Derive the current status from both ledgers.
    async fn status(&self) -> Result<SwapStatus, SwapError>;

    /// Derive the current status with the inconsistency reason, if any.
    async fn derive(&self) -> Result<Derivation, SwapError>;

    /// Like [`Self::status`], but `ERROR` becomes `Err(LedgerInconsistency)`.
    async fn verify(&self) -> Result<SwapStatus, SwapError>;

    /// Preimage published by the withdrawal on `side`, checked against the
    /// commitment.
    async fn revealed_secret(&self, side: ChainSide) -> Result<Option<SecureSecret>, SwapError>;

    /// Merge the counterparty's copy of the trade. Returns whether anything
    /// changed.
    fn absorb(&mut self, remote: &Trade) -> Result<bool, SwapError>;

    /// The locally held trade record.
    fn trade(&self) -> &Trade;
}
