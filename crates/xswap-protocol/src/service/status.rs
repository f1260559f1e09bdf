//! Status derivation against live ledgers.

use super::ProtocolEngine;
use crate::algorithms::{derive_status, Derivation, EnvelopeObservation, LegObservation, Observation};
use crate::domain::{ChainSide, LedgerError, SwapError, SwapStatus};
use crate::ports::outbound::{LedgerAdapter, TimeSource, TradeStore};
use tracing::{debug, warn};

impl<A, B, S, T> ProtocolEngine<A, B, S, T>
where
    A: LedgerAdapter,
    B: LedgerAdapter,
    S: TradeStore,
    T: TimeSource,
{
    /// Current status, recomputed from both ledgers.
    pub async fn status(&self) -> Result<SwapStatus, SwapError> {
        Ok(self.derive().await?.status)
    }

    /// Current status, failing with `LedgerInconsistency` instead of
    /// returning `ERROR`.
    pub async fn verify(&self) -> Result<SwapStatus, SwapError> {
        let derivation = self.derive().await?;
        match derivation.status {
            SwapStatus::Error => Err(SwapError::LedgerInconsistency(
                derivation
                    .inconsistency
                    .unwrap_or_else(|| "unknown inconsistency".into()),
            )),
            status => Ok(status),
        }
    }

    /// Query both legs concurrently and evaluate the checklist.
    pub async fn derive(&self) -> Result<Derivation, SwapError> {
        let (chain_a, chain_b) = tokio::try_join!(
            self.observe(ChainSide::ChainA),
            self.observe(ChainSide::ChainB)
        )?;
        let now = self.clock.now();
        let derivation = derive_status(&self.trade, &Observation { chain_a, chain_b }, now);

        if let Some(reason) = &derivation.inconsistency {
            warn!("[xswap] Trade inconsistent with ledger state: {}", reason);
        }
        debug!(
            "[xswap] Status {} ({}) at {}",
            derivation.status,
            derivation.status.code(),
            now
        );
        Ok(derivation)
    }

    async fn observe(&self, side: ChainSide) -> Result<LegObservation, SwapError> {
        let leg = self.trade.leg(side);
        let ledger = self.ledger(side);

        let envelope = match &leg.refund_tx {
            None => EnvelopeObservation::Missing,
            Some(envelope) => match ledger.inspect_envelope(envelope) {
                Ok(terms) => EnvelopeObservation::Decoded(terms),
                Err(e) => EnvelopeObservation::Undecodable(e.to_string()),
            },
        };

        let Some(account) = &leg.holding_account else {
            return Ok(LegObservation::unprepared(envelope));
        };

        let (exists, valid, closed) = tokio::try_join!(
            ledger.account_exists(account),
            ledger.is_valid_escrow(account, &leg.withdrawer, &self.trade.commitment),
            ledger.is_escrow_closed(account, &leg.withdrawer)
        )?;

        let balance = if exists {
            match ledger.get_balance(account).await {
                Ok(balance) => balance,
                Err(LedgerError::AccountNotFound(_)) => 0,
                Err(e) => return Err(e.into()),
            }
        } else {
            0
        };

        debug!(
            "[xswap] {} escrow {}: exists={} valid={} closed={} balance={}",
            side, account, exists, valid, closed, balance
        );
        Ok(LegObservation {
            exists,
            valid,
            closed,
            balance,
            envelope,
        })
    }
}
