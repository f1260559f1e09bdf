//! Escrow lifecycle operations.

use super::ProtocolEngine;
use crate::algorithms::{validate_swap_timelocks, verify_refund, verify_secret};
use crate::domain::{
    invariant_not_self_dealing, invariant_positive_amount, invariant_refund_terms, ChainSide,
    PartyKey, Role, SecureSecret, SwapError, Trade, TxRef,
};
use crate::ports::outbound::{LedgerAdapter, TimeSource, TradeStore};
use tracing::{debug, info, warn};

impl<A, B, S, T> ProtocolEngine<A, B, S, T>
where
    A: LedgerAdapter,
    B: LedgerAdapter,
    S: TradeStore,
    T: TimeSource,
{
    /// Create the escrow for `side`, bound to the commitment and the leg's
    /// withdrawer, and record it as the holding account.
    ///
    /// The first successful call also fixes `initialSide`. If only the final
    /// save fails, the escrow stays recorded in memory; retry with
    /// [`ProtocolEngine::save`].
    pub async fn prepare_leg(&mut self, side: ChainSide) -> Result<(), SwapError> {
        let leg = self.trade.leg(side).clone();
        if leg.holding_account.is_some() {
            return Err(SwapError::AlreadyPrepared(side));
        }
        invariant_positive_amount(side, &leg)?;
        let local = self.identity.key(side).clone();
        invariant_not_self_dealing(side, &local.address(), &leg)?;
        validate_swap_timelocks(&self.trade, side, &self.config)?;

        let commitment = self.trade.commitment;
        let escrow_key = PartyKey::generate();
        let ledger = self.ledger(side);
        let account = ledger
            .create_escrow(&escrow_key, &local, &leg.withdrawer, &commitment)
            .await?;
        if !ledger
            .is_valid_escrow(&account, &leg.withdrawer, &commitment)
            .await?
        {
            warn!(
                "[xswap] {} escrow {} failed validation right after creation",
                side, account
            );
            return Err(SwapError::LedgerInconsistency(format!(
                "{} escrow {} does not carry the required authorization",
                side, account
            )));
        }

        self.trade.set_holding_account(side, account.clone())?;
        self.trade.mark_initial_side(side);
        if let Err(e) = self.persist() {
            warn!(
                "[xswap] {} escrow {} created but not saved: {}",
                side, account, e
            );
            return Err(e);
        }

        info!(
            "[xswap] Prepared {} holding account {} (timelock {})",
            side, account, leg.timelock
        );
        Ok(())
    }

    /// As the withdrawer of `side`, pre-sign the refund envelope paying the
    /// depositor no earlier than the leg's timelock.
    ///
    /// No-op when an envelope is already recorded.
    pub async fn create_refund_tx(&mut self, side: ChainSide) -> Result<(), SwapError> {
        self.require_role(side, Role::Withdrawer)?;
        let leg = self.trade.leg(side).clone();
        let account = leg
            .holding_account
            .clone()
            .ok_or(SwapError::MissingHoldingAccount(side))?;
        if leg.refund_tx.is_some() {
            debug!("[xswap] {} refund tx already present", side);
            return Ok(());
        }

        let commitment = self.trade.commitment;
        let local = self.identity.key(side).clone();
        let ledger = self.ledger(side);
        if !ledger
            .is_valid_escrow(&account, &leg.withdrawer, &commitment)
            .await?
        {
            warn!("[xswap] Refusing to sign refund for invalid escrow {}", account);
            return Err(SwapError::LedgerInconsistency(format!(
                "{} escrow {} does not validate",
                side, account
            )));
        }
        let envelope = ledger
            .build_refund_envelope(&account, &local, &leg.depositor, leg.timelock, leg.amount)
            .await?;

        self.trade.set_refund_tx(side, envelope)?;
        self.persist()?;

        info!(
            "[xswap] Created {} refund tx for {} (not before {})",
            side, leg.depositor, leg.timelock
        );
        Ok(())
    }

    /// As the depositor of `side`, top the escrow up to the leg amount.
    ///
    /// Requires a refund envelope matching the leg and a valid escrow.
    /// Returns `None` when the balance already covers the amount.
    pub async fn deposit(&mut self, side: ChainSide) -> Result<Option<TxRef>, SwapError> {
        self.require_role(side, Role::Depositor)?;
        let leg = self.trade.leg(side).clone();
        let account = leg
            .holding_account
            .clone()
            .ok_or(SwapError::MissingHoldingAccount(side))?;
        let envelope = leg
            .refund_tx
            .clone()
            .ok_or(SwapError::MissingRefundTx(side))?;

        let commitment = self.trade.commitment;
        let local = self.identity.key(side).clone();
        let ledger = self.ledger(side);

        let terms = ledger.inspect_envelope(&envelope).map_err(|e| {
            SwapError::LedgerInconsistency(format!("{} refund tx unreadable: {}", side, e))
        })?;
        invariant_refund_terms(&leg, &terms).map_err(|reason| {
            warn!("[xswap] {} refund tx mismatch: {}", side, reason);
            SwapError::LedgerInconsistency(format!("{} refund tx mismatch: {}", side, reason))
        })?;
        if !ledger
            .is_valid_escrow(&account, &leg.withdrawer, &commitment)
            .await?
        {
            warn!("[xswap] Refusing to fund invalid escrow {}", account);
            return Err(SwapError::LedgerInconsistency(format!(
                "{} escrow {} does not validate",
                side, account
            )));
        }

        let balance = ledger.get_balance(&account).await?;
        if balance >= leg.amount {
            debug!(
                "[xswap] {} escrow {} already funded ({}/{})",
                side, account, balance, leg.amount
            );
            return Ok(None);
        }

        let top_up = leg.amount - balance;
        let tx = ledger.fund_escrow(&local, &account, top_up).await?;
        info!(
            "[xswap] Deposited {} into {} escrow {} ({})",
            top_up, side, account, tx
        );
        Ok(Some(tx))
    }

    /// As the withdrawer of `side`, claim the escrow with the preimage.
    ///
    /// A wrong secret fails before any ledger call. The escrow must hold the
    /// full amount and still validate; otherwise the secret is never handed
    /// to the ledger.
    pub async fn fulfill(
        &mut self,
        side: ChainSide,
        secret: &SecureSecret,
    ) -> Result<TxRef, SwapError> {
        verify_secret(secret, &self.trade.commitment)?;
        self.require_role(side, Role::Withdrawer)?;
        let leg = self.trade.leg(side).clone();
        let account = leg
            .holding_account
            .clone()
            .ok_or(SwapError::MissingHoldingAccount(side))?;

        let ledger = self.ledger(side);
        let balance = ledger.get_balance(&account).await?;
        if balance < leg.amount {
            warn!(
                "[xswap] Refusing to reveal secret on {} escrow {}: balance {} < {}",
                side, account, balance, leg.amount
            );
            return Err(SwapError::Precondition(format!(
                "{} escrow {} holds {} of {}",
                side, account, balance, leg.amount
            )));
        }
        if !ledger
            .is_valid_escrow(&account, &leg.withdrawer, &self.trade.commitment)
            .await?
        {
            return Err(SwapError::LedgerInconsistency(format!(
                "{} escrow {} is not bound to the withdrawer and commitment",
                side, account
            )));
        }

        let local = self.identity.key(side).clone();
        let tx = ledger
            .withdraw_with_preimage(&account, &local, secret, leg.amount)
            .await?;

        info!("[xswap] Fulfilled {} escrow {} ({})", side, account, tx);
        Ok(tx)
    }

    /// Submit the refund envelope of `side`. Rejected locally before the
    /// leg's timelock.
    pub async fn refund(&mut self, side: ChainSide) -> Result<TxRef, SwapError> {
        let leg = self.trade.leg(side).clone();
        let envelope = leg
            .refund_tx
            .clone()
            .ok_or(SwapError::MissingRefundTx(side))?;
        verify_refund(side, self.clock.now(), leg.timelock)?;

        let tx = self.ledger(side).submit_envelope(&envelope).await?;
        info!(
            "[xswap] Refunded {} escrow to {} ({})",
            side, leg.depositor, tx
        );
        Ok(tx)
    }

    /// Preimage revealed by the withdrawal on `side`, checked against the
    /// commitment.
    pub async fn revealed_secret(
        &self,
        side: ChainSide,
    ) -> Result<Option<SecureSecret>, SwapError> {
        let account = self
            .trade
            .leg(side)
            .holding_account
            .clone()
            .ok_or(SwapError::MissingHoldingAccount(side))?;

        match self.ledger(side).revealed_preimage(&account).await? {
            None => Ok(None),
            Some(secret) if secret.opens(&self.trade.commitment) => {
                debug!("[xswap] Read revealed secret from {} escrow {}", side, account);
                Ok(Some(secret))
            }
            Some(_) => Err(SwapError::LedgerInconsistency(format!(
                "{} escrow {} revealed a preimage for another commitment",
                side, account
            ))),
        }
    }

    /// Merge the counterparty's copy of the trade and persist the result.
    pub fn absorb(&mut self, remote: &Trade) -> Result<bool, SwapError> {
        let changed = self.trade.absorb(remote)?;
        if changed {
            self.persist()?;
            info!("[xswap] Absorbed counterparty trade update");
        }
        Ok(changed)
    }
}
