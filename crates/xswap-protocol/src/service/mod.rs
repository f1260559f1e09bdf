//! # Protocol Engine
//!
//! Binds the local party, one trade record, a ledger adapter per chain, a
//! trade store and a clock, and implements [`SwapProtocolApi`].
//!
//! ## Architecture
//!
//! - `lifecycle`: escrow creation, refund pre-authorization, deposit,
//!   fulfill, refund, trade merging
//! - `status`: concurrent ledger observation fed into the pure checklist
//!
//! The engine never caches a status. Every mutating operation persists the
//! trade record before returning.

mod lifecycle;
mod status;

use crate::algorithms::Derivation;
use crate::config::ProtocolConfig;
use crate::domain::{
    ChainSide, PartyIdentity, Role, SecureSecret, SwapError, SwapStatus, Trade, TxRef,
};
use crate::ports::inbound::SwapProtocolApi;
use crate::ports::outbound::{LedgerAdapter, TimeSource, TradeStore};
use async_trait::async_trait;
use tracing::info;

/// The swap protocol engine for one party and one trade.
pub struct ProtocolEngine<A, B, S, T>
where
    A: LedgerAdapter,
    B: LedgerAdapter,
    S: TradeStore,
    T: TimeSource,
{
    /// Chain A ledger.
    pub(crate) chain_a: A,
    /// Chain B ledger.
    pub(crate) chain_b: B,
    /// Trade persistence.
    pub(crate) store: S,
    /// Time source for timelock checks.
    pub(crate) clock: T,
    /// Local party keys.
    pub(crate) identity: PartyIdentity,
    /// Protocol parameters.
    pub(crate) config: ProtocolConfig,
    /// Locally held trade record.
    pub(crate) trade: Trade,
}

/// Dependencies for ProtocolEngine
pub struct ProtocolDependencies<A, B, S, T> {
    pub chain_a: A,
    pub chain_b: B,
    pub store: S,
    pub clock: T,
}

impl<A, B, S, T> ProtocolEngine<A, B, S, T>
where
    A: LedgerAdapter,
    B: LedgerAdapter,
    S: TradeStore,
    T: TimeSource,
{
    /// Create an engine around `trade`.
    ///
    /// The trade is validated first. An imported trade that already carries
    /// an id but is unknown to the local store is saved immediately.
    pub fn new(
        deps: ProtocolDependencies<A, B, S, T>,
        identity: PartyIdentity,
        config: ProtocolConfig,
        trade: Trade,
    ) -> Result<Self, SwapError> {
        trade.validate()?;

        let engine = Self {
            chain_a: deps.chain_a,
            chain_b: deps.chain_b,
            store: deps.store,
            clock: deps.clock,
            identity,
            config,
            trade,
        };

        if let Some(id) = engine.trade.id {
            if engine.store.get(&id)?.is_none() {
                engine.store.save(&engine.trade)?;
                info!("[xswap] Imported trade {} into local store", id);
            }
        }

        Ok(engine)
    }

    /// The locally held trade record.
    pub fn trade(&self) -> &Trade {
        &self.trade
    }

    /// Protocol parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Local party keys.
    pub fn identity(&self) -> &PartyIdentity {
        &self.identity
    }

    /// Local party funds `side`.
    pub fn is_depositor(&self, side: ChainSide) -> bool {
        self.identity.address(side) == self.trade.leg(side).depositor
    }

    /// Local party claims `side`.
    pub fn is_withdrawer(&self, side: ChainSide) -> bool {
        self.identity.address(side) == self.trade.leg(side).withdrawer
    }

    pub(crate) fn ledger(&self, side: ChainSide) -> &dyn LedgerAdapter {
        match side {
            ChainSide::ChainA => &self.chain_a,
            ChainSide::ChainB => &self.chain_b,
        }
    }

    pub(crate) fn require_role(&self, side: ChainSide, role: Role) -> Result<(), SwapError> {
        let holds = match role {
            Role::Depositor => self.is_depositor(side),
            Role::Withdrawer => self.is_withdrawer(side),
        };
        if !holds {
            return Err(SwapError::RoleViolation { side, role });
        }
        Ok(())
    }

    /// Write the current trade record to the store again.
    ///
    /// A mutating operation whose final save fails returns the store error
    /// but keeps the ledger-side result in memory (the escrow address of
    /// `prepare_leg`, the envelope of `create_refund_tx`). Call this to
    /// retry the save.
    pub fn save(&mut self) -> Result<(), SwapError> {
        self.persist()
    }

    /// Save the trade, adopting the id the store assigns.
    pub(crate) fn persist(&mut self) -> Result<(), SwapError> {
        self.trade = self.store.save(&self.trade)?;
        Ok(())
    }
}

#[async_trait]
impl<A, B, S, T> SwapProtocolApi for ProtocolEngine<A, B, S, T>
where
    A: LedgerAdapter,
    B: LedgerAdapter,
    S: TradeStore,
    T: TimeSource,
{
    async fn prepare_leg(&mut self, side: ChainSide) -> Result<(), SwapError> {
        ProtocolEngine::prepare_leg(self, side).await
    }

    async fn create_refund_tx(&mut self, side: ChainSide) -> Result<(), SwapError> {
        ProtocolEngine::create_refund_tx(self, side).await
    }

    async fn deposit(&mut self, side: ChainSide) -> Result<Option<TxRef>, SwapError> {
        ProtocolEngine::deposit(self, side).await
    }

    async fn fulfill(
        &mut self,
        side: ChainSide,
        secret: &SecureSecret,
    ) -> Result<TxRef, SwapError> {
        ProtocolEngine::fulfill(self, side, secret).await
    }

    async fn refund(&mut self, side: ChainSide) -> Result<TxRef, SwapError> {
        ProtocolEngine::refund(self, side).await
    }

    async fn status(&self) -> Result<SwapStatus, SwapError> {
        ProtocolEngine::status(self).await
    }

    async fn derive(&self) -> Result<Derivation, SwapError> {
        ProtocolEngine::derive(self).await
    }

    async fn verify(&self) -> Result<SwapStatus, SwapError> {
        ProtocolEngine::verify(self).await
    }

    async fn revealed_secret(&self, side: ChainSide) -> Result<Option<SecureSecret>, SwapError> {
        ProtocolEngine::revealed_secret(self, side).await
    }

    fn absorb(&mut self, remote: &Trade) -> Result<bool, SwapError> {
        ProtocolEngine::absorb(self, remote)
    }

    fn trade(&self) -> &Trade {
        &self.trade
    }
}
