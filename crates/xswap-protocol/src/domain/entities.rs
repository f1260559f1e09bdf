//! # Domain Entities
//!
//! The trade record shared by both counterparties, and its two legs.
//!
//! A trade is mutated only by filling in fields that were previously absent.
//! Both parties hold their own copy and exchange it out of band.

use super::errors::SwapError;
use super::value_objects::{Address, ChainSide, Commitment, RefundEnvelope, TradeId};
use serde::{Deserialize, Serialize};

/// One side of the swap: one ledger, one escrow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    /// Asset identifier on this ledger.
    pub token: String,
    /// Amount in the ledger's smallest unit.
    pub amount: u64,
    /// Funds the escrow.
    pub depositor: Address,
    /// Claims the escrow with the preimage.
    pub withdrawer: Address,
    /// Absolute unix seconds after which the depositor may reclaim.
    pub timelock: u64,
    /// Escrow account, set once by `prepare_leg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_account: Option<Address>,
    /// Refund envelope, set once by `create_refund_tx`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_tx: Option<RefundEnvelope>,
}

impl Leg {
    /// Unprepared leg.
    pub fn new(
        token: impl Into<String>,
        amount: u64,
        depositor: Address,
        withdrawer: Address,
        timelock: u64,
    ) -> Self {
        Self {
            token: token.into(),
            amount,
            depositor,
            withdrawer,
            timelock,
            holding_account: None,
            refund_tx: None,
        }
    }

    /// Past the timelock.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.timelock
    }

    /// The refund envelope may execute.
    pub fn can_refund(&self, now: u64) -> bool {
        now >= self.timelock
    }

    fn validate(&self, side: ChainSide) -> Result<(), SwapError> {
        if self.amount == 0 {
            return Err(SwapError::InvalidAmount(side));
        }
        if self.token.trim().is_empty() {
            return Err(SwapError::InvalidTrade(format!("{}: empty token", side)));
        }
        if self.depositor.is_empty() || self.withdrawer.is_empty() {
            return Err(SwapError::InvalidTrade(format!("{}: empty party address", side)));
        }
        if self.depositor == self.withdrawer {
            return Err(SwapError::InvalidTrade(format!(
                "{}: depositor and withdrawer are the same account",
                side
            )));
        }
        Ok(())
    }
}

/// Shared description of one swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Assigned by the trade store on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TradeId>,
    /// `sha256(secret)`, shared by both escrows.
    pub commitment: Commitment,
    /// Leg whose escrow was created first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_side: Option<ChainSide>,
    /// Leg on chain A.
    pub chain_a: Leg,
    /// Leg on chain B.
    pub chain_b: Leg,
}

impl Trade {
    /// Fresh trade with no id and no prepared legs.
    pub fn new(commitment: Commitment, chain_a: Leg, chain_b: Leg) -> Self {
        Self {
            id: None,
            commitment,
            initial_side: None,
            chain_a,
            chain_b,
        }
    }

    /// Builder for a fresh trade.
    pub fn builder(commitment: Commitment) -> TradeBuilder {
        TradeBuilder::new(commitment)
    }

    /// Leg on `side`.
    pub fn leg(&self, side: ChainSide) -> &Leg {
        match side {
            ChainSide::ChainA => &self.chain_a,
            ChainSide::ChainB => &self.chain_b,
        }
    }

    fn leg_mut(&mut self, side: ChainSide) -> &mut Leg {
        match side {
            ChainSide::ChainA => &mut self.chain_a,
            ChainSide::ChainB => &mut self.chain_b,
        }
    }

    /// The leg prepared second, once the first is known.
    pub fn second_side(&self) -> Option<ChainSide> {
        self.initial_side.map(ChainSide::other)
    }

    /// Static checks that hold for any trade, prepared or not.
    pub fn validate(&self) -> Result<(), SwapError> {
        self.chain_a.validate(ChainSide::ChainA)?;
        self.chain_b.validate(ChainSide::ChainB)?;
        Ok(())
    }

    /// Record the escrow account. Fails if one is already set.
    pub fn set_holding_account(
        &mut self,
        side: ChainSide,
        account: Address,
    ) -> Result<(), SwapError> {
        let leg = self.leg_mut(side);
        if leg.holding_account.is_some() {
            return Err(SwapError::AlreadyPrepared(side));
        }
        leg.holding_account = Some(account);
        Ok(())
    }

    /// Record the refund envelope. Fails if one is already set.
    pub fn set_refund_tx(
        &mut self,
        side: ChainSide,
        envelope: RefundEnvelope,
    ) -> Result<(), SwapError> {
        let leg = self.leg_mut(side);
        if leg.refund_tx.is_some() {
            return Err(SwapError::Precondition(format!(
                "{} already has a refund transaction",
                side
            )));
        }
        leg.refund_tx = Some(envelope);
        Ok(())
    }

    /// Set `initialSide` if it is still unset. Returns whether it changed.
    pub fn mark_initial_side(&mut self, side: ChainSide) -> bool {
        if self.initial_side.is_some() {
            return false;
        }
        self.initial_side = Some(side);
        true
    }

    /// Merge a counterparty's copy of this trade.
    ///
    /// Fields absent here are adopted; equal fields are left alone; any
    /// conflicting field fails the whole merge and leaves `self` untouched.
    /// Returns whether anything was adopted.
    pub fn absorb(&mut self, remote: &Trade) -> Result<bool, SwapError> {
        if self.commitment != remote.commitment {
            return Err(SwapError::LedgerInconsistency(
                "counterparty trade has a different commitment".into(),
            ));
        }

        let mut merged = self.clone();
        let mut changed = false;

        changed |= adopt(&mut merged.id, &remote.id, "id")?;
        changed |= adopt(&mut merged.initial_side, &remote.initial_side, "initialSide")?;

        for side in ChainSide::BOTH {
            let theirs = remote.leg(side);
            let ours = merged.leg_mut(side);
            if ours.token != theirs.token
                || ours.amount != theirs.amount
                || ours.depositor != theirs.depositor
                || ours.withdrawer != theirs.withdrawer
                || ours.timelock != theirs.timelock
            {
                return Err(SwapError::LedgerInconsistency(format!(
                    "counterparty trade disagrees on {} terms",
                    side
                )));
            }
            changed |= adopt(
                &mut ours.holding_account,
                &theirs.holding_account,
                "holdingAccount",
            )?;
            changed |= adopt(&mut ours.refund_tx, &theirs.refund_tx, "refundTx")?;
        }

        *self = merged;
        Ok(changed)
    }
}

fn adopt<T: Clone + PartialEq>(
    ours: &mut Option<T>,
    theirs: &Option<T>,
    field: &str,
) -> Result<bool, SwapError> {
    match (ours.as_ref(), theirs) {
        (_, None) => Ok(false),
        (None, Some(value)) => {
            *ours = Some(value.clone());
            Ok(true)
        }
        (Some(mine), Some(value)) if mine == value => Ok(false),
        (Some(_), Some(_)) => Err(SwapError::LedgerInconsistency(format!(
            "counterparty trade has a conflicting {}",
            field
        ))),
    }
}

/// Builder for [`Trade`].
#[derive(Debug)]
pub struct TradeBuilder {
    commitment: Commitment,
    chain_a: Option<Leg>,
    chain_b: Option<Leg>,
}

impl TradeBuilder {
    /// Start a trade on `commitment`.
    pub fn new(commitment: Commitment) -> Self {
        Self {
            commitment,
            chain_a: None,
            chain_b: None,
        }
    }

    /// Set the chain A leg.
    pub fn chain_a(mut self, leg: Leg) -> Self {
        self.chain_a = Some(leg);
        self
    }

    /// Set the chain B leg.
    pub fn chain_b(mut self, leg: Leg) -> Self {
        self.chain_b = Some(leg);
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<Trade, SwapError> {
        let chain_a = self
            .chain_a
            .ok_or_else(|| SwapError::InvalidTrade("missing chainA leg".into()))?;
        let chain_b = self
            .chain_b
            .ok_or_else(|| SwapError::InvalidTrade("missing chainB leg".into()))?;
        let trade = Trade::new(self.commitment, chain_a, chain_b);
        trade.validate()?;
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn sample_trade() -> Trade {
        Trade::builder(Commitment::of(&[7u8; 32]))
            .chain_a(Leg::new("XLM", 100, addr("alice-a"), addr("bob-a"), 2000))
            .chain_b(Leg::new("ETH", 5, addr("bob-b"), addr("alice-b"), 1000))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validates() {
        let result = Trade::builder(Commitment::of(&[1u8; 32]))
            .chain_a(Leg::new("XLM", 0, addr("a"), addr("b"), 10))
            .chain_b(Leg::new("ETH", 1, addr("b"), addr("a"), 10))
            .build();
        assert!(matches!(result, Err(SwapError::InvalidAmount(ChainSide::ChainA))));
    }

    #[test]
    fn test_validate_rejects_same_parties() {
        let mut trade = sample_trade();
        trade.chain_b.withdrawer = trade.chain_b.depositor.clone();
        assert!(matches!(trade.validate(), Err(SwapError::InvalidTrade(_))));
    }

    #[test]
    fn test_validate_rejects_missing_leg() {
        let result = Trade::builder(Commitment::of(&[1u8; 32]))
            .chain_a(Leg::new("XLM", 1, addr("a"), addr("b"), 10))
            .build();
        assert!(matches!(result, Err(SwapError::InvalidTrade(_))));
    }

    #[test]
    fn test_json_shape() {
        let mut trade = sample_trade();
        trade
            .set_holding_account(ChainSide::ChainA, addr("escrow-a"))
            .unwrap();
        trade.mark_initial_side(ChainSide::ChainA);

        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["initialSide"], "chainA");
        assert_eq!(json["chainA"]["holdingAccount"], "escrow-a");
        assert!(json.get("id").is_none());
        assert!(json["chainB"].get("holdingAccount").is_none());
        assert!(json["chainA"].get("refundTx").is_none());
        assert_eq!(json["commitment"].as_str().unwrap().len(), 64);

        let back: Trade = serde_json::from_value(json).unwrap();
        assert_eq!(back, trade);
    }

    #[test]
    fn test_holding_account_set_once() {
        let mut trade = sample_trade();
        trade
            .set_holding_account(ChainSide::ChainB, addr("escrow-b"))
            .unwrap();
        let again = trade.set_holding_account(ChainSide::ChainB, addr("other"));
        assert!(matches!(again, Err(SwapError::AlreadyPrepared(ChainSide::ChainB))));
        assert_eq!(trade.chain_b.holding_account, Some(addr("escrow-b")));
    }

    #[test]
    fn test_initial_side_immutable() {
        let mut trade = sample_trade();
        assert!(trade.mark_initial_side(ChainSide::ChainB));
        assert!(!trade.mark_initial_side(ChainSide::ChainA));
        assert_eq!(trade.initial_side, Some(ChainSide::ChainB));
        assert_eq!(trade.second_side(), Some(ChainSide::ChainA));
    }

    #[test]
    fn test_leg_expiry_boundaries() {
        let leg = Leg::new("XLM", 1, addr("a"), addr("b"), 100);
        assert!(!leg.is_expired(100));
        assert!(leg.is_expired(101));
        assert!(!leg.can_refund(99));
        assert!(leg.can_refund(100));
    }

    #[test]
    fn test_absorb_adopts_absent_fields() {
        let mut local = sample_trade();
        let mut remote = local.clone();
        remote.id = Some(TradeId::generate());
        remote.initial_side = Some(ChainSide::ChainA);
        remote.chain_a.holding_account = Some(addr("escrow-a"));
        remote.chain_a.refund_tx = Some(RefundEnvelope::new("env"));

        assert!(local.absorb(&remote).unwrap());
        assert_eq!(local, remote);
        assert!(!local.absorb(&remote).unwrap());
    }

    #[test]
    fn test_absorb_keeps_local_fields_missing_remotely() {
        let mut local = sample_trade();
        local.chain_b.holding_account = Some(addr("escrow-b"));
        let remote = sample_trade();
        assert!(!local.absorb(&remote).unwrap());
        assert_eq!(local.chain_b.holding_account, Some(addr("escrow-b")));
    }

    #[test]
    fn test_absorb_conflict_leaves_local_untouched() {
        let mut local = sample_trade();
        local.chain_a.holding_account = Some(addr("escrow-a"));
        let before = local.clone();

        let mut remote = sample_trade();
        remote.initial_side = Some(ChainSide::ChainA);
        remote.chain_a.holding_account = Some(addr("escrow-x"));

        let result = local.absorb(&remote);
        assert!(matches!(result, Err(SwapError::LedgerInconsistency(_))));
        assert_eq!(local, before);
    }

    #[test]
    fn test_absorb_rejects_different_terms() {
        let mut local = sample_trade();
        let mut remote = sample_trade();
        remote.chain_b.amount = 6;
        assert!(local.absorb(&remote).is_err());

        let mut other = sample_trade();
        other.commitment = Commitment::of(&[8u8; 32]);
        assert!(local.absorb(&other).is_err());
    }
}
