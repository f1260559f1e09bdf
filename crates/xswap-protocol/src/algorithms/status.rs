//! # Status Derivation
//!
//! Pure evaluation of the swap checklist over a snapshot of both ledgers.
//!
//! The engine gathers a [`Observation`] (concurrently, one query set per
//! leg) and hands it here together with the trade and the current time.
//! Nothing in this module performs I/O, so the same inputs always produce
//! the same status.
//!
//! ## Checklist
//!
//! `first` is the leg named by `initialSide`, `second` the other one.
//!
//! 1. `initialSide` unset: `INIT`.
//! 2. First escrow missing on chain: `INIT`. Present but not bound to the
//!    withdrawer and commitment (and not already withdrawn): `ERROR`.
//! 3. No first refund envelope: `<first>_HOLDING_ACCOUNT`. Envelope terms
//!    differ from the leg: `ERROR`.
//! 4. First escrow below the amount and not withdrawn: `<first>_REFUND_TX`.
//! 5. Second leg inconsistent: `ERROR`. No second refund envelope:
//!    `<first>_DEPOSIT`.
//! 6. Second escrow not withdrawn: `<second>_HOLDING_ACCOUNT`.
//! 7. First escrow not withdrawn: `<second>_WITHDRAW`.
//! 8. `FINALISED`.
//!
//! Every forward state is replaced by `EXPIRED` once `now` is past the
//! timelock of the leg that step waits on: the first leg for steps 1 to 5
//! and 7, the second leg for step 6. Before `initialSide` is known the
//! earlier of the two timelocks applies.

use crate::domain::{invariant_refund_terms, ChainSide, Leg, RefundTerms, SwapStatus, Trade};

/// What the adapter could make of a stored refund envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeObservation {
    /// Leg has no `refundTx`.
    Missing,
    /// Envelope decoded to these terms.
    Decoded(RefundTerms),
    /// Envelope is present but the adapter rejected it.
    Undecodable(String),
}

/// Ledger facts about one leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegObservation {
    /// Holding account exists on chain.
    pub exists: bool,
    /// Holding account is bound to the withdrawer and the commitment.
    pub valid: bool,
    /// Holding account was merged into the withdrawer.
    pub closed: bool,
    /// Current holding account balance.
    pub balance: u64,
    /// Decoded refund envelope.
    pub envelope: EnvelopeObservation,
}

impl LegObservation {
    /// Observation for a leg with no holding account.
    pub fn unprepared(envelope: EnvelopeObservation) -> Self {
        Self {
            exists: false,
            valid: false,
            closed: false,
            balance: 0,
            envelope,
        }
    }
}

/// Snapshot of both ledgers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Chain A facts.
    pub chain_a: LegObservation,
    /// Chain B facts.
    pub chain_b: LegObservation,
}

impl Observation {
    /// Facts for `side`.
    pub fn leg(&self, side: ChainSide) -> &LegObservation {
        match side {
            ChainSide::ChainA => &self.chain_a,
            ChainSide::ChainB => &self.chain_b,
        }
    }
}

/// Result of evaluating the checklist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Derivation {
    /// Derived status.
    pub status: SwapStatus,
    /// Reason, when `status` is `ERROR`.
    pub inconsistency: Option<String>,
}

impl Derivation {
    fn forward(status: SwapStatus, timelock: u64, now: u64) -> Self {
        let status = if now > timelock {
            SwapStatus::Expired
        } else {
            status
        };
        Self {
            status,
            inconsistency: None,
        }
    }

    fn error(reason: String) -> Self {
        Self {
            status: SwapStatus::Error,
            inconsistency: Some(reason),
        }
    }

    fn finalised() -> Self {
        Self {
            status: SwapStatus::Finalised,
            inconsistency: None,
        }
    }
}

fn check_envelope(side: ChainSide, leg: &Leg, envelope: &EnvelopeObservation) -> Option<String> {
    match envelope {
        EnvelopeObservation::Missing => None,
        EnvelopeObservation::Undecodable(reason) => {
            Some(format!("{} refund envelope is unreadable: {}", side, reason))
        }
        EnvelopeObservation::Decoded(terms) => invariant_refund_terms(leg, terms)
            .err()
            .map(|reason| format!("{} refund envelope mismatch: {}", side, reason)),
    }
}

/// Evaluate the checklist.
pub fn derive_status(trade: &Trade, observation: &Observation, now: u64) -> Derivation {
    let Some(first) = trade.initial_side else {
        let earliest = trade.chain_a.timelock.min(trade.chain_b.timelock);
        return Derivation::forward(SwapStatus::Init, earliest, now);
    };
    let second = first.other();

    let first_leg = trade.leg(first);
    let first_obs = observation.leg(first);
    let first_deadline = first_leg.timelock;

    // 2. first escrow
    if first_leg.holding_account.is_none() {
        return Derivation::forward(SwapStatus::Init, first_deadline, now);
    }
    if !first_obs.closed {
        if !first_obs.exists {
            return Derivation::forward(SwapStatus::Init, first_deadline, now);
        }
        if !first_obs.valid {
            return Derivation::error(format!(
                "{} holding account is not bound to the withdrawer and commitment",
                first
            ));
        }
    }

    // 3. first refund envelope
    if first_obs.envelope == EnvelopeObservation::Missing {
        return Derivation::forward(SwapStatus::holding_account(first), first_deadline, now);
    }
    if let Some(reason) = check_envelope(first, first_leg, &first_obs.envelope) {
        return Derivation::error(reason);
    }

    // 4. first deposit
    if !first_obs.closed && first_obs.balance < first_leg.amount {
        return Derivation::forward(SwapStatus::refund_tx(first), first_deadline, now);
    }

    // 5. second leg refund envelope
    let second_leg = trade.leg(second);
    let second_obs = observation.leg(second);
    if second_leg.holding_account.is_some()
        && second_obs.exists
        && !second_obs.valid
        && !second_obs.closed
    {
        return Derivation::error(format!(
            "{} holding account is not bound to the withdrawer and commitment",
            second
        ));
    }
    if second_leg.refund_tx.is_some() && second_leg.holding_account.is_none() {
        return Derivation::error(format!(
            "{} has a refund transaction but no holding account",
            second
        ));
    }
    if second_obs.envelope == EnvelopeObservation::Missing {
        return Derivation::forward(SwapStatus::deposit(first), first_deadline, now);
    }
    if let Some(reason) = check_envelope(second, second_leg, &second_obs.envelope) {
        return Derivation::error(reason);
    }

    // 6. second withdrawal
    if !second_obs.closed {
        return Derivation::forward(
            SwapStatus::holding_account(second),
            second_leg.timelock,
            now,
        );
    }

    // 7. first withdrawal
    if !first_obs.closed {
        return Derivation::forward(SwapStatus::withdraw(second), first_deadline, now);
    }

    Derivation::finalised()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Commitment, RefundEnvelope};

    const T: u64 = 1_000;
    const TL_A: u64 = T + 120;
    const TL_B: u64 = T + 60;

    fn trade() -> Trade {
        Trade::new(
            Commitment::of(&[5u8; 32]),
            Leg::new("XLM", 100, Address::new("alice-a"), Address::new("bob-a"), TL_A),
            Leg::new("ETH", 7, Address::new("bob-b"), Address::new("alice-b"), TL_B),
        )
    }

    fn terms(leg: &Leg) -> RefundTerms {
        RefundTerms {
            escrow: leg.holding_account.clone().unwrap(),
            depositor: leg.depositor.clone(),
            amount: leg.amount,
            not_before: leg.timelock,
        }
    }

    fn live(balance: u64, envelope: EnvelopeObservation) -> LegObservation {
        LegObservation {
            exists: true,
            valid: true,
            closed: false,
            balance,
            envelope,
        }
    }

    fn withdrawn(envelope: EnvelopeObservation) -> LegObservation {
        LegObservation {
            exists: false,
            valid: false,
            closed: true,
            balance: 0,
            envelope,
        }
    }

    fn none() -> LegObservation {
        LegObservation::unprepared(EnvelopeObservation::Missing)
    }

    /// Trade with chain A prepared first and chain B prepared, both with
    /// refund envelopes.
    fn prepared_trade() -> Trade {
        let mut t = trade();
        t.initial_side = Some(ChainSide::ChainA);
        t.chain_a.holding_account = Some(Address::new("escrow-a"));
        t.chain_a.refund_tx = Some(RefundEnvelope::new("env-a"));
        t.chain_b.holding_account = Some(Address::new("escrow-b"));
        t.chain_b.refund_tx = Some(RefundEnvelope::new("env-b"));
        t
    }

    fn decoded(t: &Trade, side: ChainSide) -> EnvelopeObservation {
        EnvelopeObservation::Decoded(terms(t.leg(side)))
    }

    fn observe(a: LegObservation, b: LegObservation) -> Observation {
        Observation {
            chain_a: a,
            chain_b: b,
        }
    }

    #[test]
    fn test_init_without_initial_side() {
        let d = derive_status(&trade(), &observe(none(), none()), T);
        assert_eq!(d.status, SwapStatus::Init);
        assert!(d.inconsistency.is_none());
    }

    #[test]
    fn test_init_expires_on_earliest_timelock() {
        let d = derive_status(&trade(), &observe(none(), none()), TL_B + 1);
        assert_eq!(d.status, SwapStatus::Expired);
        let d = derive_status(&trade(), &observe(none(), none()), TL_B);
        assert_eq!(d.status, SwapStatus::Init);
    }

    #[test]
    fn test_init_when_escrow_not_yet_on_chain() {
        let mut t = trade();
        t.initial_side = Some(ChainSide::ChainA);
        t.chain_a.holding_account = Some(Address::new("escrow-a"));
        let d = derive_status(&t, &observe(none(), none()), T);
        assert_eq!(d.status, SwapStatus::Init);
    }

    #[test]
    fn test_holding_account() {
        let mut t = trade();
        t.initial_side = Some(ChainSide::ChainA);
        t.chain_a.holding_account = Some(Address::new("escrow-a"));
        let obs = observe(live(0, EnvelopeObservation::Missing), none());
        assert_eq!(
            derive_status(&t, &obs, T).status,
            SwapStatus::ChainAHoldingAccount
        );
    }

    #[test]
    fn test_invalid_first_escrow_is_error() {
        let mut t = trade();
        t.initial_side = Some(ChainSide::ChainA);
        t.chain_a.holding_account = Some(Address::new("escrow-a"));
        let mut obs = live(0, EnvelopeObservation::Missing);
        obs.valid = false;
        let d = derive_status(&t, &observe(obs, none()), TL_A + 500);
        assert_eq!(d.status, SwapStatus::Error);
        assert!(d.inconsistency.unwrap().contains("chainA"));
    }

    #[test]
    fn test_refund_tx_until_funded() {
        let t = prepared_trade();
        let mut t = t;
        t.chain_b.holding_account = None;
        t.chain_b.refund_tx = None;
        let a = decoded(&t, ChainSide::ChainA);

        let d = derive_status(&t, &observe(live(99, a.clone()), none()), T);
        assert_eq!(d.status, SwapStatus::ChainARefundTx);

        let d = derive_status(&t, &observe(live(100, a), none()), T);
        assert_eq!(d.status, SwapStatus::ChainADeposit);
    }

    #[test]
    fn test_mismatched_first_envelope_is_error() {
        let mut t = prepared_trade();
        t.chain_b.holding_account = None;
        t.chain_b.refund_tx = None;
        let mut bad = terms(&t.chain_a);
        bad.not_before -= 1;
        let obs = observe(live(100, EnvelopeObservation::Decoded(bad)), none());
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::Error);

        let obs = observe(
            live(100, EnvelopeObservation::Undecodable("garbage".into())),
            none(),
        );
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::Error);
    }

    #[test]
    fn test_second_holding_after_second_refund_tx() {
        let t = prepared_trade();
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            live(7, decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(
            derive_status(&t, &obs, T).status,
            SwapStatus::ChainBHoldingAccount
        );
    }

    #[test]
    fn test_second_withdraw_then_finalised() {
        let t = prepared_trade();
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            withdrawn(decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::ChainBWithdraw);

        let obs = observe(
            withdrawn(decoded(&t, ChainSide::ChainA)),
            withdrawn(decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::Finalised);
    }

    #[test]
    fn test_finalised_never_expires() {
        let t = prepared_trade();
        let obs = observe(
            withdrawn(decoded(&t, ChainSide::ChainA)),
            withdrawn(decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(
            derive_status(&t, &obs, TL_A + 10_000).status,
            SwapStatus::Finalised
        );
    }

    #[test]
    fn test_second_holding_expires_on_second_timelock() {
        let t = prepared_trade();
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            live(7, decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(derive_status(&t, &obs, TL_B).status, SwapStatus::ChainBHoldingAccount);
        assert_eq!(derive_status(&t, &obs, TL_B + 1).status, SwapStatus::Expired);
    }

    #[test]
    fn test_second_withdraw_expires_on_first_timelock() {
        let t = prepared_trade();
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            withdrawn(decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(derive_status(&t, &obs, TL_B + 1).status, SwapStatus::ChainBWithdraw);
        assert_eq!(derive_status(&t, &obs, TL_A + 1).status, SwapStatus::Expired);
    }

    #[test]
    fn test_second_refund_without_holding_is_error() {
        let mut t = prepared_trade();
        t.chain_b.holding_account = None;
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            LegObservation::unprepared(EnvelopeObservation::Undecodable("x".into())),
        );
        let d = derive_status(&t, &obs, T);
        assert_eq!(d.status, SwapStatus::Error);
        assert!(d.inconsistency.unwrap().contains("no holding account"));
    }

    #[test]
    fn test_invalid_second_escrow_is_error() {
        let mut t = prepared_trade();
        t.chain_b.refund_tx = None;
        let mut b = live(0, EnvelopeObservation::Missing);
        b.valid = false;
        let obs = observe(live(100, decoded(&t, ChainSide::ChainA)), b);
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::Error);
    }

    #[test]
    fn test_refunded_second_leg_reads_expired() {
        let t = prepared_trade();
        let obs = observe(
            live(100, decoded(&t, ChainSide::ChainA)),
            LegObservation::unprepared(decoded(&t, ChainSide::ChainB)),
        );
        assert_eq!(derive_status(&t, &obs, TL_B + 5).status, SwapStatus::Expired);
    }

    #[test]
    fn test_chain_b_first_uses_mirrored_statuses() {
        let mut t = trade();
        t.chain_a.timelock = TL_B;
        t.chain_b.timelock = TL_A;
        t.initial_side = Some(ChainSide::ChainB);
        t.chain_b.holding_account = Some(Address::new("escrow-b"));
        t.chain_b.refund_tx = Some(RefundEnvelope::new("env-b"));
        let obs = observe(none(), live(7, decoded(&t, ChainSide::ChainB)));
        assert_eq!(derive_status(&t, &obs, T).status, SwapStatus::ChainBDeposit);
    }
}
