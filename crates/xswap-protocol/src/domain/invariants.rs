//! # Domain Invariants
//!
//! Business rules checked by the engine before it touches a ledger.

use super::entities::Leg;
use super::errors::SwapError;
use super::value_objects::{Address, ChainSide, Commitment, RefundTerms};

/// Invariant: timelock ordering.
///
/// The leg prepared second must expire no later than the first leg minus
/// `margin_secs`, leaving the first leg's withdrawer time to claim after the
/// secret is revealed on the second leg.
pub fn invariant_timelock_ordering(
    first_timelock: u64,
    second_timelock: u64,
    margin_secs: u64,
) -> Result<(), SwapError> {
    if second_timelock.saturating_add(margin_secs) > first_timelock {
        return Err(SwapError::TimelockOrdering {
            first_timelock,
            second_timelock,
            required_margin: margin_secs,
        });
    }
    Ok(())
}

/// Invariant: the local party never creates an escrow paying itself.
pub fn invariant_not_self_dealing(
    side: ChainSide,
    local: &Address,
    leg: &Leg,
) -> Result<(), SwapError> {
    if *local == leg.withdrawer {
        return Err(SwapError::SelfDealing(side));
    }
    Ok(())
}

/// Invariant: amounts are strictly positive.
pub fn invariant_positive_amount(side: ChainSide, leg: &Leg) -> Result<(), SwapError> {
    if leg.amount == 0 {
        return Err(SwapError::InvalidAmount(side));
    }
    Ok(())
}

/// Invariant: `sha256(secret) == commitment`.
pub fn invariant_secret_matches(secret: &[u8; 32], commitment: &Commitment) -> bool {
    Commitment::of(secret) == *commitment
}

/// Invariant: a refund envelope drains exactly this leg's escrow to its
/// depositor, for its amount, not before its timelock.
///
/// Returns a description of the first mismatch.
pub fn invariant_refund_terms(leg: &Leg, terms: &RefundTerms) -> Result<(), String> {
    match &leg.holding_account {
        None => return Err("leg has no holding account".into()),
        Some(escrow) if *escrow != terms.escrow => {
            return Err(format!(
                "envelope drains {} instead of {}",
                terms.escrow, escrow
            ))
        }
        Some(_) => {}
    }
    if terms.depositor != leg.depositor {
        return Err(format!(
            "envelope pays {} instead of {}",
            terms.depositor, leg.depositor
        ));
    }
    if terms.amount != leg.amount {
        return Err(format!(
            "envelope amount {} does not match {}",
            terms.amount, leg.amount
        ));
    }
    if terms.not_before != leg.timelock {
        return Err(format!(
            "envelope not_before {} does not match timelock {}",
            terms.not_before, leg.timelock
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg() -> Leg {
        let mut leg = Leg::new("XLM", 100, Address::new("dep"), Address::new("wd"), 5000);
        leg.holding_account = Some(Address::new("escrow"));
        leg
    }

    fn terms() -> RefundTerms {
        RefundTerms {
            escrow: Address::new("escrow"),
            depositor: Address::new("dep"),
            amount: 100,
            not_before: 5000,
        }
    }

    #[test]
    fn test_timelock_ordering_equal_allowed_without_margin() {
        assert!(invariant_timelock_ordering(1000, 1000, 0).is_ok());
        assert!(invariant_timelock_ordering(1000, 900, 0).is_ok());
    }

    #[test]
    fn test_timelock_ordering_later_second_rejected() {
        assert!(matches!(
            invariant_timelock_ordering(1000, 1001, 0),
            Err(SwapError::TimelockOrdering { .. })
        ));
    }

    #[test]
    fn test_timelock_ordering_with_margin() {
        assert!(invariant_timelock_ordering(1000, 400, 600).is_ok());
        assert!(invariant_timelock_ordering(1000, 401, 600).is_err());
        assert!(invariant_timelock_ordering(10, u64::MAX, 1).is_err());
    }

    #[test]
    fn test_self_dealing() {
        let leg = leg();
        assert!(invariant_not_self_dealing(ChainSide::ChainA, &Address::new("dep"), &leg).is_ok());
        assert!(matches!(
            invariant_not_self_dealing(ChainSide::ChainA, &Address::new("wd"), &leg),
            Err(SwapError::SelfDealing(ChainSide::ChainA))
        ));
    }

    #[test]
    fn test_positive_amount() {
        let mut leg = leg();
        assert!(invariant_positive_amount(ChainSide::ChainB, &leg).is_ok());
        leg.amount = 0;
        assert!(invariant_positive_amount(ChainSide::ChainB, &leg).is_err());
    }

    #[test]
    fn test_secret_matches() {
        let secret = [3u8; 32];
        let commitment = Commitment::of(&secret);
        assert!(invariant_secret_matches(&secret, &commitment));
        assert!(!invariant_secret_matches(&[4u8; 32], &commitment));
    }

    #[test]
    fn test_refund_terms_match() {
        assert!(invariant_refund_terms(&leg(), &terms()).is_ok());
    }

    #[test]
    fn test_refund_terms_mismatches() {
        let leg = leg();

        let mut t = terms();
        t.escrow = Address::new("other");
        assert!(invariant_refund_terms(&leg, &t).is_err());

        let mut t = terms();
        t.depositor = Address::new("wd");
        assert!(invariant_refund_terms(&leg, &t).is_err());

        let mut t = terms();
        t.amount = 99;
        assert!(invariant_refund_terms(&leg, &t).is_err());

        let mut t = terms();
        t.not_before = 4999;
        assert!(invariant_refund_terms(&leg, &t).is_err());
    }

    #[test]
    fn test_refund_terms_need_holding_account() {
        let mut leg = leg();
        leg.holding_account = None;
        assert!(invariant_refund_terms(&leg, &terms()).is_err());
    }
}
