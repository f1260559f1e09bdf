//! # Secret Generation and Verification
//!
//! Preimage generation, commitments, and the local claim/refund checks.

use crate::domain::{ChainSide, Commitment, SecureSecret, SwapError};
use rand::RngCore;
use zeroize::Zeroize;

/// Generate a cryptographically secure random secret.
pub fn generate_random_secret() -> SecureSecret {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = SecureSecret::new(bytes);
    bytes.zeroize();
    secret
}

/// `sha256(secret)`.
pub fn create_commitment(secret: &SecureSecret) -> Commitment {
    secret.commitment()
}

/// Fresh secret together with its commitment.
pub fn new_secret_pair() -> (SecureSecret, Commitment) {
    let secret = generate_random_secret();
    let commitment = create_commitment(&secret);
    (secret, commitment)
}

/// Check that a secret opens the commitment.
pub fn verify_secret(secret: &SecureSecret, commitment: &Commitment) -> Result<(), SwapError> {
    if !secret.opens(commitment) {
        return Err(SwapError::InvalidSecret);
    }
    Ok(())
}

/// Check that a refund may be submitted: `now >= timelock`.
pub fn verify_refund(side: ChainSide, now: u64, timelock: u64) -> Result<(), SwapError> {
    if now < timelock {
        return Err(SwapError::TimelockNotReached {
            side,
            now,
            timelock,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_secret() {
        let s1 = generate_random_secret();
        let s2 = generate_random_secret();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_commitment_deterministic() {
        let secret = SecureSecret::new([0xABu8; 32]);
        assert_eq!(create_commitment(&secret), create_commitment(&secret));
        assert_ne!(
            create_commitment(&secret),
            create_commitment(&SecureSecret::new([0xCDu8; 32]))
        );
    }

    #[test]
    fn test_secret_pair_matches() {
        let (secret, commitment) = new_secret_pair();
        assert!(verify_secret(&secret, &commitment).is_ok());
    }

    #[test]
    fn test_verify_secret_invalid() {
        let (_, commitment) = new_secret_pair();
        let wrong = SecureSecret::new([0xABu8; 32]);
        assert!(matches!(
            verify_secret(&wrong, &commitment),
            Err(SwapError::InvalidSecret)
        ));
    }

    #[test]
    fn test_verify_refund_boundaries() {
        assert!(verify_refund(ChainSide::ChainA, 2000, 2000).is_ok());
        assert!(verify_refund(ChainSide::ChainA, 3000, 2000).is_ok());
        assert!(matches!(
            verify_refund(ChainSide::ChainB, 1999, 2000),
            Err(SwapError::TimelockNotReached { side: ChainSide::ChainB, .. })
        ));
    }
}
