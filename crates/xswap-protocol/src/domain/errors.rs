//! # Domain Errors
//!
//! Error types for the swap engine, the ledger adapters and the trade store.

use super::value_objects::{Address, ChainSide};
use std::fmt;
use thiserror::Error;

/// Role a party plays on one leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Funds the escrow and may reclaim it after the timelock.
    Depositor,
    /// Claims the escrow with the preimage.
    Withdrawer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depositor => f.write_str("depositor"),
            Self::Withdrawer => f.write_str("withdrawer"),
        }
    }
}

/// Errors raised by a ledger adapter.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport or node failure. Retrying may succeed.
    #[error("Network error: {0}")]
    Network(String),

    /// Account does not exist on the ledger.
    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    /// Account already exists on the ledger.
    #[error("Account already exists: {0}")]
    AccountExists(Address),

    /// Ledger refused a time-bounded transaction.
    #[error("Timelock not reached: now={now}, not_before={not_before}")]
    TimelockNotReached {
        /// Ledger time at submission
        now: u64,
        /// Earliest permitted execution time
        not_before: u64,
    },

    /// Signer is not authorized for the account.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Source account cannot cover the transfer.
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds {
        /// Amount required
        needed: u64,
        /// Amount available
        available: u64,
    },

    /// Envelope cannot be decoded or its signature does not verify.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Ledger rejected the transaction for any other reason.
    #[error("Transaction rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// True when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Errors raised by a trade store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record with the given identifier.
    #[error("Trade not found: {0}")]
    NotFound(String),
}

/// Coarse classification of a [`SwapError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller does not hold the required role.
    Role,
    /// Operation invoked out of order or with bad input.
    Precondition,
    /// Ledger facts contradict the trade record.
    Inconsistency,
    /// Adapter failure, possibly transient.
    Ledger,
    /// Local persistence failure.
    Storage,
    /// Cryptographic check failed.
    Crypto,
}

/// Errors raised by the protocol engine.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Local party lacks the role required on this leg.
    #[error("Role violation: local party is not the {role} on {side}")]
    RoleViolation {
        /// Leg the operation targeted
        side: ChainSide,
        /// Role the operation requires
        role: Role,
    },

    /// Generic precondition failure.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Holding account already set for this leg.
    #[error("Leg {0} already has a holding account")]
    AlreadyPrepared(ChainSide),

    /// Operation needs a holding account that is not set.
    #[error("Leg {0} has no holding account")]
    MissingHoldingAccount(ChainSide),

    /// Operation needs a refund envelope that is not set.
    #[error("Leg {0} has no refund transaction")]
    MissingRefundTx(ChainSide),

    /// Local party would create an escrow paying itself.
    #[error("Self-dealing: local party is the withdrawer on {0}")]
    SelfDealing(ChainSide),

    /// Amount must be strictly positive.
    #[error("Invalid amount on {0}: must be greater than zero")]
    InvalidAmount(ChainSide),

    /// Second leg's timelock does not precede the first by the margin.
    #[error("Invalid timelock ordering: first={first_timelock}, second={second_timelock}, required_margin={required_margin}")]
    TimelockOrdering {
        /// Timelock of the leg prepared first
        first_timelock: u64,
        /// Timelock of the leg being prepared
        second_timelock: u64,
        /// Configured margin in seconds
        required_margin: u64,
    },

    /// Refund attempted before the leg's timelock.
    #[error("Timelock not reached on {side}: now={now}, timelock={timelock}")]
    TimelockNotReached {
        /// Leg the refund targeted
        side: ChainSide,
        /// Local time
        now: u64,
        /// Leg timelock
        timelock: u64,
    },

    /// Trade record violates a static invariant.
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    /// Secret does not hash to the commitment.
    #[error("Invalid secret")]
    InvalidSecret,

    /// Ledger state contradicts the trade record.
    #[error("Ledger inconsistency: {0}")]
    LedgerInconsistency(String),

    /// Adapter failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Trade store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Trade record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key material could not be parsed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Detached signature does not verify.
    #[error("Invalid signature")]
    InvalidSignature,
}

impl SwapError {
    /// Coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RoleViolation { .. } | Self::SelfDealing(_) => ErrorCategory::Role,
            Self::Precondition(_)
            | Self::AlreadyPrepared(_)
            | Self::MissingHoldingAccount(_)
            | Self::MissingRefundTx(_)
            | Self::InvalidAmount(_)
            | Self::TimelockOrdering { .. }
            | Self::TimelockNotReached { .. }
            | Self::InvalidTrade(_)
            | Self::Serialization(_) => ErrorCategory::Precondition,
            Self::LedgerInconsistency(_) => ErrorCategory::Inconsistency,
            Self::Ledger(_) => ErrorCategory::Ledger,
            Self::Store(_) => ErrorCategory::Storage,
            Self::InvalidSecret | Self::InvalidKey(_) | Self::InvalidSignature => {
                ErrorCategory::Crypto
            }
        }
    }

    /// True only for transient ledger or store I/O failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_transient(),
            Self::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SwapError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_violation_message() {
        let err = SwapError::RoleViolation {
            side: ChainSide::ChainB,
            role: Role::Withdrawer,
        };
        assert_eq!(
            err.to_string(),
            "Role violation: local party is not the withdrawer on chainB"
        );
        assert_eq!(err.category(), ErrorCategory::Role);
    }

    #[test]
    fn test_timelock_ordering_message() {
        let err = SwapError::TimelockOrdering {
            first_timelock: 10000,
            second_timelock: 12000,
            required_margin: 600,
        };
        assert!(err.to_string().contains("required_margin=600"));
    }

    #[test]
    fn test_network_error_is_retryable() {
        let err = SwapError::from(LedgerError::Network("timeout".into()));
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Ledger);
    }

    #[test]
    fn test_rejection_is_not_retryable() {
        let err = SwapError::from(LedgerError::Rejected("account merged".into()));
        assert!(!err.is_retryable());
        assert!(!SwapError::InvalidSecret.is_retryable());
        assert!(!SwapError::LedgerInconsistency("x".into()).is_retryable());
    }

    #[test]
    fn test_store_io_is_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = SwapError::from(StoreError::from(io));
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_store_not_found_is_not_retryable() {
        let err = SwapError::from(StoreError::NotFound("abc".into()));
        assert!(!err.is_retryable());
    }
}
