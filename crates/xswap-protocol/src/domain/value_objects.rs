//! # Domain Value Objects
//!
//! Immutable value types shared by the trade record, the ledger ports and the
//! status checklist.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Hash type (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Which of the two ledgers a leg lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainSide {
    /// Chain A.
    #[serde(rename = "chainA")]
    ChainA,
    /// Chain B.
    #[serde(rename = "chainB")]
    ChainB,
}

impl ChainSide {
    /// Both sides, chain A first.
    pub const BOTH: [ChainSide; 2] = [ChainSide::ChainA, ChainSide::ChainB];

    /// The opposite leg.
    pub fn other(self) -> Self {
        match self {
            Self::ChainA => Self::ChainB,
            Self::ChainB => Self::ChainA,
        }
    }

    /// Label used in the trade record and in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::ChainA => "chainA",
            Self::ChainB => "chainB",
        }
    }
}

impl fmt::Display for ChainSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// High-level swap status.
///
/// A plain tagged value. It is never stored on the trade record; the engine
/// recomputes it from ledger observations on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    /// Nothing observable on chain yet.
    Init,
    /// Chain A escrow exists.
    ChainAHoldingAccount,
    /// Chain A refund envelope has been pre-signed.
    ChainARefundTx,
    /// Chain A escrow is funded.
    ChainADeposit,
    /// Chain A escrow was withdrawn by its withdrawer.
    ChainAWithdraw,
    /// Chain B escrow exists.
    ChainBHoldingAccount,
    /// Chain B refund envelope has been pre-signed.
    ChainBRefundTx,
    /// Chain B escrow is funded.
    ChainBDeposit,
    /// Chain B escrow was withdrawn by its withdrawer.
    ChainBWithdraw,
    /// The relevant timelock passed before the swap finished.
    Expired,
    /// Both escrows were withdrawn.
    Finalised,
    /// Ledger facts contradict the trade record.
    Error,
}

impl SwapStatus {
    /// Every status, in code order.
    pub const ALL: [SwapStatus; 12] = [
        Self::Init,
        Self::ChainAHoldingAccount,
        Self::ChainARefundTx,
        Self::ChainADeposit,
        Self::ChainAWithdraw,
        Self::ChainBHoldingAccount,
        Self::ChainBRefundTx,
        Self::ChainBDeposit,
        Self::ChainBWithdraw,
        Self::Expired,
        Self::Finalised,
        Self::Error,
    ];

    /// Stable numeric code.
    pub fn code(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::ChainAHoldingAccount => 1,
            Self::ChainARefundTx => 2,
            Self::ChainADeposit => 3,
            Self::ChainAWithdraw => 4,
            Self::ChainBHoldingAccount => 5,
            Self::ChainBRefundTx => 6,
            Self::ChainBDeposit => 7,
            Self::ChainBWithdraw => 8,
            Self::Expired => 9,
            Self::Finalised => 10,
            Self::Error => 99,
        }
    }

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::ChainAHoldingAccount => "CHAIN_A_HOLDING_ACCOUNT",
            Self::ChainARefundTx => "CHAIN_A_REFUND_TX",
            Self::ChainADeposit => "CHAIN_A_DEPOSIT",
            Self::ChainAWithdraw => "CHAIN_A_WITHDRAW",
            Self::ChainBHoldingAccount => "CHAIN_B_HOLDING_ACCOUNT",
            Self::ChainBRefundTx => "CHAIN_B_REFUND_TX",
            Self::ChainBDeposit => "CHAIN_B_DEPOSIT",
            Self::ChainBWithdraw => "CHAIN_B_WITHDRAW",
            Self::Expired => "EXPIRED",
            Self::Finalised => "FINALISED",
            Self::Error => "ERROR",
        }
    }

    /// Reverse lookup by numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Reverse lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// `FINALISED`, `EXPIRED` and `ERROR` end the protocol.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalised | Self::Expired | Self::Error)
    }

    /// Escrow created on `side`.
    pub fn holding_account(side: ChainSide) -> Self {
        match side {
            ChainSide::ChainA => Self::ChainAHoldingAccount,
            ChainSide::ChainB => Self::ChainBHoldingAccount,
        }
    }

    /// Refund envelope created on `side`.
    pub fn refund_tx(side: ChainSide) -> Self {
        match side {
            ChainSide::ChainA => Self::ChainARefundTx,
            ChainSide::ChainB => Self::ChainBRefundTx,
        }
    }

    /// Escrow funded on `side`.
    pub fn deposit(side: ChainSide) -> Self {
        match side {
            ChainSide::ChainA => Self::ChainADeposit,
            ChainSide::ChainB => Self::ChainBDeposit,
        }
    }

    /// Escrow withdrawn on `side`.
    pub fn withdraw(side: ChainSide) -> Self {
        match side {
            ChainSide::ChainA => Self::ChainAWithdraw,
            ChainSide::ChainB => Self::ChainBWithdraw,
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SwapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown status [{}]", s))
    }
}

/// Ledger address. Opaque to the engine; the adapter defines the format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an adapter-formatted address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 commitment to the swap secret, shared by both escrows.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(Hash);

impl Commitment {
    /// Wrap raw hash bytes.
    pub fn new(hash: Hash) -> Self {
        Self(hash)
    }

    /// Commitment for a given preimage.
    pub fn of(preimage: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(preimage);
        Self(hasher.finalize().into())
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(format!("expected 64 hex characters, got {}", digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self(hash))
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Commitment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Trade identifier, assigned by the trade store on first save.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(Uuid);

impl TradeId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TradeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Ledger transaction reference returned by submissions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    /// Wrap an adapter transaction reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Raw reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-signed, time-bounded refund transaction.
///
/// Stored verbatim; only the ledger adapter can decode it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefundEnvelope(String);

impl RefundEnvelope {
    /// Wrap an encoded envelope.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded envelope.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when nothing was encoded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a refund envelope commits to, as decoded by the adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundTerms {
    /// Escrow account the refund drains.
    pub escrow: Address,
    /// Account receiving the refund.
    pub depositor: Address,
    /// Amount the envelope was built for.
    pub amount: u64,
    /// Earliest ledger time the envelope may execute.
    pub not_before: u64,
}
