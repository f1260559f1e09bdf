//! # Secure Secret Type
//!
//! The swap preimage. Zeroized on drop, never printed.

use super::value_objects::Commitment;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Swap preimage that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureSecret {
    inner: [u8; 32],
}

impl SecureSecret {
    /// Wrap 32 raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { inner: bytes }
    }

    /// Copy from a slice. `None` unless exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut inner = [0u8; 32];
        inner.copy_from_slice(slice);
        Some(Self { inner })
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let mut bytes = hex::decode(digits).ok()?;
        let secret = Self::from_slice(&bytes);
        bytes.zeroize();
        secret
    }

    /// Raw bytes. Do not hold on to the reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.inner
    }

    /// Hex encoding, for handing the secret to the user once.
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner)
    }

    /// `sha256(self)`.
    pub fn commitment(&self) -> Commitment {
        Commitment::of(&self.inner)
    }

    /// True when this secret opens `commitment`.
    pub fn opens(&self, commitment: &Commitment) -> bool {
        self.commitment() == *commitment
    }
}

impl PartialEq for SecureSecret {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for SecureSecret {}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureSecret(***)")
    }
}

impl Serialize for SecureSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SecureSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid secret"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_value() {
        let secret = SecureSecret::new([0xABu8; 32]);
        let debug_str = format!("{:?}", secret);
        assert!(!debug_str.to_lowercase().contains("ab"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert!(SecureSecret::from_slice(&[0xCDu8; 16]).is_none());
        assert!(SecureSecret::from_slice(&[0xCDu8; 32]).is_some());
    }

    #[test]
    fn test_hex_with_prefix() {
        let secret = SecureSecret::new([0x11u8; 32]);
        let parsed = SecureSecret::from_hex(&format!("0x{}", secret.to_hex())).unwrap();
        assert_eq!(parsed, secret);
        assert!(SecureSecret::from_hex("zz").is_none());
    }

    #[test]
    fn test_opens_own_commitment() {
        let secret = SecureSecret::new([0x42u8; 32]);
        let commitment = secret.commitment();
        assert!(secret.opens(&commitment));
        assert!(!SecureSecret::new([0x43u8; 32]).opens(&commitment));
    }
}
