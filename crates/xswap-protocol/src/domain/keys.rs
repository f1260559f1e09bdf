//! # Party Keys
//!
//! Ed25519 signing keys that authorize ledger operations for one party.
//! A key's address is the hex encoding of its verifying key.

use super::errors::SwapError;
use super::value_objects::{Address, ChainSide};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Signing key for one party on one ledger.
#[derive(Clone)]
pub struct PartyKey {
    signing_key: SigningKey,
}

impl PartyKey {
    /// Random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Key from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Key from a hex seed, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let s = s.trim();
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes =
            hex::decode(digits).map_err(|e| SwapError::InvalidKey(e.to_string()))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SwapError::InvalidKey(format!(
                "expected 32-byte seed, got {} bytes",
                len
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        bytes.zeroize();
        let key = Self::from_seed(seed);
        seed.zeroize();
        Ok(key)
    }

    /// Ledger address controlled by this key.
    pub fn address(&self) -> Address {
        Address::new(hex::encode(self.signing_key.verifying_key().to_bytes()))
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Hex signature over `message`.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message))
    }
}

impl std::fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PartyKey({})", self.address())
    }
}

/// Verify a hex ed25519 signature made by the key behind `address`.
pub fn verify_signature(
    address: &Address,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), SwapError> {
    let key_bytes: [u8; 32] = hex::decode(address.as_str())
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| SwapError::InvalidKey(format!("not an ed25519 address: {}", address)))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SwapError::InvalidKey(e.to_string()))?;

    let sig_bytes: [u8; 64] = hex::decode(signature_hex.trim())
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(SwapError::InvalidSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| SwapError::InvalidSignature)
}

/// The local party's keys on both ledgers.
#[derive(Clone, Debug)]
pub struct PartyIdentity {
    chain_a: PartyKey,
    chain_b: PartyKey,
}

impl PartyIdentity {
    /// Distinct keys per ledger.
    pub fn new(chain_a: PartyKey, chain_b: PartyKey) -> Self {
        Self { chain_a, chain_b }
    }

    /// Same key on both ledgers.
    pub fn single(key: PartyKey) -> Self {
        Self {
            chain_a: key.clone(),
            chain_b: key,
        }
    }

    /// Key for `side`.
    pub fn key(&self, side: ChainSide) -> &PartyKey {
        match side {
            ChainSide::ChainA => &self.chain_a,
            ChainSide::ChainB => &self.chain_b,
        }
    }

    /// Address on `side`.
    pub fn address(&self, side: ChainSide) -> Address {
        self.key(side).address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let key = PartyKey::generate();
        let sig = key.sign_hex(b"trade");
        assert!(verify_signature(&key.address(), b"trade", &sig).is_ok());
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let key = PartyKey::generate();
        let sig = key.sign_hex(b"trade");
        assert!(matches!(
            verify_signature(&key.address(), b"tampered", &sig),
            Err(SwapError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_other_signer() {
        let key = PartyKey::generate();
        let other = PartyKey::generate();
        let sig = other.sign_hex(b"trade");
        assert!(verify_signature(&key.address(), b"trade", &sig).is_err());
    }

    #[test]
    fn test_from_hex_seed_is_deterministic() {
        let seed = "07".repeat(32);
        let a = PartyKey::from_hex(&seed).unwrap();
        let b = PartyKey::from_hex(&format!("0x{}", seed)).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address().as_str().len(), 64);
    }

    #[test]
    fn test_from_hex_rejects_short_seed() {
        assert!(matches!(
            PartyKey::from_hex("abcd"),
            Err(SwapError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_shows_address_only() {
        let key = PartyKey::from_seed([9u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains(key.address().as_str()));
        assert!(!debug.contains(&"09".repeat(32)));
    }

    #[test]
    fn test_identity_per_side() {
        let a = PartyKey::from_seed([1u8; 32]);
        let b = PartyKey::from_seed([2u8; 32]);
        let identity = PartyIdentity::new(a.clone(), b.clone());
        assert_eq!(identity.address(ChainSide::ChainA), a.address());
        assert_eq!(identity.address(ChainSide::ChainB), b.address());
        let single = PartyIdentity::single(a.clone());
        assert_eq!(single.address(ChainSide::ChainB), a.address());
    }
}
