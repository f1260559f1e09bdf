//! Protocol and party configuration.

use crate::domain::{PartyIdentity, PartyKey, SwapError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required setting absent.
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    /// Config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Signing key could not be parsed.
    #[error("Invalid key for {0}: {1}")]
    InvalidKey(&'static str, String),
}

/// Engine-wide protocol parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Required gap between the first leg's timelock and the second's.
    pub min_timelock_margin_secs: u64,
    /// Suggested lifetime of the first leg, from trade creation.
    pub default_initial_timeout_secs: u64,
    /// Suggested lifetime of the second leg, from trade creation.
    pub default_counter_timeout_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            min_timelock_margin_secs: 0,
            default_initial_timeout_secs: 7200,
            default_counter_timeout_secs: 3600,
        }
    }
}

/// Local party settings: signing keys per ledger and where trades live.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartyConfig {
    /// Hex ed25519 seed for chain A.
    pub chain_a_secret: Option<String>,
    /// Hex ed25519 seed for chain B. Falls back to the chain A key.
    pub chain_b_secret: Option<String>,
    /// Chain A network label.
    pub chain_a_network: Option<String>,
    /// Chain B network label.
    pub chain_b_network: Option<String>,
    /// Directory of the file trade store.
    pub trade_dir: Option<PathBuf>,
    /// Protocol parameters.
    pub protocol: ProtocolConfig,
}

impl PartyConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XSWAP_CHAIN_A_SECRET`: hex seed for chain A
    /// - `XSWAP_CHAIN_B_SECRET`: hex seed for chain B (default: chain A key)
    /// - `XSWAP_CHAIN_A_NETWORK`, `XSWAP_CHAIN_B_NETWORK`: network labels
    /// - `XSWAP_TRADE_DIR`: trade store directory (default: `./trades`)
    /// - `XSWAP_TIMELOCK_MARGIN_SECS`: minimum timelock margin (default: 0)
    pub fn from_env() -> Self {
        let mut protocol = ProtocolConfig::default();
        if let Some(margin) = env::var("XSWAP_TIMELOCK_MARGIN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            protocol.min_timelock_margin_secs = margin;
        }

        Self {
            chain_a_secret: env::var("XSWAP_CHAIN_A_SECRET").ok(),
            chain_b_secret: env::var("XSWAP_CHAIN_B_SECRET").ok(),
            chain_a_network: env::var("XSWAP_CHAIN_A_NETWORK").ok(),
            chain_b_network: env::var("XSWAP_CHAIN_B_NETWORK").ok(),
            trade_dir: env::var("XSWAP_TRADE_DIR").ok().map(PathBuf::from),
            protocol,
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Trade store directory.
    pub fn trade_dir(&self) -> PathBuf {
        self.trade_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("trades"))
    }

    /// Build the local party identity from the configured keys.
    pub fn identity(&self) -> Result<PartyIdentity, ConfigError> {
        let a_hex = self
            .chain_a_secret
            .as_deref()
            .ok_or(ConfigError::Missing("chainASecret"))?;
        let a = parse_key("chainASecret", a_hex)?;
        let b = match self.chain_b_secret.as_deref() {
            Some(b_hex) => parse_key("chainBSecret", b_hex)?,
            None => a.clone(),
        };
        Ok(PartyIdentity::new(a, b))
    }
}

fn parse_key(field: &'static str, hex_seed: &str) -> Result<PartyKey, ConfigError> {
    PartyKey::from_hex(hex_seed).map_err(|e| match e {
        SwapError::InvalidKey(reason) => ConfigError::InvalidKey(field, reason),
        other => ConfigError::InvalidKey(field, other.to_string()),
    })
}

impl std::fmt::Debug for PartyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "***");
        f.debug_struct("PartyConfig")
            .field("chain_a_secret", &redact(&self.chain_a_secret))
            .field("chain_b_secret", &redact(&self.chain_b_secret))
            .field("chain_a_network", &self.chain_a_network)
            .field("chain_b_network", &self.chain_b_network)
            .field("trade_dir", &self.trade_dir)
            .field("protocol", &self.protocol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChainSide;

    #[test]
    fn test_protocol_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.min_timelock_margin_secs, 0);
        assert_eq!(config.default_initial_timeout_secs, 7200);
        assert_eq!(config.default_counter_timeout_secs, 3600);
    }

    #[test]
    fn test_identity_falls_back_to_chain_a_key() {
        let config = PartyConfig {
            chain_a_secret: Some("01".repeat(32)),
            ..Default::default()
        };
        let identity = config.identity().unwrap();
        assert_eq!(
            identity.address(ChainSide::ChainA),
            identity.address(ChainSide::ChainB)
        );
    }

    #[test]
    fn test_identity_requires_chain_a_key() {
        let config = PartyConfig::default();
        assert!(matches!(config.identity(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_identity_rejects_bad_key() {
        let config = PartyConfig {
            chain_a_secret: Some("not-hex".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.identity(),
            Err(ConfigError::InvalidKey("chainASecret", _))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = PartyConfig {
            chain_a_secret: Some("ab".repeat(32)),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abab"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"chainASecret":"0202020202020202020202020202020202020202020202020202020202020202","chainANetwork":"testnet","protocol":{"min_timelock_margin_secs":5}}"#,
        )
        .unwrap();

        let config = PartyConfig::from_file(&path).unwrap();
        assert_eq!(config.chain_a_network.as_deref(), Some("testnet"));
        assert!(config.identity().is_ok());
        assert_eq!(config.protocol.min_timelock_margin_secs, 5);
        assert_eq!(config.protocol.default_counter_timeout_secs, 3600);
        assert_eq!(config.trade_dir(), PathBuf::from("trades"));
    }
}
