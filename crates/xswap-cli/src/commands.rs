//! Trade file commands.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use xswap_protocol::{
    export_trade, import_trade, new_secret_pair, sign_trade_file, verify_trade_signature,
    Address, ChainSide, Commitment, FileTradeStore, PartyConfig, PartyKey, TradeId,
    TradeStore,
};
use xswap_telemetry::log_trade_event;

/// Fresh secret as hex, with its commitment.
pub fn secret() -> (String, Commitment) {
    let (secret, commitment) = new_secret_pair();
    (secret.to_hex(), commitment)
}

pub fn whoami(config: &PartyConfig) -> Result<Vec<(ChainSide, Address)>> {
    let identity = config.identity().context("No signing key configured")?;
    Ok(ChainSide::BOTH
        .into_iter()
        .map(|side| (side, identity.address(side)))
        .collect())
}

/// Validate `file` and save it into the configured trade directory.
pub fn import(config: &PartyConfig, file: &Path) -> Result<TradeId> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let trade = import_trade(&json).with_context(|| format!("Invalid trade {}", file.display()))?;

    let store = FileTradeStore::new(config.trade_dir());
    let saved = store.save(&trade).context("Failed to save trade")?;
    let id = saved.id.context("Trade store did not assign an id")?;

    log_trade_event!(info, id, "[xswap] Trade imported", dir = %store.dir().display());
    Ok(id)
}

pub fn show(config: &PartyConfig, id: &str) -> Result<String> {
    let id: TradeId = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid trade id {}", id))?;
    let store = FileTradeStore::new(config.trade_dir());
    let Some(trade) = store.get(&id).context("Failed to read trade store")? else {
        bail!("No trade {} in {}", id, store.dir().display());
    };
    Ok(export_trade(&trade)?)
}

/// Sign `file`, writing the hex signature next to it.
pub fn sign(config: &PartyConfig, file: &Path, key_hex: Option<&str>) -> Result<(PathBuf, Address)> {
    let key = match key_hex {
        Some(hex_seed) => PartyKey::from_hex(hex_seed).context("Invalid --key")?,
        None => config
            .identity()
            .context("No --key given and no signing key configured")?
            .key(ChainSide::ChainA)
            .clone(),
    };
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let signature = sign_trade_file(&key, &bytes);

    let path = signature_path(file);
    fs::write(&path, &signature)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok((path, key.address()))
}

/// Check the signature in `signature_file` over `file`, returning the signer.
pub fn verify_sig(file: &Path, signature_file: &Path, signer: Option<&str>) -> Result<Address> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let signature = fs::read_to_string(signature_file)
        .with_context(|| format!("Failed to read {}", signature_file.display()))?;

    let signer = match signer {
        Some(address) => Address::new(address),
        None => {
            let json = std::str::from_utf8(&bytes).context("Trade file is not UTF-8")?;
            import_trade(json)?.chain_a.depositor
        }
    };
    verify_trade_signature(&signer, signature.trim(), &bytes)
        .with_context(|| format!("Signature does not verify against {}", signer))?;
    Ok(signer)
}

fn signature_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(".sig");
    PathBuf::from(name)
}
