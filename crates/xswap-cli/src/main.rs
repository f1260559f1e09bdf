//! # xswap
//!
//! Command-line front end for the xswap protocol engine.
//!
//! ## Commands
//!
//! - `secret` - fresh secret and commitment
//! - `whoami` - this party's address on each ledger
//! - `import` / `show` - trade files in the local trade directory
//! - `sign` / `verify-sig` - detached signatures over trade files
//! - `demo` - full swap between two simulated parties

mod commands;
mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use xswap_protocol::PartyConfig;
use xswap_telemetry::{init_telemetry, TelemetryConfig};

/// xswap: atomic swaps across two ledgers
#[derive(Parser, Debug)]
#[command(name = "xswap", version)]
#[command(about = "Hash-and-time-locked atomic swaps across two ledgers")]
struct Cli {
    /// Party config JSON file (default: XSWAP_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overrides XSWAP_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh secret and its commitment
    Secret,

    /// Print this party's address on each ledger
    Whoami,

    /// Validate a trade file and save it into the trade directory
    Import {
        /// Trade JSON received from the counterparty
        file: PathBuf,
    },

    /// Print a stored trade
    Show {
        /// Trade id printed by `import`
        id: String,
    },

    /// Sign a trade file, writing `<file>.sig`
    Sign {
        /// Trade JSON to sign
        file: PathBuf,

        /// Hex ed25519 seed (default: the configured chain A key)
        #[arg(long)]
        key: Option<String>,
    },

    /// Verify a detached trade file signature
    VerifySig {
        /// Signed trade JSON
        file: PathBuf,

        /// Signature file written by `sign`
        signature: PathBuf,

        /// Expected signer address (default: the chain A depositor)
        #[arg(long)]
        signer: Option<String>,
    },

    /// Run a full swap between two simulated parties
    Demo {
        /// Let the second leg expire and refund both legs instead
        #[arg(long)]
        expire: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &cli.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    let _guard = init_telemetry(telemetry).context("Failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => PartyConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PartyConfig::from_env(),
    };

    match cli.command {
        Command::Secret => {
            let (secret, commitment) = commands::secret();
            println!("secret:     {}", secret);
            println!("commitment: {}", commitment);
        }
        Command::Whoami => {
            for (side, address) in commands::whoami(&config)? {
                println!("{}: {}", side.label(), address);
            }
        }
        Command::Import { file } => {
            let id = commands::import(&config, &file)?;
            println!("{}", id);
        }
        Command::Show { id } => {
            println!("{}", commands::show(&config, &id)?);
        }
        Command::Sign { file, key } => {
            let (path, signer) = commands::sign(&config, &file, key.as_deref())?;
            println!("signed by {} -> {}", signer, path.display());
        }
        Command::VerifySig {
            file,
            signature,
            signer,
        } => {
            let signer = commands::verify_sig(&file, &signature, signer.as_deref())?;
            println!("signature OK ({})", signer);
        }
        Command::Demo { expire } => {
            let status = demo::run(expire).await?;
            info!("[xswap] Demo finished in {}", status);
        }
    }

    Ok(())
}
