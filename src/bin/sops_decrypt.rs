// src/bin/sops_decrypt.rs
//! Decrypt one envelope and print `{"raw": ..., "data": ...}` as JSON

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use sops_envelope::{
    load_config, AgeKeySource, DecryptionEngine, KeyChain, SopsFunctions, StaticKeySource,
    StoreRegistry,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sops-decrypt", version, about = "Decrypt a sops envelope")]
struct Args {
    /// Encrypted file
    file: PathBuf,

    /// yaml, json, dotenv, ini or binary; inferred from the file name if omitted
    #[arg(long)]
    format: Option<String>,

    /// Return the cleartext even if the MAC does not match
    #[arg(long)]
    ignore_mac: bool,

    /// Use this data key (64 hex chars) before trying age identities
    #[arg(long, value_name = "HEX")]
    data_key_hex: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config().context("Failed to load configuration")?;

    let mut keys = KeyChain::new();
    if let Some(hex_key) = &args.data_key_hex {
        keys.push(StaticKeySource::from_hex(hex_key).context("Invalid --data-key-hex")?);
    }
    keys.push(AgeKeySource::new(config.keys.clone()));

    let functions = SopsFunctions::new(DecryptionEngine::new(
        StoreRegistry::new(&config.stores),
        keys,
    ));

    let format = args.format.as_deref();
    let decrypted = if args.ignore_mac || config.decrypt.ignore_mac_mismatch {
        functions.file_ignore_mac(&args.file, format)?
    } else {
        functions.file(&args.file, format)?
    };
    info!(file = %args.file.display(), "decrypted");

    let data: Value = serde_json::from_str(&decrypted.data.to_canonical_json())
        .context("Failed to render decrypted data")?;
    let output = json!({
        "raw": String::from_utf8_lossy(decrypted.raw.expose_secret()),
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
