//! Print the balance record address owned by a public key.
//!
//! Usage:
//!   balance-address --public <hex>
//!   balance-address --seed 1

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use commonware_codec::{Encode, ReadExt};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::Sha256,
    Hasher, Signer,
};
use commonware_utils::{from_hex, hex};
use escrow_types::{derive_balance_address, Key};

#[derive(Parser, Debug)]
#[command(name = "balance-address")]
#[command(about = "Derive the balance record address for a player")]
struct Args {
    /// Player public key (hex)
    #[arg(long, conflicts_with = "seed")]
    public: Option<String>,

    /// Deterministic test seed to derive the player key from
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("balance-address failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let owner = match (args.public, args.seed) {
        (Some(public), _) => parse_public(&public)?,
        (None, Some(seed)) => PrivateKey::from_seed(seed).public_key(),
        (None, None) => bail!("either --public or --seed is required"),
    };

    let address = derive_balance_address(&owner);
    println!("owner    {}", hex(owner.as_ref()));
    println!("address  {}", hex(address.as_ref()));
    println!("key hash {}", hex_of(Key::Balance(address)));
    Ok(())
}

fn parse_public(input: &str) -> Result<PublicKey> {
    let bytes = from_hex(input.trim()).ok_or_else(|| anyhow!("public key is not valid hex"))?;
    let mut reader = bytes.as_slice();
    let public = PublicKey::read(&mut reader).context("public key is not a valid ed25519 key")?;
    if !reader.is_empty() {
        bail!("public key has {} trailing bytes", reader.len());
    }
    Ok(public)
}

fn hex_of(key: Key) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.encode().as_ref());
    hex(hasher.finalize().as_ref())
}
