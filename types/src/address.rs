//! Balance record addressing.
//!
//! Every player owns exactly one balance record. Its location in the store is
//! derived from the owner's public key so that no separate index is required:
//!
//! ```text
//! address = SHA-256(BALANCE_NAMESPACE || owner)
//! ```
//!
//! The tag and the key both have a fixed length, so distinct owners can never
//! produce the same preimage.

use commonware_cryptography::{
    ed25519::PublicKey,
    sha256::{Digest, Sha256},
    Hasher,
};

/// Domain separation tag for balance record addresses.
pub const BALANCE_NAMESPACE: &[u8] = b"_ESCROW_BALANCE";

/// Location of a record in the ledger store.
pub type Address = Digest;

/// Derive the address of the balance record owned by `owner`.
pub fn derive_balance_address(owner: &PublicKey) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(BALANCE_NAMESPACE);
    hasher.update(owner.as_ref());
    hasher.finalize()
}

/// Returns true if `address` is the balance address derived for `owner`.
pub fn is_balance_address(owner: &PublicKey, address: &Address) -> bool {
    derive_balance_address(owner) == *address
}
