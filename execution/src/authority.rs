//! Settlement authority policy.
//!
//! The ledger does not decide who may settle matches. The hosting runtime
//! supplies an [`AuthorityPolicy`], either built in code or read from
//! [`SETTLEMENT_AUTHORITIES_ENV`].

use commonware_codec::ReadExt;
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::from_hex;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// Comma-separated hex-encoded ed25519 public keys allowed to settle matches.
pub const SETTLEMENT_AUTHORITIES_ENV: &str = "ESCROW_SETTLEMENT_AUTHORITIES_HEX";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorityConfigError {
    #[error("authority entry {index} is not valid hex")]
    InvalidHex { index: usize },
    #[error("authority entry {index} is not a valid ed25519 public key")]
    InvalidKey { index: usize },
}

/// Set of identities trusted to finalize matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorityPolicy {
    authorities: BTreeSet<PublicKey>,
}

impl AuthorityPolicy {
    pub fn new(authorities: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            authorities: authorities.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list of hex public keys. Blank entries are ignored.
    pub fn parse(list: &str) -> Result<Self, AuthorityConfigError> {
        let mut authorities = BTreeSet::new();
        for (index, entry) in list.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }
            let bytes = from_hex(entry).ok_or(AuthorityConfigError::InvalidHex { index })?;
            let mut reader = bytes.as_slice();
            let public =
                PublicKey::read(&mut reader).map_err(|_| AuthorityConfigError::InvalidKey { index })?;
            if !reader.is_empty() {
                return Err(AuthorityConfigError::InvalidKey { index });
            }
            authorities.insert(public);
        }
        Ok(Self { authorities })
    }

    /// Read the policy from [`SETTLEMENT_AUTHORITIES_ENV`]. An unset variable
    /// yields an empty policy, under which every settlement is unauthorized.
    pub fn from_env() -> Result<Self, AuthorityConfigError> {
        Self::from_configured(std::env::var(SETTLEMENT_AUTHORITIES_ENV).ok())
    }

    fn from_configured(list: Option<String>) -> Result<Self, AuthorityConfigError> {
        match list {
            Some(list) => Self::parse(&list),
            None => {
                warn!(
                    var = SETTLEMENT_AUTHORITIES_ENV,
                    "no settlement authorities configured"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn is_authorized(&self, public: &PublicKey) -> bool {
        self.authorities.contains(public)
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }
}
