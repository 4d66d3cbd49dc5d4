//! Tournament escrow execution layer.
//!
//! This crate contains the deterministic transaction execution logic ([`Layer`]) for the
//! escrow ledger: player deposits and withdrawals, and match settlement by a trusted
//! authority.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time or randomness inside execution.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Execution model
//! Each transaction declares the keys it touches ([`escrow_types::Transaction::access_set`]).
//! The [`Layer`] rejects any access outside that set, so a runtime may execute
//! transactions with disjoint access sets in parallel.
//!
//! ## Minimal execution pipeline (example)
//! ```rust,ignore
//! use escrow_execution::{AuthorityPolicy, Layer, Memory, State};
//!
//! let mut state = Memory::default();
//! let policy = AuthorityPolicy::from_env()?;
//! let mut layer = Layer::new(&state, policy);
//! let (outputs, _nonces) = layer.execute(transactions).await?;
//! let changes = layer.commit();
//! state.apply(changes).await?;
//! ```

pub mod authority;
pub mod ledger;
pub mod query;
pub mod settlement;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod conservation_tests;

mod layer;

mod state;

pub use authority::{AuthorityConfigError, AuthorityPolicy, SETTLEMENT_AUTHORITIES_ENV};
pub use layer::Layer;
pub use state::{nonce, Memory, PrepareError, State, Status};
