//! Read-only lookups over committed ledger state.
//!
//! ```rust,ignore
//! use escrow_execution::query::{balance_of, match_history, settled_match_slot};
//!
//! let amount = balance_of(&state, &player).await?;
//! if let Some(slot) = settled_match_slot(&state, "match-001").await? {
//!     let record = match_history(&state, slot).await?;
//! }
//! ```

use anyhow::{bail, Result};
use commonware_cryptography::ed25519::PublicKey;
use escrow_types::{
    derive_balance_address,
    execution::{Key, Value},
    BalanceRecord, MatchHistoryRecord,
};

use crate::state::State;

/// Balance record owned by `owner`, if one was ever created.
pub async fn balance_record<S: State>(state: &S, owner: &PublicKey) -> Result<Option<BalanceRecord>> {
    let key = Key::Balance(derive_balance_address(owner));
    match state.get(&key).await? {
        Some(Value::Balance(record)) => Ok(Some(record)),
        None => Ok(None),
        Some(other) => bail!("unexpected value at {key:?}: {other:?}"),
    }
}

/// Escrowed amount of `owner`. A missing record reads as zero.
pub async fn balance_of<S: State>(state: &S, owner: &PublicKey) -> Result<u64> {
    Ok(balance_record(state, owner)
        .await?
        .map(|record| record.amount)
        .unwrap_or_default())
}

pub async fn match_history<S: State>(state: &S, slot: u64) -> Result<Option<MatchHistoryRecord>> {
    let key = Key::MatchHistory(slot);
    match state.get(&key).await? {
        Some(Value::MatchHistory(record)) => Ok(Some(record)),
        None => Ok(None),
        Some(other) => bail!("unexpected value at {key:?}: {other:?}"),
    }
}

/// History slot of a settled match, if `match_id` has been settled.
pub async fn settled_match_slot<S: State>(state: &S, match_id: &str) -> Result<Option<u64>> {
    let key = Key::SettledMatch(match_id.to_string());
    match state.get(&key).await? {
        Some(Value::SettledMatch(slot)) => Ok(Some(slot)),
        None => Ok(None),
        Some(other) => bail!("unexpected value at {key:?}: {other:?}"),
    }
}
