use crate::{authority::AuthorityPolicy, Layer, Memory, State};
use anyhow::Result;
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use escrow_types::execution::{Instruction, Output, Transaction};

/// Creates an account keypair for Ed25519 signatures used by players and authorities
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let private = PrivateKey::from_seed(seed);
    let public = private.public_key();
    (private, public)
}

/// Executes `transactions` in a fresh layer and applies the resulting changes
pub async fn execute_transactions<S: State>(
    state: &mut S,
    policy: &AuthorityPolicy,
    transactions: Vec<Transaction>,
) -> Result<Vec<Output>> {
    let mut layer = Layer::new(&*state, policy.clone());
    let (outputs, _) = layer.execute(transactions).await?;
    let changes = layer.commit();
    state.apply(changes).await?;
    Ok(outputs)
}

/// Creates an in-memory ledger where each `(seed, amount)` player has deposited
/// `amount` with their first nonce
pub async fn create_funded_state(players: &[(u64, u64)]) -> Result<Memory> {
    let mut state = Memory::default();
    let transactions = players
        .iter()
        .map(|(seed, amount)| {
            let (private, public) = create_account_keypair(*seed);
            Transaction::sign(&private, 0, Instruction::deposit(public, *amount))
        })
        .collect();
    execute_transactions(&mut state, &AuthorityPolicy::default(), transactions).await?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::balance_of;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn funded_state_credits_each_player() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let state = create_funded_state(&[(1, 500), (2, 800)]).await.unwrap();
            assert_eq!(balance_of(&state, &create_account_keypair(1).1).await.unwrap(), 500);
            assert_eq!(balance_of(&state, &create_account_keypair(2).1).await.unwrap(), 800);
            assert_eq!(state.total_balance(), 1_300);
        });
    }
}
