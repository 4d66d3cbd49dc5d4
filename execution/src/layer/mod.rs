use anyhow::{Context as _, Result};
use commonware_cryptography::ed25519::PublicKey;
use escrow_types::execution::{Event, Instruction, Key, Output, Transaction, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::authority::AuthorityPolicy;
use crate::state::{load_account, validate_and_increment_nonce, PrepareError, State, Status};

mod handlers;

/// Executes transactions against a [`State`], staging every write until
/// [`Layer::commit`].
///
/// While a transaction runs, reads and writes are restricted to the keys it
/// declares in [`Transaction::access_set`]. Touching any other key is an
/// execution error.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    policy: AuthorityPolicy,
    scope: Option<BTreeSet<Key>>,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, policy: AuthorityPolicy) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            policy,
            scope: None,
        }
    }

    fn check_scope(&self, key: &Key) -> Result<()> {
        match &self.scope {
            Some(scope) if !scope.contains(key) => {
                anyhow::bail!("access to undeclared key {key:?}")
            }
            _ => Ok(()),
        }
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.check_scope(&key)?;
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public)
            .await
            .map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.insert(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        )
        .map_err(PrepareError::State)?;

        Ok(())
    }

    async fn apply(&mut self, transaction: &Transaction) -> Result<Vec<Event>> {
        let public = &transaction.public;

        match &transaction.instruction {
            Instruction::Deposit {
                owner,
                balance,
                amount,
            } => self.handle_deposit(public, owner, balance, *amount).await,
            Instruction::Withdraw { owner, balance } => {
                self.handle_withdraw(public, owner, balance).await
            }
            Instruction::SettleMatch {
                match_id,
                participants,
                winners,
                entry_fee,
                balances,
                history_slot,
            } => {
                self.handle_settle_match(
                    public,
                    match_id,
                    participants,
                    winners,
                    *entry_fee,
                    balances,
                    *history_slot,
                )
                .await
            }
        }
    }

    /// Execute `transactions` in order.
    ///
    /// Transactions with an invalid signature or an unexpected nonce are
    /// dropped. Accepted transactions always consume their nonce, even when
    /// the instruction itself is rejected. Returns the produced outputs and
    /// the next expected nonce of every signer that had a transaction accepted.
    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            if !tx.verify() {
                debug!(public = ?tx.public, nonce = tx.nonce, "invalid signature; dropping transaction");
                continue;
            }

            self.scope = Some(tx.access_set());
            match self.prepare(&tx).await {
                Ok(()) => {}
                Err(PrepareError::NonceMismatch { expected, got }) => {
                    debug!(
                        public = ?tx.public,
                        expected,
                        got,
                        "nonce mismatch; dropping transaction"
                    );
                    self.scope = None;
                    continue;
                }
                Err(PrepareError::State(err)) => {
                    return Err(err).context("state error during prepare");
                }
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));
            let events = self
                .apply(&tx)
                .await
                .with_context(|| format!("failed to apply transaction from {:?}", tx.public))?;
            self.scope = None;

            outputs.extend(events.into_iter().map(Output::Event));
            outputs.push(Output::Transaction(tx));
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.check_scope(key)?;
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        Layer::insert(self, key, value)
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.check_scope(key)?;
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}
