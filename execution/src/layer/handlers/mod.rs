use super::*;
use escrow_types::{Address, BalanceRecord, LedgerError};

fn rejected(caller: &PublicKey, error: LedgerError) -> Vec<Event> {
    debug!(caller = ?caller, code = error.code(), %error, "instruction rejected");
    vec![Event::Rejected {
        caller: caller.clone(),
        error,
    }]
}

impl<'a, S: State> Layer<'a, S> {
    async fn load_balance(&self, address: &Address) -> Result<Option<BalanceRecord>> {
        match self.get(&Key::Balance(*address)).await? {
            Some(Value::Balance(record)) => Ok(Some(record)),
            None => Ok(None),
            Some(other) => anyhow::bail!("unexpected value at balance {address:?}: {other:?}"),
        }
    }
}

mod ledger;
mod settlement;
