use super::super::*;
use super::rejected;
use crate::ledger;
use escrow_types::Address;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_deposit(
        &mut self,
        public: &PublicKey,
        owner: &PublicKey,
        balance: &Address,
        amount: u64,
    ) -> Result<Vec<Event>> {
        let existing = self.load_balance(balance).await?;
        let deposit = match ledger::deposit(public, owner, balance, amount, existing) {
            Ok(deposit) => deposit,
            Err(error) => return Ok(rejected(public, error)),
        };

        let new_amount = deposit.record.amount;
        self.insert(Key::Balance(*balance), Value::Balance(deposit.record))?;
        debug!(
            owner = ?owner,
            amount,
            new_amount,
            created = deposit.created,
            "deposited"
        );

        Ok(vec![Event::Deposited {
            owner: owner.clone(),
            amount,
            new_amount,
        }])
    }

    pub(in crate::layer) async fn handle_withdraw(
        &mut self,
        public: &PublicKey,
        owner: &PublicKey,
        balance: &Address,
    ) -> Result<Vec<Event>> {
        let existing = self.load_balance(balance).await?;
        let withdrawal = match ledger::withdraw(public, owner, balance, existing) {
            Ok(withdrawal) => withdrawal,
            Err(error) => return Ok(rejected(public, error)),
        };

        let amount = withdrawal.amount;
        self.insert(Key::Balance(*balance), Value::Balance(withdrawal.record))?;
        debug!(owner = ?owner, amount, "withdrew");

        Ok(vec![Event::Withdrawn {
            owner: owner.clone(),
            amount,
        }])
    }
}
