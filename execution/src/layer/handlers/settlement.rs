use super::super::*;
use super::rejected;
use crate::settlement::{self, MatchDescriptor};
use escrow_types::{Address, LedgerError};
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub(in crate::layer) async fn handle_settle_match(
        &mut self,
        public: &PublicKey,
        match_id: &str,
        participants: &[PublicKey],
        winners: &[PublicKey],
        entry_fee: u64,
        balances: &[Address],
        history_slot: u64,
    ) -> Result<Vec<Event>> {
        let mut records = Vec::with_capacity(balances.len());
        for address in balances {
            records.push(self.load_balance(address).await?);
        }

        let descriptor = MatchDescriptor {
            match_id,
            participants,
            winners,
            entry_fee,
        };
        let outcome =
            match settlement::settle(&descriptor, public, &self.policy, balances, &records) {
                Ok(outcome) => outcome,
                Err(error) => return Ok(rejected(public, error)),
            };

        let index = Key::SettledMatch(match_id.to_string());
        if self.get(&index).await?.is_some() {
            return Ok(rejected(public, LedgerError::MatchAlreadySettled));
        }
        let slot = Key::MatchHistory(history_slot);
        if self.get(&slot).await?.is_some() {
            return Ok(rejected(public, LedgerError::HistorySlotOccupied));
        }

        for (address, record) in outcome.balances {
            self.insert(Key::Balance(address), Value::Balance(record))?;
        }
        self.insert(slot, Value::MatchHistory(outcome.history))?;
        self.insert(index, Value::SettledMatch(history_slot))?;

        info!(
            match_id,
            authority = ?public,
            history_slot,
            participants = participants.len(),
            winners = winners.len(),
            pool = outcome.pool,
            "match settled"
        );

        Ok(vec![Event::MatchSettled {
            match_id: match_id.to_string(),
            authority: public.clone(),
            history_slot,
            pool: outcome.pool,
            payouts: outcome.payouts,
        }])
    }
}
