//! Match settlement rules.
//!
//! A settlement debits the entry fee from every participant and splits the
//! resulting pool among the winners. Any remainder of the split goes to the
//! first winner, so the sum of the touched balances is unchanged.

use commonware_cryptography::ed25519::PublicKey;
use escrow_types::{
    derive_balance_address,
    ledger::{MAX_MATCH_ID_LENGTH, MAX_PARTICIPANTS},
    Address, BalanceRecord, LedgerError, MatchHistoryRecord,
};
use std::collections::BTreeSet;

use crate::authority::AuthorityPolicy;

/// Borrowed view of a settlement request.
#[derive(Clone, Copy, Debug)]
pub struct MatchDescriptor<'a> {
    pub match_id: &'a str,
    pub participants: &'a [PublicKey],
    pub winners: &'a [PublicKey],
    pub entry_fee: u64,
}

/// Records produced by an accepted settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Updated balance records, in participant order.
    pub balances: Vec<(Address, BalanceRecord)>,
    pub history: MatchHistoryRecord,
    pub pool: u64,
    /// Amount credited to each winner, in winner order.
    pub payouts: Vec<(PublicKey, u64)>,
}

fn is_unique(keys: &[PublicKey]) -> bool {
    let mut seen = BTreeSet::new();
    keys.iter().all(|key| seen.insert(key))
}

/// Check the shape of a settlement request. Does not look at balances or
/// the signer.
pub fn validate(descriptor: &MatchDescriptor<'_>) -> Result<(), LedgerError> {
    // Stored ids must stay decodable.
    if descriptor.match_id.is_empty() || descriptor.match_id.len() > MAX_MATCH_ID_LENGTH {
        return Err(LedgerError::InvalidMatchId);
    }
    if descriptor.entry_fee == 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let participants = descriptor.participants;
    if participants.is_empty()
        || participants.len() > MAX_PARTICIPANTS
        || !is_unique(participants)
    {
        return Err(LedgerError::InvalidParticipants);
    }

    let winners = descriptor.winners;
    if winners.is_empty()
        || !is_unique(winners)
        || !winners.iter().all(|winner| participants.contains(winner))
    {
        return Err(LedgerError::InvalidWinners);
    }

    Ok(())
}

/// Split `pool` across `winners` shares. The first share also carries the
/// remainder. Returns an empty split when there are no winners.
pub fn split_pool(pool: u64, winners: usize) -> Vec<u64> {
    if winners == 0 {
        return Vec::new();
    }
    let count = winners as u64;
    let share = pool / count;
    let remainder = pool % count;

    let mut shares = vec![share; winners];
    shares[0] += remainder;
    shares
}

/// Settle a match against the currently stored records.
///
/// `balances[i]` must be the derived balance address of `participants[i]`
/// and `records[i]` the record stored there, if any.
pub fn settle(
    descriptor: &MatchDescriptor<'_>,
    authority: &PublicKey,
    policy: &AuthorityPolicy,
    balances: &[Address],
    records: &[Option<BalanceRecord>],
) -> Result<Settlement, LedgerError> {
    validate(descriptor)?;
    if !policy.is_authorized(authority) {
        return Err(LedgerError::Unauthorized);
    }

    let participants = descriptor.participants;
    if balances.len() != participants.len() || records.len() != participants.len() {
        return Err(LedgerError::AddressMismatch);
    }
    for ((participant, address), record) in participants.iter().zip(balances).zip(records) {
        if derive_balance_address(participant) != *address {
            return Err(LedgerError::AddressMismatch);
        }
        if record
            .as_ref()
            .is_some_and(|record| &record.owner != participant)
        {
            return Err(LedgerError::AddressMismatch);
        }
    }

    // Debit
    let fee = descriptor.entry_fee;
    let mut updated = Vec::with_capacity(participants.len());
    for ((participant, address), record) in participants.iter().zip(balances).zip(records) {
        let mut record = record
            .clone()
            .unwrap_or_else(|| BalanceRecord::new(participant.clone()));
        record.amount = record
            .amount
            .checked_sub(fee)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                participant: participant.clone(),
                balance: record.amount,
                required: fee,
            })?;
        updated.push((*address, record));
    }

    let history = MatchHistoryRecord {
        match_id: descriptor.match_id.to_string(),
        participants: participants.to_vec(),
        winners: descriptor.winners.to_vec(),
        entry_fee: fee,
        authority: authority.clone(),
    };
    let pool = history.pool().ok_or(LedgerError::Overflow)?;

    // Credit
    let shares = split_pool(pool, descriptor.winners.len());
    let mut payouts = Vec::with_capacity(shares.len());
    for (winner, share) in descriptor.winners.iter().zip(shares) {
        let index = participants
            .iter()
            .position(|participant| participant == winner)
            .ok_or(LedgerError::InvalidWinners)?;
        let record = &mut updated[index].1;
        record.amount = record
            .amount
            .checked_add(share)
            .ok_or(LedgerError::Overflow)?;
        payouts.push((winner.clone(), share));
    }

    Ok(Settlement {
        balances: updated,
        history,
        pool,
        payouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::create_account_keypair;
    use proptest::prelude::*;

    fn key(seed: u64) -> PublicKey {
        create_account_keypair(seed).1
    }

    fn funded(players: &[PublicKey], amount: u64) -> Vec<Option<BalanceRecord>> {
        players
            .iter()
            .map(|owner| {
                Some(BalanceRecord {
                    owner: owner.clone(),
                    amount,
                })
            })
            .collect()
    }

    fn addresses(players: &[PublicKey]) -> Vec<Address> {
        players.iter().map(derive_balance_address).collect()
    }

    fn descriptor<'a>(
        participants: &'a [PublicKey],
        winners: &'a [PublicKey],
        entry_fee: u64,
    ) -> MatchDescriptor<'a> {
        MatchDescriptor {
            match_id: "match-001",
            participants,
            winners,
            entry_fee,
        }
    }

    #[test]
    fn single_winner_takes_the_pool() {
        let (alice, bob, authority) = (key(1), key(2), key(99));
        let policy = AuthorityPolicy::new([authority.clone()]);
        let participants = vec![bob.clone(), alice.clone()];
        let winners = vec![alice.clone()];

        let settlement = settle(
            &descriptor(&participants, &winners, 100),
            &authority,
            &policy,
            &addresses(&participants),
            &[
                Some(BalanceRecord {
                    owner: bob.clone(),
                    amount: 500,
                }),
                Some(BalanceRecord {
                    owner: alice.clone(),
                    amount: 800,
                }),
            ],
        )
        .unwrap();

        assert_eq!(settlement.pool, 200);
        assert_eq!(settlement.balances[0].1.amount, 400);
        assert_eq!(settlement.balances[1].1.amount, 900);
        assert_eq!(settlement.payouts, vec![(alice, 200)]);
        assert_eq!(settlement.history.match_id, "match-001");
        assert_eq!(settlement.history.authority, authority);
    }

    #[test]
    fn remainder_goes_to_first_winner() {
        assert_eq!(split_pool(100, 3), vec![34, 33, 33]);
        assert_eq!(split_pool(7, 1), vec![7]);
        assert!(split_pool(7, 0).is_empty());

        let players: Vec<PublicKey> = (1..=5).map(key).collect();
        let winners = vec![players[3].clone(), players[1].clone(), players[0].clone()];
        let authority = key(99);
        let policy = AuthorityPolicy::new([authority.clone()]);

        let settlement = settle(
            &descriptor(&players, &winners, 20),
            &authority,
            &policy,
            &addresses(&players),
            &funded(&players, 20),
        )
        .unwrap();

        assert_eq!(settlement.pool, 100);
        assert_eq!(settlement.payouts[0], (players[3].clone(), 34));
        assert_eq!(settlement.balances[3].1.amount, 34);
        assert_eq!(settlement.balances[1].1.amount, 33);
        assert_eq!(settlement.balances[2].1.amount, 0);
    }

    #[test]
    fn shape_errors_follow_check_order() {
        let (alice, bob, carol) = (key(1), key(2), key(3));
        let both = vec![alice.clone(), bob.clone()];

        assert_eq!(
            validate(&descriptor(&[], &[], 0)),
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(
            validate(&descriptor(&[], &[alice.clone()], 10)),
            Err(LedgerError::InvalidParticipants)
        );
        assert_eq!(
            validate(&descriptor(
                &[alice.clone(), alice.clone()],
                &[alice.clone()],
                10
            )),
            Err(LedgerError::InvalidParticipants)
        );
        assert_eq!(
            validate(&descriptor(&both, &[], 10)),
            Err(LedgerError::InvalidWinners)
        );
        assert_eq!(
            validate(&descriptor(&both, &[carol], 10)),
            Err(LedgerError::InvalidWinners)
        );
        assert_eq!(
            validate(&descriptor(&both, &[bob.clone(), bob], 10)),
            Err(LedgerError::InvalidWinners)
        );
    }

    #[test]
    fn too_many_participants_is_invalid() {
        let players: Vec<PublicKey> = (0..=MAX_PARTICIPANTS as u64).map(key).collect();
        let winners = vec![players[0].clone()];
        assert_eq!(
            validate(&descriptor(&players, &winners, 1)),
            Err(LedgerError::InvalidParticipants)
        );
    }

    #[test]
    fn unknown_authority_is_unauthorized() {
        let (alice, bob) = (key(1), key(2));
        let players = vec![alice.clone(), bob];
        let winners = vec![alice.clone()];
        let policy = AuthorityPolicy::new([key(99)]);

        assert_eq!(
            settle(
                &descriptor(&players, &winners, 10),
                &alice,
                &policy,
                &addresses(&players),
                &funded(&players, 10),
            ),
            Err(LedgerError::Unauthorized)
        );
    }

    #[test]
    fn swapped_addresses_mismatch() {
        let (alice, bob, authority) = (key(1), key(2), key(99));
        let players = vec![alice.clone(), bob.clone()];
        let winners = vec![alice];
        let policy = AuthorityPolicy::new([authority.clone()]);
        let mut swapped = addresses(&players);
        swapped.reverse();

        assert_eq!(
            settle(
                &descriptor(&players, &winners, 10),
                &authority,
                &policy,
                &swapped,
                &funded(&players, 10),
            ),
            Err(LedgerError::AddressMismatch)
        );
        assert_eq!(
            settle(
                &descriptor(&players, &winners, 10),
                &authority,
                &policy,
                &addresses(&players[..1]),
                &funded(&players[..1], 10),
            ),
            Err(LedgerError::AddressMismatch)
        );
    }

    #[test]
    fn underfunded_participant_is_named() {
        let (alice, bob, authority) = (key(1), key(2), key(99));
        let players = vec![alice.clone(), bob.clone()];
        let winners = vec![alice.clone()];
        let policy = AuthorityPolicy::new([authority.clone()]);

        let records = vec![
            Some(BalanceRecord {
                owner: alice,
                amount: 100,
            }),
            None,
        ];
        assert_eq!(
            settle(
                &descriptor(&players, &winners, 100),
                &authority,
                &policy,
                &addresses(&players),
                &records,
            ),
            Err(LedgerError::InsufficientFunds {
                participant: bob,
                balance: 0,
                required: 100,
            })
        );
    }

    #[test]
    fn match_id_must_fit_the_codec_limit() {
        let (alice, bob) = (key(1), key(2));
        let players = vec![alice.clone(), bob];
        let winners = vec![alice];

        let at_limit = "x".repeat(MAX_MATCH_ID_LENGTH);
        let mut shape = descriptor(&players, &winners, 10);
        shape.match_id = &at_limit;
        assert_eq!(validate(&shape), Ok(()));

        let too_long = "x".repeat(MAX_MATCH_ID_LENGTH + 1);
        shape.match_id = &too_long;
        assert_eq!(validate(&shape), Err(LedgerError::InvalidMatchId));

        // Reported ahead of every other shape error.
        shape.entry_fee = 0;
        assert_eq!(validate(&shape), Err(LedgerError::InvalidMatchId));

        shape.match_id = "";
        assert_eq!(validate(&shape), Err(LedgerError::InvalidMatchId));
    }

    #[test]
    fn pool_overflow_is_rejected() {
        let (alice, bob, authority) = (key(1), key(2), key(99));
        let players = vec![alice.clone(), bob];
        let winners = vec![alice];
        let policy = AuthorityPolicy::new([authority.clone()]);

        assert_eq!(
            settle(
                &descriptor(&players, &winners, u64::MAX / 2 + 1),
                &authority,
                &policy,
                &addresses(&players),
                &funded(&players, u64::MAX),
            ),
            Err(LedgerError::Overflow)
        );
    }

    #[test]
    fn winner_credit_overflow_is_rejected() {
        let (alice, bob, authority) = (key(1), key(2), key(99));
        let players = vec![alice.clone(), bob.clone()];
        let winners = vec![alice.clone()];
        let policy = AuthorityPolicy::new([authority.clone()]);

        // Alice keeps u64::MAX - 1 after the fee, then receives the pool of 2.
        let records = vec![
            Some(BalanceRecord {
                owner: alice,
                amount: u64::MAX,
            }),
            Some(BalanceRecord {
                owner: bob,
                amount: 1,
            }),
        ];
        assert_eq!(
            settle(
                &descriptor(&players, &winners, 1),
                &authority,
                &policy,
                &addresses(&players),
                &records,
            ),
            Err(LedgerError::Overflow)
        );
    }

    proptest! {
        #[test]
        fn split_pays_out_entire_pool(pool in any::<u64>(), winners in 1usize..=MAX_PARTICIPANTS) {
            let shares = split_pool(pool, winners);
            prop_assert_eq!(shares.len(), winners);
            prop_assert_eq!(shares.iter().map(|s| *s as u128).sum::<u128>(), pool as u128);
            prop_assert!(shares.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn settlement_is_zero_sum(
            count in 1usize..12,
            winner_mask in 1u32..4096,
            fee in 1u64..1_000,
            extra in proptest::collection::vec(0u64..10_000, 12),
        ) {
            let players: Vec<PublicKey> = (0..count as u64).map(|i| key(i + 1)).collect();
            let mut winners: Vec<PublicKey> = players
                .iter()
                .enumerate()
                .filter(|(i, _)| winner_mask & (1 << i) != 0)
                .map(|(_, p)| p.clone())
                .collect();
            if winners.is_empty() {
                winners.push(players[count - 1].clone());
            }
            let records: Vec<Option<BalanceRecord>> = players
                .iter()
                .zip(&extra)
                .map(|(owner, extra)| Some(BalanceRecord { owner: owner.clone(), amount: fee + extra }))
                .collect();
            let before: u64 = records.iter().flatten().map(|r| r.amount).sum();

            let authority = key(999);
            let policy = AuthorityPolicy::new([authority.clone()]);
            let settlement = settle(
                &descriptor(&players, &winners, fee),
                &authority,
                &policy,
                &addresses(&players),
                &records,
            ).unwrap();

            let after: u64 = settlement.balances.iter().map(|(_, r)| r.amount).sum();
            prop_assert_eq!(before, after);
            prop_assert_eq!(settlement.payouts.iter().map(|(_, s)| s).sum::<u64>(), settlement.pool);
        }
    }
}
