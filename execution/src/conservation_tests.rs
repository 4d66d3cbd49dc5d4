#[cfg(test)]
mod tests {
    use crate::authority::AuthorityPolicy;
    use crate::mocks::{create_account_keypair, execute_transactions};
    use crate::state::Memory;
    use commonware_cryptography::{
        ed25519::{PrivateKey, PublicKey},
        Signer,
    };
    use escrow_types::execution::{Event, Instruction, Output, Transaction};
    use futures::executor::block_on;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    const PLAYERS: u64 = 6;
    const AUTHORITY_SEED: u64 = 1_000;

    #[derive(Clone, Debug)]
    enum Op {
        Deposit { player: u64, amount: u64 },
        Withdraw { player: u64 },
        Settle { participants: u8, winners: u8, fee: u64 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..PLAYERS, 0u64..2_000).prop_map(|(player, amount)| Op::Deposit { player, amount }),
            (0..PLAYERS).prop_map(|player| Op::Withdraw { player }),
            (1u8..64, 1u8..64, 0u64..300).prop_map(|(participants, winners, fee)| Op::Settle {
                participants,
                winners,
                fee,
            }),
        ]
    }

    fn members(mask: u8, keys: &[PublicKey]) -> Vec<PublicKey> {
        keys.iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, key)| key.clone())
            .collect()
    }

    struct Harness {
        state: Memory,
        policy: AuthorityPolicy,
        players: Vec<(PrivateKey, PublicKey)>,
        authority: PrivateKey,
        nonces: BTreeMap<PublicKey, u64>,
        slot: u64,
        deposited: u128,
        withdrawn: u128,
    }

    impl Harness {
        fn new() -> Self {
            let (authority, authority_public) = create_account_keypair(AUTHORITY_SEED);
            Self {
                state: Memory::default(),
                policy: AuthorityPolicy::new([authority_public]),
                players: (0..PLAYERS).map(|seed| create_account_keypair(seed + 1)).collect(),
                authority,
                nonces: BTreeMap::new(),
                slot: 0,
                deposited: 0,
                withdrawn: 0,
            }
        }

        fn sign(&mut self, private: &PrivateKey, instruction: Instruction) -> Transaction {
            let nonce = self.nonces.entry(private.public_key()).or_default();
            let tx = Transaction::sign(private, *nonce, instruction);
            *nonce += 1;
            tx
        }

        async fn run(&mut self, op: Op) {
            let tx = match op {
                Op::Deposit { player, amount } => {
                    let (private, public) = self.players[player as usize].clone();
                    self.sign(&private, Instruction::deposit(public, amount))
                }
                Op::Withdraw { player } => {
                    let (private, public) = self.players[player as usize].clone();
                    self.sign(&private, Instruction::withdraw(public))
                }
                Op::Settle {
                    participants,
                    winners,
                    fee,
                } => {
                    let keys: Vec<PublicKey> =
                        self.players.iter().map(|(_, public)| public.clone()).collect();
                    let participants = members(participants, &keys);
                    let winners = members(winners, &keys);
                    self.slot += 1;
                    let instruction = Instruction::settle_match(
                        format!("match-{}", self.slot),
                        participants,
                        winners,
                        fee,
                        self.slot,
                    );
                    let authority = self.authority.clone();
                    self.sign(&authority, instruction)
                }
            };

            let outputs = execute_transactions(&mut self.state, &self.policy, vec![tx])
                .await
                .unwrap();
            for output in outputs {
                match output {
                    Output::Event(Event::Deposited { amount, .. }) => {
                        self.deposited += amount as u128
                    }
                    Output::Event(Event::Withdrawn { amount, .. }) => {
                        self.withdrawn += amount as u128
                    }
                    _ => {}
                }
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn balances_plus_withdrawals_equal_deposits(ops in proptest::collection::vec(op(), 1..40)) {
            let mut harness = Harness::new();
            block_on(async {
                for op in ops {
                    harness.run(op).await;
                }
            });
            prop_assert_eq!(
                harness.state.total_balance() + harness.withdrawn,
                harness.deposited
            );
        }
    }
}
