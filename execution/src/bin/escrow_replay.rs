//! Replay a reference tournament against an in-memory ledger.
//!
//! Alice and Bob deposit, an authority settles "match-001" with Alice as the
//! winner, then Bob withdraws what is left. Every output is printed.

use anyhow::{Context, Result};
use clap::Parser;
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use commonware_utils::hex;
use escrow_execution::{query::balance_of, AuthorityPolicy, Layer, Memory, State};
use escrow_types::execution::{Event, Instruction, Output, Transaction};
use futures::executor::block_on;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a reference escrow tournament")]
struct Args {
    /// Amount Alice deposits before the match
    #[arg(long, default_value = "800")]
    alice_deposit: u64,

    /// Amount Bob deposits before the match
    #[arg(long, default_value = "500")]
    bob_deposit: u64,

    /// Entry fee charged to each participant
    #[arg(long, default_value = "100")]
    entry_fee: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("escrow-replay failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let alice = PrivateKey::from_seed(1);
    let bob = PrivateKey::from_seed(2);
    let authority = PrivateKey::from_seed(99);
    let policy = AuthorityPolicy::new([authority.public_key()]);
    info!(authority = %hex(authority.public_key().as_ref()), "settlement authority");

    let blocks = vec![
        vec![
            Transaction::sign(
                &alice,
                0,
                Instruction::deposit(alice.public_key(), args.alice_deposit),
            ),
            Transaction::sign(
                &bob,
                0,
                Instruction::deposit(bob.public_key(), args.bob_deposit),
            ),
        ],
        vec![Transaction::sign(
            &authority,
            0,
            Instruction::settle_match(
                "match-001",
                vec![bob.public_key(), alice.public_key()],
                vec![alice.public_key()],
                args.entry_fee,
                0,
            ),
        )],
        vec![Transaction::sign(&bob, 1, Instruction::withdraw(bob.public_key()))],
    ];

    block_on(async {
        let mut state = Memory::default();
        for (height, transactions) in blocks.into_iter().enumerate() {
            let mut layer = Layer::new(&state, policy.clone());
            let (outputs, _) = layer
                .execute(transactions)
                .await
                .with_context(|| format!("failed to execute block {height}"))?;
            let changes = layer.commit();
            state
                .apply(changes)
                .await
                .with_context(|| format!("failed to apply block {height}"))?;

            for output in outputs {
                if let Output::Event(event) = output {
                    println!("[{height}] {}", describe(&event));
                }
            }
        }

        for (name, key) in [("alice", &alice), ("bob", &bob)] {
            let amount = balance_of(&state, &key.public_key()).await?;
            println!("{name:<5} balance {amount}");
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn describe(event: &Event) -> String {
    match event {
        Event::Deposited {
            owner,
            amount,
            new_amount,
        } => format!("deposited {amount} for {} (now {new_amount})", hex(owner.as_ref())),
        Event::Withdrawn { owner, amount } => {
            format!("withdrew {amount} for {}", hex(owner.as_ref()))
        }
        Event::MatchSettled {
            match_id,
            pool,
            payouts,
            ..
        } => format!(
            "settled {match_id}: pool {pool}, {} winner(s)",
            payouts.len()
        ),
        Event::Rejected { caller, error } => {
            format!("rejected {} ({error})", hex(caller.as_ref()))
        }
    }
}
