#![cfg(test)]
use crate::address::derive_balance_address;
use crate::execution::{Instruction, Key, Value};
use crate::ledger::{BalanceRecord, LedgerError};
use commonware_codec::Encode;
use commonware_cryptography::{ed25519::PrivateKey, Signer};

#[test]
fn key_encoding_is_stable() {
    assert_eq!(
        Key::MatchHistory(42).encode().as_ref(),
        &[2u8, 0, 0, 0, 0, 0, 0, 0, 42]
    );
    assert_eq!(
        Key::SettledMatch("m1".to_string()).encode().as_ref(),
        &[3u8, 0, 0, 0, 2, b'm', b'1']
    );

    let owner = PrivateKey::from_seed(1).public_key();
    let address = derive_balance_address(&owner);
    let mut expected = vec![1u8];
    expected.extend_from_slice(address.as_ref());
    assert_eq!(Key::Balance(address).encode().as_ref(), expected.as_slice());
}

#[test]
fn deposit_encoding_is_stable() {
    let owner = PrivateKey::from_seed(1).public_key();
    let instruction = Instruction::deposit(owner.clone(), 500);

    let mut expected = vec![0u8];
    expected.extend_from_slice(owner.as_ref());
    expected.extend_from_slice(derive_balance_address(&owner).as_ref());
    expected.extend_from_slice(&500u64.to_be_bytes());
    assert_eq!(instruction.encode().as_ref(), expected.as_slice());
}

#[test]
fn balance_value_encoding_is_stable() {
    let owner = PrivateKey::from_seed(1).public_key();
    let value = Value::Balance(BalanceRecord {
        owner: owner.clone(),
        amount: 800,
    });

    let mut expected = vec![1u8];
    expected.extend_from_slice(owner.as_ref());
    expected.extend_from_slice(&800u64.to_be_bytes());
    assert_eq!(value.encode().as_ref(), expected.as_slice());
}

#[test]
fn error_encoding_is_stable() {
    assert_eq!(LedgerError::InvalidAmount.encode().as_ref(), &[1u8]);
    assert_eq!(LedgerError::NothingToWithdraw.encode().as_ref(), &[4u8]);
    assert_eq!(LedgerError::MatchAlreadySettled.encode().as_ref(), &[9u8]);
    assert_eq!(LedgerError::InvalidMatchId.encode().as_ref(), &[11u8]);
}
