//! Deposit and withdraw rules for player balance records.
//!
//! These functions are pure: they take the record currently stored at the
//! target address (if any) and return the record to write back. The [`Layer`]
//! handlers own loading and staging.
//!
//! [`Layer`]: crate::Layer

use commonware_cryptography::ed25519::PublicKey;
use escrow_types::{is_balance_address, Address, BalanceRecord, LedgerError};

/// Result of an accepted deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    pub record: BalanceRecord,
    /// True when the record did not exist before this deposit.
    pub created: bool,
}

/// Result of an accepted withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub record: BalanceRecord,
    pub amount: u64,
}

fn authorize(
    caller: &PublicKey,
    owner: &PublicKey,
    target: &Address,
    existing: Option<&BalanceRecord>,
) -> Result<(), LedgerError> {
    if caller != owner {
        return Err(LedgerError::Unauthorized);
    }
    if !is_balance_address(owner, target) {
        return Err(LedgerError::AddressMismatch);
    }
    if existing.is_some_and(|record| &record.owner != owner) {
        return Err(LedgerError::AddressMismatch);
    }
    Ok(())
}

/// Credit `amount` to the owner's record, creating it if absent.
pub fn deposit(
    caller: &PublicKey,
    owner: &PublicKey,
    target: &Address,
    amount: u64,
    existing: Option<BalanceRecord>,
) -> Result<Deposit, LedgerError> {
    authorize(caller, owner, target, existing.as_ref())?;
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let (mut record, created) = match existing {
        Some(record) => (record, false),
        None => (BalanceRecord::new(owner.clone()), true),
    };
    record.amount = record
        .amount
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;

    Ok(Deposit { record, created })
}

/// Withdraw the owner's entire balance, leaving the record at zero.
pub fn withdraw(
    caller: &PublicKey,
    owner: &PublicKey,
    target: &Address,
    existing: Option<BalanceRecord>,
) -> Result<Withdrawal, LedgerError> {
    authorize(caller, owner, target, existing.as_ref())?;

    let mut record = match existing {
        Some(record) if record.amount > 0 => record,
        _ => return Err(LedgerError::NothingToWithdraw),
    };
    let amount = std::mem::take(&mut record.amount);

    Ok(Withdrawal { record, amount })
}
