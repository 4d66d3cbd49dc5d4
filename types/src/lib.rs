//! Common types for the tournament escrow ledger.
//!
//! Records, instructions, events and their `commonware-codec` encodings live
//! here so that the execution layer and any external tooling agree on a
//! single wire format.

pub mod address;
pub mod codec;
pub mod execution;
pub mod ledger;

mod compat;

pub use address::{derive_balance_address, is_balance_address, Address, BALANCE_NAMESPACE};
pub use execution::{Event, Instruction, Key, Output, Transaction, Value, NAMESPACE};
pub use ledger::{BalanceRecord, LedgerError, MatchHistoryRecord};
