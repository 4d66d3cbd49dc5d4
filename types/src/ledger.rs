use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

use crate::codec::{read_string, string_encode_size, write_string};

/// Maximum length of a caller-supplied match identifier.
pub const MAX_MATCH_ID_LENGTH: usize = 64;

/// Maximum number of participants in a single settlement.
pub const MAX_PARTICIPANTS: usize = 64;

/// Error codes carried by rejected instructions.
pub const ERROR_INVALID_AMOUNT: u8 = 1;
pub const ERROR_UNAUTHORIZED: u8 = 2;
pub const ERROR_ADDRESS_MISMATCH: u8 = 3;
pub const ERROR_NOTHING_TO_WITHDRAW: u8 = 4;
pub const ERROR_INVALID_PARTICIPANTS: u8 = 5;
pub const ERROR_INVALID_WINNERS: u8 = 6;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 7;
pub const ERROR_OVERFLOW: u8 = 8;
pub const ERROR_MATCH_ALREADY_SETTLED: u8 = 9;
pub const ERROR_HISTORY_SLOT_OCCUPIED: u8 = 10;
pub const ERROR_INVALID_MATCH_ID: u8 = 11;

/// Terminal failure of a ledger or settlement instruction.
///
/// Any of these aborts the whole instruction without touching state.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("caller is not authorized for this record")]
    Unauthorized,
    #[error("balance address does not match the derived address")]
    AddressMismatch,
    #[error("nothing to withdraw")]
    NothingToWithdraw,
    #[error("participants must be non-empty and unique")]
    InvalidParticipants,
    #[error("winners must be a non-empty unique subset of participants")]
    InvalidWinners,
    #[error("insufficient funds for {participant:?} (balance={balance}, required={required})")]
    InsufficientFunds {
        participant: PublicKey,
        balance: u64,
        required: u64,
    },
    #[error("arithmetic overflow")]
    Overflow,
    #[error("match already settled")]
    MatchAlreadySettled,
    #[error("match history slot already occupied")]
    HistorySlotOccupied,
    #[error("match id must be non-empty and at most 64 bytes")]
    InvalidMatchId,
}

impl LedgerError {
    pub fn code(&self) -> u8 {
        match self {
            Self::InvalidAmount => ERROR_INVALID_AMOUNT,
            Self::Unauthorized => ERROR_UNAUTHORIZED,
            Self::AddressMismatch => ERROR_ADDRESS_MISMATCH,
            Self::NothingToWithdraw => ERROR_NOTHING_TO_WITHDRAW,
            Self::InvalidParticipants => ERROR_INVALID_PARTICIPANTS,
            Self::InvalidWinners => ERROR_INVALID_WINNERS,
            Self::InsufficientFunds { .. } => ERROR_INSUFFICIENT_FUNDS,
            Self::Overflow => ERROR_OVERFLOW,
            Self::MatchAlreadySettled => ERROR_MATCH_ALREADY_SETTLED,
            Self::HistorySlotOccupied => ERROR_HISTORY_SLOT_OCCUPIED,
            Self::InvalidMatchId => ERROR_INVALID_MATCH_ID,
        }
    }
}

impl Write for LedgerError {
    fn write(&self, writer: &mut impl BufMut) {
        self.code().write(writer);
        if let Self::InsufficientFunds {
            participant,
            balance,
            required,
        } = self
        {
            participant.write(writer);
            balance.write(writer);
            required.write(writer);
        }
    }
}

impl Read for LedgerError {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let error = match u8::read(reader)? {
            ERROR_INVALID_AMOUNT => Self::InvalidAmount,
            ERROR_UNAUTHORIZED => Self::Unauthorized,
            ERROR_ADDRESS_MISMATCH => Self::AddressMismatch,
            ERROR_NOTHING_TO_WITHDRAW => Self::NothingToWithdraw,
            ERROR_INVALID_PARTICIPANTS => Self::InvalidParticipants,
            ERROR_INVALID_WINNERS => Self::InvalidWinners,
            ERROR_INSUFFICIENT_FUNDS => Self::InsufficientFunds {
                participant: PublicKey::read(reader)?,
                balance: u64::read(reader)?,
                required: u64::read(reader)?,
            },
            ERROR_OVERFLOW => Self::Overflow,
            ERROR_MATCH_ALREADY_SETTLED => Self::MatchAlreadySettled,
            ERROR_HISTORY_SLOT_OCCUPIED => Self::HistorySlotOccupied,
            ERROR_INVALID_MATCH_ID => Self::InvalidMatchId,
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(error)
    }
}

impl EncodeSize for LedgerError {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::InsufficientFunds {
                participant,
                balance,
                required,
            } => participant.encode_size() + balance.encode_size() + required.encode_size(),
            _ => 0,
        }
    }
}

/// Per-player escrowed balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceRecord {
    pub owner: PublicKey,
    pub amount: u64,
}

impl BalanceRecord {
    /// An empty record, as created on first deposit.
    pub fn new(owner: PublicKey) -> Self {
        Self { owner, amount: 0 }
    }
}

impl Write for BalanceRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.amount.write(writer);
    }
}

impl Read for BalanceRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            owner: PublicKey::read(reader)?,
            amount: u64::read(reader)?,
        })
    }
}

impl EncodeSize for BalanceRecord {
    fn encode_size(&self) -> usize {
        self.owner.encode_size() + self.amount.encode_size()
    }
}

/// Immutable audit record written once per settled match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchHistoryRecord {
    pub match_id: String,
    pub participants: Vec<PublicKey>,
    pub winners: Vec<PublicKey>,
    pub entry_fee: u64,
    pub authority: PublicKey,
}

impl MatchHistoryRecord {
    /// Total fees collected by the settlement.
    pub fn pool(&self) -> Option<u64> {
        self.entry_fee.checked_mul(self.participants.len() as u64)
    }

    pub fn is_winner(&self, player: &PublicKey) -> bool {
        self.winners.contains(player)
    }
}

impl Write for MatchHistoryRecord {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.match_id, writer);
        self.participants.write(writer);
        self.winners.write(writer);
        self.entry_fee.write(writer);
        self.authority.write(writer);
    }
}

impl Read for MatchHistoryRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            match_id: read_string(reader, MAX_MATCH_ID_LENGTH)?,
            participants: Vec::<PublicKey>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
            winners: Vec::<PublicKey>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
            entry_fee: u64::read(reader)?,
            authority: PublicKey::read(reader)?,
        })
    }
}

impl EncodeSize for MatchHistoryRecord {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.match_id)
            + self.participants.encode_size()
            + self.winners.encode_size()
            + self.entry_fee.encode_size()
            + self.authority.encode_size()
    }
}
