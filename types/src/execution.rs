use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    Signer, Verifier,
};
use commonware_utils::union;
use std::collections::BTreeSet;

use crate::address::{derive_balance_address, Address};
use crate::codec::{read_string, string_encode_size, write_string};
use crate::ledger::{
    BalanceRecord, LedgerError, MatchHistoryRecord, MAX_MATCH_ID_LENGTH, MAX_PARTICIPANTS,
};

pub const NAMESPACE: &[u8] = b"_ESCROW";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }

    /// Every key this transaction may read or write, including the signer's
    /// nonce account.
    pub fn access_set(&self) -> BTreeSet<Key> {
        let mut keys = self.instruction.access_set();
        keys.insert(Key::Account(self.public.clone()));
        keys
    }

    /// Two transactions conflict when their access sets intersect. Conflicting
    /// transactions must be executed one after the other.
    pub fn conflicts_with(&self, other: &Transaction) -> bool {
        let ours = self.access_set();
        other.access_set().iter().any(|key| ours.contains(key))
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let instruction = Instruction::read(reader)?;
        let public = ed25519::PublicKey::read(reader)?;
        let signature = ed25519::Signature::read(reader)?;

        Ok(Self {
            nonce,
            instruction,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Credit `amount` to the owner's balance record, creating it if absent.
    /// Binary: [0] [owner:32] [balance:32] [amount:u64 BE]
    Deposit {
        owner: PublicKey,
        balance: Address,
        amount: u64,
    },

    /// Withdraw the owner's entire balance.
    /// Binary: [1] [owner:32] [balance:32]
    Withdraw { owner: PublicKey, balance: Address },

    /// Settle a completed match. The signer is the settling authority.
    /// `balances[i]` must be the balance address of `participants[i]`.
    /// Binary: [2] [matchIdLen:u32 BE] [matchId...] [participants] [winners]
    /// [entryFee:u64 BE] [balances] [historySlot:u64 BE]
    SettleMatch {
        match_id: String,
        participants: Vec<PublicKey>,
        winners: Vec<PublicKey>,
        entry_fee: u64,
        balances: Vec<Address>,
        history_slot: u64,
    },
}

impl Instruction {
    /// Build a deposit targeting the owner's derived balance address.
    pub fn deposit(owner: PublicKey, amount: u64) -> Self {
        let balance = derive_balance_address(&owner);
        Self::Deposit {
            owner,
            balance,
            amount,
        }
    }

    /// Build a withdrawal targeting the owner's derived balance address.
    pub fn withdraw(owner: PublicKey) -> Self {
        let balance = derive_balance_address(&owner);
        Self::Withdraw { owner, balance }
    }

    /// Build a settlement whose balance addresses are derived from the
    /// participants.
    pub fn settle_match(
        match_id: impl Into<String>,
        participants: Vec<PublicKey>,
        winners: Vec<PublicKey>,
        entry_fee: u64,
        history_slot: u64,
    ) -> Self {
        let balances = participants.iter().map(derive_balance_address).collect();
        Self::SettleMatch {
            match_id: match_id.into(),
            participants,
            winners,
            entry_fee,
            balances,
            history_slot,
        }
    }

    /// Records declared by the instruction (the signer's nonce account excluded).
    pub fn access_set(&self) -> BTreeSet<Key> {
        match self {
            Self::Deposit { balance, .. } | Self::Withdraw { balance, .. } => {
                BTreeSet::from([Key::Balance(*balance)])
            }
            Self::SettleMatch {
                match_id,
                balances,
                history_slot,
                ..
            } => {
                let mut keys: BTreeSet<Key> = balances.iter().map(|b| Key::Balance(*b)).collect();
                keys.insert(Key::MatchHistory(*history_slot));
                keys.insert(Key::SettledMatch(match_id.clone()));
                keys
            }
        }
    }
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Deposit {
                owner,
                balance,
                amount,
            } => {
                0u8.write(writer);
                owner.write(writer);
                balance.write(writer);
                amount.write(writer);
            }
            Self::Withdraw { owner, balance } => {
                1u8.write(writer);
                owner.write(writer);
                balance.write(writer);
            }
            Self::SettleMatch {
                match_id,
                participants,
                winners,
                entry_fee,
                balances,
                history_slot,
            } => {
                2u8.write(writer);
                write_string(match_id, writer);
                participants.write(writer);
                winners.write(writer);
                entry_fee.write(writer);
                balances.write(writer);
                history_slot.write(writer);
            }
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            0 => Self::Deposit {
                owner: PublicKey::read(reader)?,
                balance: Address::read(reader)?,
                amount: u64::read(reader)?,
            },
            1 => Self::Withdraw {
                owner: PublicKey::read(reader)?,
                balance: Address::read(reader)?,
            },
            2 => Self::SettleMatch {
                match_id: read_string(reader, MAX_MATCH_ID_LENGTH)?,
                participants: Vec::<PublicKey>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
                winners: Vec::<PublicKey>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
                entry_fee: u64::read(reader)?,
                balances: Vec::<Address>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
                history_slot: u64::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Deposit { .. } => PublicKey::SIZE + Address::SIZE + u64::SIZE,
                Self::Withdraw { .. } => PublicKey::SIZE + Address::SIZE,
                Self::SettleMatch {
                    match_id,
                    participants,
                    winners,
                    entry_fee,
                    balances,
                    history_slot,
                } => {
                    string_encode_size(match_id)
                        + participants.encode_size()
                        + winners.encode_size()
                        + entry_fee.encode_size()
                        + balances.encode_size()
                        + history_slot.encode_size()
                }
            }
    }
}

/// Minimal account structure for transaction nonce tracking.
/// Used for replay protection across all transaction types.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Nonce account of a signer (tag 0)
    Account(PublicKey),
    /// Balance record at a derived address (tag 1)
    Balance(Address),
    /// Match history record at a caller-chosen slot (tag 2)
    MatchHistory(u64),
    /// Index of settled match ids (tag 3)
    SettledMatch(String),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Balance(address) => {
                1u8.write(writer);
                address.write(writer);
            }
            Self::MatchHistory(slot) => {
                2u8.write(writer);
                slot.write(writer);
            }
            Self::SettledMatch(match_id) => {
                3u8.write(writer);
                write_string(match_id, writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Balance(Address::read(reader)?),
            2 => Self::MatchHistory(u64::read(reader)?),
            3 => Self::SettledMatch(read_string(reader, MAX_MATCH_ID_LENGTH)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) => PublicKey::SIZE,
                Self::Balance(_) => Address::SIZE,
                Self::MatchHistory(_) => u64::SIZE,
                Self::SettledMatch(match_id) => string_encode_size(match_id),
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    /// Nonce account (tag 0)
    Account(Account),
    /// Balance record (tag 1)
    Balance(BalanceRecord),
    /// Settled match audit record (tag 2)
    MatchHistory(MatchHistoryRecord),
    /// History slot holding a settled match id (tag 3)
    SettledMatch(u64),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Balance(record) => {
                1u8.write(writer);
                record.write(writer);
            }
            Self::MatchHistory(record) => {
                2u8.write(writer);
                record.write(writer);
            }
            Self::SettledMatch(slot) => {
                3u8.write(writer);
                slot.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::Balance(BalanceRecord::read(reader)?),
            2 => Self::MatchHistory(MatchHistoryRecord::read(reader)?),
            3 => Self::SettledMatch(u64::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::Balance(record) => record.encode_size(),
                Self::MatchHistory(record) => record.encode_size(),
                Self::SettledMatch(slot) => slot.encode_size(),
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Deposited {
        owner: PublicKey,
        amount: u64,
        new_amount: u64,
    },
    Withdrawn {
        owner: PublicKey,
        amount: u64,
    },
    MatchSettled {
        match_id: String,
        authority: PublicKey,
        history_slot: u64,
        pool: u64,
        /// Amount credited to each winner, in the supplied winner order.
        payouts: Vec<(PublicKey, u64)>,
    },
    /// An instruction failed validation and left state untouched.
    Rejected {
        caller: PublicKey,
        error: LedgerError,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Deposited {
                owner,
                amount,
                new_amount,
            } => {
                0u8.write(writer);
                owner.write(writer);
                amount.write(writer);
                new_amount.write(writer);
            }
            Self::Withdrawn { owner, amount } => {
                1u8.write(writer);
                owner.write(writer);
                amount.write(writer);
            }
            Self::MatchSettled {
                match_id,
                authority,
                history_slot,
                pool,
                payouts,
            } => {
                2u8.write(writer);
                write_string(match_id, writer);
                authority.write(writer);
                history_slot.write(writer);
                pool.write(writer);
                payouts.write(writer);
            }
            Self::Rejected { caller, error } => {
                3u8.write(writer);
                caller.write(writer);
                error.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::Deposited {
                owner: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                new_amount: u64::read(reader)?,
            },
            1 => Self::Withdrawn {
                owner: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            },
            2 => Self::MatchSettled {
                match_id: read_string(reader, MAX_MATCH_ID_LENGTH)?,
                authority: PublicKey::read(reader)?,
                history_slot: u64::read(reader)?,
                pool: u64::read(reader)?,
                payouts: Vec::<(PublicKey, u64)>::read_range(reader, 0..=MAX_PARTICIPANTS)?,
            },
            3 => Self::Rejected {
                caller: PublicKey::read(reader)?,
                error: LedgerError::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Deposited {
                    owner,
                    amount,
                    new_amount,
                } => owner.encode_size() + amount.encode_size() + new_amount.encode_size(),
                Self::Withdrawn { owner, amount } => owner.encode_size() + amount.encode_size(),
                Self::MatchSettled {
                    match_id,
                    authority,
                    history_slot,
                    pool,
                    payouts,
                } => {
                    string_encode_size(match_id)
                        + authority.encode_size()
                        + history_slot.encode_size()
                        + pool.encode_size()
                        + payouts.encode_size()
                }
                Self::Rejected { caller, error } => caller.encode_size() + error.encode_size(),
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
        }
    }
}
