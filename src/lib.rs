//! # probtix
//!
//! Probabilistic off-chain micropayment settlement.
//!
//! A payer (the **sender**) pre-funds a deposit and a shared reserve, then
//! issues signed [`Ticket`]s off-ledger to payees (**recipients**). Each
//! ticket is a chance of winning a fixed payout: most tickets lose and are
//! simply discarded, so the expected settlement cost amortizes to a small
//! fraction of the value transferred. A recipient who holds a winner
//! submits it to the [`TicketBroker`], which authenticates the signature,
//! re-evaluates the win rule against the revealed `recipient_rand` secret,
//! blocks double spends, and pays out from the sender's deposit first and
//! the reserve second.
//!
//! The engine is deliberately collaborator-agnostic: protocol time comes
//! from a [`RoundOracle`], outbound payments go through a [`Ledger`], and
//! state lives behind a [`BrokerStore`]. In-memory implementations of all
//! three ship with the crate.

mod account;
mod broker;
mod consts;
mod crypto;
mod errors;
mod oracle;
mod registry;
mod reserve;
mod serialization;
mod storage;
mod ticket;

pub use account::{SenderAccount, UnlockState};
pub use broker::{BrokerConfig, RedemptionReceipt, SenderInfo, TicketBroker};
pub use consts::{ADDRESS_SIZE, DIGEST_SIZE, RAND_SIZE, SIGNATURE_SIZE};
pub use crypto::{recover_signer, sha256, sign_digest, Address, Signature};
pub use errors::{Error, ErrorKind};
pub use oracle::{Ledger, ManualRoundOracle, MemoryLedger, RoundOracle};
pub use registry::{SignerRegistry, SignerStatus};
pub use reserve::{Reserve, ReserveInfo};
pub use storage::{BrokerStore, MemoryStore, SenderState};
pub use ticket::{
    random_recipient_rand, recipient_rand_from_hex, RecipientRand, Ticket, TicketHash, WinProb,
};

/// Protocol time, as reported by the [`RoundOracle`].
pub type Round = u64;

// Re-exported so downstream users can name key types without pinning
// their own copy of the dependency.
pub use secp256k1;
