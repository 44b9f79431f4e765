//! Per-sender state records and the transactional store they live in.
//!
//! All mutable engine state is reached through an injected [`BrokerStore`]
//! handle. An update runs as an all-or-nothing transaction against one
//! sender's record: commit on `Ok`, rollback on `Err`. The store also
//! provides the serializability the protocol requires: operations against
//! the same sender are mutually exclusive, while different senders proceed
//! fully in parallel.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::account::SenderAccount;
use crate::crypto::Address;
use crate::errors::Error;
use crate::registry::SignerRegistry;
use crate::reserve::Reserve;
use crate::ticket::TicketHash;

/// Everything the engine tracks for one sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderState {
    /// Deposit balance and withdrawal state machine.
    pub account: SenderAccount,

    /// Shared reserve and per-round claim bookkeeping.
    pub reserve: Reserve,

    /// Addresses approved to sign tickets on this sender's behalf.
    pub signers: SignerRegistry,

    /// Digests of every ticket ever redeemed against this sender.
    /// Append-only; entries are never removed. Ticket digests commit to
    /// their sender, so partitioning the set by sender loses nothing.
    /// Held behind an `Arc` so a copy-on-write commit shares the history
    /// and only a redemption that extends it pays for a copy.
    pub used_tickets: Arc<BTreeSet<TicketHash>>,
}

impl SenderState {
    /// True when both the deposit and the reserve are empty.
    pub fn has_zero_balance(&self) -> bool {
        self.account.deposit == 0 && self.reserve.remaining == 0
    }
}

/// The injected storage handle every engine operation runs through.
pub trait BrokerStore {
    /// Run `f` against the sender's record as a transaction: the mutation
    /// commits only if `f` returns `Ok`. `f` runs under the sender's
    /// exclusive lock.
    fn update<R>(
        &self,
        sender: Address,
        f: impl FnOnce(&mut SenderState) -> Result<R, Error>,
    ) -> Result<R, Error>;

    /// Run `f` against a read-only view of the sender's record. Unknown
    /// senders read as an empty record.
    fn read<R>(&self, sender: Address, f: impl FnOnce(&SenderState) -> R) -> R;
}

/// An in-memory [`BrokerStore`] backed by a lock table: one mutex per
/// sender, created on first touch, plus an outer map lock held only long
/// enough to find the entry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    senders: RwLock<HashMap<Address, Arc<Mutex<SenderState>>>>,
}

impl MemoryStore {
    fn entry(&self, sender: Address) -> Arc<Mutex<SenderState>> {
        if let Some(cell) = self.senders.read().get(&sender) {
            return Arc::clone(cell);
        }
        let mut senders = self.senders.write();
        Arc::clone(senders.entry(sender).or_default())
    }
}

impl BrokerStore for MemoryStore {
    fn update<R>(
        &self,
        sender: Address,
        f: impl FnOnce(&mut SenderState) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let cell = self.entry(sender);
        let mut committed = cell.lock();

        // Copy-on-write commit: mutate a scratch copy, swap it in only on
        // success, so a failed operation leaves no partial mutations.
        let mut scratch = committed.clone();
        let result = f(&mut scratch)?;
        *committed = scratch;
        Ok(result)
    }

    fn read<R>(&self, sender: Address, f: impl FnOnce(&SenderState) -> R) -> R {
        match self.senders.read().get(&sender) {
            Some(cell) => f(&cell.lock()),
            None => f(&SenderState::default()),
        }
    }
}

impl<T: BrokerStore + ?Sized> BrokerStore for Arc<T> {
    fn update<R>(
        &self,
        sender: Address,
        f: impl FnOnce(&mut SenderState) -> Result<R, Error>,
    ) -> Result<R, Error> {
        (**self).update(sender, f)
    }

    fn read<R>(&self, sender: Address, f: impl FnOnce(&SenderState) -> R) -> R {
        (**self).read(sender, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: Address = Address([0x11; 20]);

    #[test]
    fn failed_updates_roll_back() {
        let store = MemoryStore::default();

        store
            .update(SENDER, |state| state.account.credit_deposit(1_000))
            .unwrap();

        let result: Result<(), Error> = store.update(SENDER, |state| {
            state.account.deposit = 0;
            Arc::make_mut(&mut state.used_tickets).insert(TicketHash([1; 32]));
            Err(Error::TicketDidNotWin)
        });
        assert_eq!(result, Err(Error::TicketDidNotWin));

        store.read(SENDER, |state| {
            assert_eq!(state.account.deposit, 1_000);
            assert!(state.used_tickets.is_empty());
        });
    }

    #[test]
    fn commits_share_the_used_ticket_history() {
        let store = MemoryStore::default();
        store
            .update(SENDER, |state| {
                Arc::make_mut(&mut state.used_tickets).insert(TicketHash([1; 32]));
                Ok(())
            })
            .unwrap();
        let before = store.read(SENDER, |state| Arc::clone(&state.used_tickets));

        // An update that leaves the set alone must not copy it.
        store
            .update(SENDER, |state| state.account.credit_deposit(5))
            .unwrap();
        let after = store.read(SENDER, |state| Arc::clone(&state.used_tickets));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn unknown_senders_read_empty() {
        let store = MemoryStore::default();
        store.read(SENDER, |state| {
            assert!(state.has_zero_balance());
            assert!(!state.account.is_unlock_in_progress());
        });
        // Reading must not allocate an entry.
        assert!(store.senders.read().is_empty());
    }
}
