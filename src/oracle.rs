//! Interfaces to the engine's external collaborators: the round oracle
//! supplying protocol time, and the ledger executing outbound transfers.
//!
//! In-memory implementations ship alongside the traits; they back the test
//! suite and serve as references for embedders wiring in a real clock and
//! settlement rail.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::crypto::Address;
use crate::errors::Error;
use crate::Round;

/// The source of protocol time.
///
/// Rounds must be monotonically non-decreasing and globally consistent:
/// no operation may observe the round going backward. The engine reads the
/// round exactly once per operation, at entry.
pub trait RoundOracle {
    fn current_round(&self) -> Round;
}

/// The external settlement rail.
///
/// `transfer` moves `amount` out of the engine's pooled funds to `to`,
/// atomically. It is called only after the engine has committed the
/// matching balance decrement, so a failure here indicates a broken ledger
/// and is surfaced as [`Error::InvariantViolation`] by the engine.
pub trait Ledger {
    fn transfer(&self, to: Address, amount: u128) -> Result<(), Error>;
}

/// A [`RoundOracle`] driven by explicit advancement.
///
/// `advance_to` uses a max-update, so the round can never be observed
/// moving backward even under racing writers.
#[derive(Debug, Default)]
pub struct ManualRoundOracle {
    round: AtomicU64,
}

impl ManualRoundOracle {
    pub fn new(round: Round) -> Self {
        ManualRoundOracle {
            round: AtomicU64::new(round),
        }
    }

    /// Move the clock forward to `round`; earlier values are ignored.
    pub fn advance_to(&self, round: Round) {
        self.round.fetch_max(round, Ordering::SeqCst);
    }

    /// Move the clock forward by `rounds`.
    pub fn advance(&self, rounds: Round) {
        self.round.fetch_add(rounds, Ordering::SeqCst);
    }
}

impl RoundOracle for ManualRoundOracle {
    fn current_round(&self) -> Round {
        self.round.load(Ordering::SeqCst)
    }
}

impl<T: RoundOracle + ?Sized> RoundOracle for &T {
    fn current_round(&self) -> Round {
        (**self).current_round()
    }
}

impl<T: RoundOracle + ?Sized> RoundOracle for std::sync::Arc<T> {
    fn current_round(&self) -> Round {
        (**self).current_round()
    }
}

/// An in-memory [`Ledger`] crediting transfers to a balance map.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: Mutex<BTreeMap<Address, u128>>,
}

impl MemoryLedger {
    /// Total ever transferred to `address`.
    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances
            .lock()
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Total ever transferred to anyone.
    pub fn total_out(&self) -> u128 {
        self.balances.lock().values().sum()
    }
}

impl Ledger for MemoryLedger {
    fn transfer(&self, to: Address, amount: u128) -> Result<(), Error> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(to).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(Error::InvariantViolation("ledger balance overflow"))?;
        Ok(())
    }
}

impl<T: Ledger + ?Sized> Ledger for &T {
    fn transfer(&self, to: Address, amount: u128) -> Result<(), Error> {
        (**self).transfer(to, amount)
    }
}

impl<T: Ledger + ?Sized> Ledger for std::sync::Arc<T> {
    fn transfer(&self, to: Address, amount: u128) -> Result<(), Error> {
        (**self).transfer(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_oracle_is_monotonic() {
        let oracle = ManualRoundOracle::new(10);
        oracle.advance_to(5); // ignored
        assert_eq!(oracle.current_round(), 10);
        oracle.advance_to(12);
        assert_eq!(oracle.current_round(), 12);
        oracle.advance(3);
        assert_eq!(oracle.current_round(), 15);
    }

    #[test]
    fn ledger_accumulates_transfers() {
        let ledger = MemoryLedger::default();
        let alice = Address([0xaa; 20]);
        ledger.transfer(alice, 100).unwrap();
        ledger.transfer(alice, 50).unwrap();
        assert_eq!(ledger.balance_of(&alice), 150);
        assert_eq!(ledger.total_out(), 150);
    }
}
