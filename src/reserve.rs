//! The shared reserve backing a sender's deposit shortfalls, with a fair
//! per-round split across recipients.
//!
//! The reserve exists so that one recipient cannot drain funds meant to
//! backstop many concurrent recipients of the same sender. Within a round,
//! each claimant is capped at `ceil(remaining / N)` where `N` is the number
//! of distinct recipients seen claiming so far that round. The split is
//! first-come: early claimants can draw more than late ones, but the sum of
//! grants in a round can never exceed the reserve.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::Address;
use crate::errors::Error;
use crate::Round;

/// One recipient's draw against a reserve within a specific round.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
struct ClaimRecord {
    round: Round,
    amount: u128,
}

/// Read-only projection of a reserve for one recipient.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReserveInfo {
    /// Reserve funds not yet claimed or withdrawn.
    pub funds_remaining: u128,
    /// How much this recipient has already drawn in the current round.
    pub claimed_in_current_round: u128,
}

/// One sender's reserve.
///
/// Claim bookkeeping is keyed by round number, so round rollover is
/// implicit: a record from a past round simply reads as zero. Stale entries
/// are overwritten the next time their recipient claims; nothing erases
/// them eagerly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reserve {
    /// Cumulative total ever contributed to this reserve.
    pub funds_added: u128,

    /// Funds not yet granted to recipients or withdrawn by the sender.
    pub remaining: u128,

    claims: BTreeMap<Address, ClaimRecord>,
}

impl Reserve {
    /// Add funds to the reserve.
    pub fn fund(&mut self, amount: u128) -> Result<(), Error> {
        self.funds_added = self
            .funds_added
            .checked_add(amount)
            .ok_or(Error::InvariantViolation("reserve balance overflow"))?;
        // `remaining` never exceeds `funds_added`, so this cannot overflow.
        self.remaining += amount;
        Ok(())
    }

    /// Drain the reserve for a sender withdrawal, returning the drained
    /// amount.
    pub fn drain(&mut self) -> u128 {
        std::mem::take(&mut self.remaining)
    }

    /// Grant `recipient` up to its fair share of the reserve for the
    /// current round, recording the draw and decrementing the remaining
    /// funds. Returns the granted amount, which may be zero.
    pub fn claim(
        &mut self,
        recipient: Address,
        requested: u128,
        current_round: Round,
    ) -> Result<u128, Error> {
        if requested == 0 {
            return Ok(0);
        }

        let mut claimants = self
            .claims
            .values()
            .filter(|claim| claim.round == current_round)
            .count() as u128;

        let already = match self.claims.get(&recipient) {
            Some(claim) if claim.round == current_round => claim.amount,
            // First claim by this recipient this round; it joins the count.
            _ => {
                claimants += 1;
                0
            }
        };

        let ceiling = self.remaining.div_ceil(claimants);
        let granted = requested.min(ceiling.saturating_sub(already));

        if granted > self.remaining {
            return Err(Error::InvariantViolation(
                "reserve grant exceeds remaining funds",
            ));
        }

        self.claims.insert(
            recipient,
            ClaimRecord {
                round: current_round,
                amount: already + granted,
            },
        );
        self.remaining -= granted;
        Ok(granted)
    }

    /// Read-only projection for observability.
    pub fn info(&self, recipient: &Address, current_round: Round) -> ReserveInfo {
        let claimed_in_current_round = match self.claims.get(recipient) {
            Some(claim) if claim.round == current_round => claim.amount,
            _ => 0,
        };
        ReserveInfo {
            funds_remaining: self.remaining,
            claimed_in_current_round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address([0xaa; 20]);
    const BOB: Address = Address([0xbb; 20]);
    const CAROL: Address = Address([0xcc; 20]);

    #[test]
    fn sole_claimant_can_draw_everything() {
        let mut reserve = Reserve::default();
        reserve.fund(2_000).unwrap();

        assert_eq!(reserve.claim(ALICE, 500, 1).unwrap(), 500);
        assert_eq!(reserve.remaining, 1_500);
        assert_eq!(reserve.info(&ALICE, 1).claimed_in_current_round, 500);
    }

    #[test]
    fn later_claimants_shrink_the_ceiling() {
        let mut reserve = Reserve::default();
        reserve.fund(900).unwrap();

        // Alice claims a modest amount first.
        assert_eq!(reserve.claim(ALICE, 100, 1).unwrap(), 100);

        // Bob is the second distinct claimant: ceiling is ceil(800 / 2).
        assert_eq!(reserve.claim(BOB, 10_000, 1).unwrap(), 400);

        // Carol is the third: ceiling is ceil(400 / 3).
        assert_eq!(reserve.claim(CAROL, 10_000, 1).unwrap(), 134);
    }

    #[test]
    fn repeat_claims_count_prior_draws() {
        let mut reserve = Reserve::default();
        reserve.fund(1_000).unwrap();

        assert_eq!(reserve.claim(ALICE, 300, 1).unwrap(), 300);
        assert_eq!(reserve.claim(BOB, 50, 1).unwrap(), 50);

        // Alice's ceiling this round is ceil(650 / 2) = 325, of which she
        // already drew 300.
        assert_eq!(reserve.claim(ALICE, 10_000, 1).unwrap(), 25);
    }

    #[test]
    fn round_rollover_is_implicit() {
        let mut reserve = Reserve::default();
        reserve.fund(1_000).unwrap();

        assert_eq!(reserve.claim(ALICE, 400, 1).unwrap(), 400);
        assert_eq!(reserve.info(&ALICE, 1).claimed_in_current_round, 400);

        // A new round forgets last round's draws without any reset call.
        assert_eq!(reserve.info(&ALICE, 2).claimed_in_current_round, 0);
        assert_eq!(reserve.claim(ALICE, 600, 2).unwrap(), 600);
        assert_eq!(reserve.remaining, 0);
    }

    #[test]
    fn grants_never_exceed_the_reserve() {
        let mut reserve = Reserve::default();
        reserve.fund(1_000).unwrap();

        let mut total = 0u128;
        for recipient in [ALICE, BOB, CAROL] {
            total += reserve.claim(recipient, u128::MAX, 3).unwrap();
        }
        assert!(total <= 1_000);
        assert_eq!(total + reserve.remaining, 1_000);
    }

    #[test]
    fn funding_overflow_is_fatal() {
        let mut reserve = Reserve::default();
        reserve.fund(u128::MAX).unwrap();
        assert_eq!(
            reserve.fund(1),
            Err(Error::InvariantViolation("reserve balance overflow"))
        );
        assert_eq!(reserve.remaining, u128::MAX);
    }

    #[test]
    fn exhausted_reserve_grants_zero() {
        let mut reserve = Reserve::default();
        reserve.fund(100).unwrap();
        assert_eq!(reserve.claim(ALICE, 1_000, 1).unwrap(), 100);
        assert_eq!(reserve.claim(BOB, 1_000, 1).unwrap(), 0);
    }
}
