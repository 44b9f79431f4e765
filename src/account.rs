//! The per-sender deposit balance and its unlock/withdraw state machine.
//!
//! The machine gives a sender an unconditional exit even if recipients stop
//! redeeming tickets, while the unlock period gives recipients a window to
//! redeem outstanding winners before the funds leave:
//!
//! ```not_rust
//! Idle --unlock--> UnlockPending --time--> Withdrawable --withdraw--> Idle
//!       (fund_deposit / fund_reserve / cancel_unlock rewind to Idle)
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::Round;

/// Where a sender account currently sits in the withdrawal state machine.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum UnlockState {
    /// No withdrawal pending.
    Idle,
    /// A withdrawal was requested and the unlock period is still running.
    UnlockPending,
    /// The unlock period has elapsed; `withdraw` will succeed.
    Withdrawable,
}

/// A sender's deposit balance and pending-withdrawal bookkeeping.
///
/// The reserve balance lives separately in [`Reserve`][crate::Reserve];
/// operations which depend on both (unlock, withdraw) take the remaining
/// reserve as an argument.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SenderAccount {
    /// Funds earmarked for direct payout on ticket redemption.
    pub deposit: u128,

    /// The round at which a pending withdrawal becomes executable.
    /// Zero means no withdrawal is pending.
    pub withdraw_round: Round,
}

impl SenderAccount {
    pub fn unlock_state(&self, current_round: Round) -> UnlockState {
        if self.withdraw_round == 0 {
            UnlockState::Idle
        } else if current_round < self.withdraw_round {
            UnlockState::UnlockPending
        } else {
            UnlockState::Withdrawable
        }
    }

    pub fn is_unlock_in_progress(&self) -> bool {
        self.withdraw_round != 0
    }

    /// Add to the deposit. Funding signals the sender intends to keep using
    /// the account, so any pending unlock is cancelled.
    pub fn credit_deposit(&mut self, amount: u128) -> Result<(), Error> {
        self.deposit = self
            .deposit
            .checked_add(amount)
            .ok_or(Error::InvariantViolation("deposit balance overflow"))?;
        self.withdraw_round = 0;
        Ok(())
    }

    /// Cancel a pending unlock without touching balances. Used by funding
    /// and signer-approval activity; unconditional.
    pub fn reset_unlock(&mut self) {
        self.withdraw_round = 0;
    }

    /// Request a withdrawal of all funds after the unlock period.
    /// Returns the round at which the withdrawal becomes executable.
    pub fn unlock(
        &mut self,
        reserve_remaining: u128,
        current_round: Round,
        unlock_period: Round,
    ) -> Result<Round, Error> {
        if self.deposit == 0 && reserve_remaining == 0 {
            return Err(Error::NothingToUnlock);
        }
        if self.is_unlock_in_progress() {
            return Err(Error::AlreadyUnlocking);
        }
        // Round zero is reserved to mean "no pending withdrawal".
        self.withdraw_round = current_round
            .checked_add(unlock_period)
            .ok_or(Error::InvariantViolation("withdraw round overflow"))?
            .max(1);
        Ok(self.withdraw_round)
    }

    /// Abort a pending unlock, whether or not the period has elapsed.
    pub fn cancel_unlock(&mut self) -> Result<(), Error> {
        if !self.is_unlock_in_progress() {
            return Err(Error::NotUnlocking);
        }
        self.withdraw_round = 0;
        Ok(())
    }

    /// Execute a matured withdrawal, draining the deposit and returning the
    /// drained amount. The caller drains the reserve in the same
    /// transaction and transfers the sum out.
    pub fn take_withdrawal(
        &mut self,
        reserve_remaining: u128,
        current_round: Round,
    ) -> Result<u128, Error> {
        if self.deposit == 0 && reserve_remaining == 0 {
            return Err(Error::NothingToUnlock);
        }
        match self.unlock_state(current_round) {
            UnlockState::Idle => Err(Error::NotUnlocking),
            UnlockState::UnlockPending => Err(Error::StillLocked),
            UnlockState::Withdrawable => {
                let drained = self.deposit;
                self.deposit = 0;
                self.withdraw_round = 0;
                Ok(drained)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_requires_funds() {
        let mut account = SenderAccount::default();
        assert_eq!(account.unlock(0, 5, 10), Err(Error::NothingToUnlock));

        // A reserve-only account can still unlock.
        assert_eq!(account.unlock(100, 5, 10), Ok(15));
    }

    #[test]
    fn double_unlock_rejected() {
        let mut account = SenderAccount::default();
        account.credit_deposit(500).unwrap();
        account.unlock(0, 5, 10).unwrap();
        assert_eq!(account.unlock(0, 6, 10), Err(Error::AlreadyUnlocking));
        // Even once withdrawable, a second unlock is still an error.
        assert_eq!(account.unlock(0, 50, 10), Err(Error::AlreadyUnlocking));
    }

    #[test]
    fn state_machine_walk() {
        let mut account = SenderAccount::default();
        account.credit_deposit(500).unwrap();
        assert_eq!(account.unlock_state(5), UnlockState::Idle);

        account.unlock(0, 5, 10).unwrap();
        assert_eq!(account.unlock_state(5), UnlockState::UnlockPending);
        assert_eq!(account.unlock_state(14), UnlockState::UnlockPending);
        assert_eq!(account.unlock_state(15), UnlockState::Withdrawable);
    }

    #[test]
    fn funding_rewinds_to_idle() {
        let mut account = SenderAccount::default();
        account.credit_deposit(500).unwrap();
        account.unlock(0, 5, 10).unwrap();

        account.credit_deposit(1).unwrap();
        assert_eq!(account.unlock_state(50), UnlockState::Idle);
        assert_eq!(account.take_withdrawal(0, 50), Err(Error::NotUnlocking));
    }

    #[test]
    fn withdrawal_gates() {
        let mut account = SenderAccount::default();
        assert_eq!(account.take_withdrawal(0, 5), Err(Error::NothingToUnlock));

        account.credit_deposit(500).unwrap();
        assert_eq!(account.take_withdrawal(0, 5), Err(Error::NotUnlocking));

        account.unlock(0, 5, 10).unwrap();
        assert_eq!(account.take_withdrawal(0, 14), Err(Error::StillLocked));

        assert_eq!(account.take_withdrawal(0, 15), Ok(500));
        assert_eq!(account.deposit, 0);
        assert_eq!(account.unlock_state(15), UnlockState::Idle);
    }

    #[test]
    fn deposit_overflow_is_fatal() {
        let mut account = SenderAccount::default();
        account.credit_deposit(u128::MAX).unwrap();
        assert_eq!(
            account.credit_deposit(1),
            Err(Error::InvariantViolation("deposit balance overflow"))
        );
        // The failed top-up left the balance intact.
        assert_eq!(account.deposit, u128::MAX);
    }

    #[test]
    fn unlock_round_overflow_is_fatal() {
        let mut account = SenderAccount::default();
        account.credit_deposit(500).unwrap();
        assert_eq!(
            account.unlock(0, u64::MAX, 1),
            Err(Error::InvariantViolation("withdraw round overflow"))
        );
        assert_eq!(account.unlock_state(u64::MAX), UnlockState::Idle);
    }

    #[test]
    fn cancel_unlock_any_time() {
        let mut account = SenderAccount::default();
        assert_eq!(account.cancel_unlock(), Err(Error::NotUnlocking));

        account.credit_deposit(500).unwrap();
        account.unlock(0, 5, 10).unwrap();
        account.cancel_unlock().unwrap();
        assert_eq!(account.unlock_state(100), UnlockState::Idle);
    }
}
