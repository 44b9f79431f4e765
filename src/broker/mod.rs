//! The settlement engine itself: payer-side account management plus the
//! payee-side redemption pipeline.

pub(crate) mod redeem;

pub use redeem::RedemptionReceipt;

use serde::{Deserialize, Serialize};

use crate::account::UnlockState;
use crate::crypto::Address;
use crate::errors::Error;
use crate::oracle::{Ledger, RoundOracle};
use crate::reserve::ReserveInfo;
use crate::storage::BrokerStore;
use crate::ticket::Ticket;
use crate::Round;

/// Deployment-time parameters. Fixed once the broker is constructed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Rounds between an `unlock` request and the withdrawal becoming
    /// executable. This is the recipients' window to redeem outstanding
    /// winning tickets before the funds leave.
    pub unlock_period: Round,

    /// Rounds between a revocation request and the signer losing
    /// authority. Tickets already issued by the signer stay redeemable
    /// until then.
    pub signer_revocation_delay: Round,
}

/// Snapshot of a sender's account for observability.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub deposit: u128,
    pub reserve_remaining: u128,
    /// Zero when no withdrawal is pending.
    pub withdraw_round: Round,
    pub unlock_state: UnlockState,
}

/// The probabilistic micropayment settlement engine.
///
/// All state is reached through the injected [`BrokerStore`]; protocol time
/// comes from the injected [`RoundOracle`]; outbound payments go through
/// the injected [`Ledger`]. Operations against the same sender are
/// serialized by the store, so every method takes `&self` and the broker
/// can be shared freely across threads.
#[derive(Debug)]
pub struct TicketBroker<S, L, O> {
    config: BrokerConfig,
    store: S,
    ledger: L,
    oracle: O,
}

impl<S: BrokerStore, L: Ledger, O: RoundOracle> TicketBroker<S, L, O> {
    pub fn new(config: BrokerConfig, store: S, ledger: L, oracle: O) -> Self {
        TicketBroker {
            config,
            store,
            ledger,
            oracle,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Add to the sender's deposit, the funds paid out first on
    /// redemption. Cancels any pending unlock.
    pub fn fund_deposit(&self, sender: Address, amount: u128) -> Result<(), Error> {
        self.check_funding(sender, amount)?;
        self.store
            .update(sender, |state| state.account.credit_deposit(amount))?;
        tracing::debug!(sender = %sender, amount, "funded deposit");
        Ok(())
    }

    /// Add to the sender's reserve, the shared backstop drawn on when the
    /// deposit cannot cover a winning ticket. Cancels any pending unlock.
    pub fn fund_reserve(&self, sender: Address, amount: u128) -> Result<(), Error> {
        self.check_funding(sender, amount)?;
        self.store.update(sender, |state| {
            state.reserve.fund(amount)?;
            state.account.reset_unlock();
            Ok(())
        })?;
        tracing::debug!(sender = %sender, amount, "funded reserve");
        Ok(())
    }

    fn check_funding(&self, sender: Address, amount: u128) -> Result<(), Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        Ok(())
    }

    /// Approve each address to sign tickets on the sender's behalf,
    /// clearing any pending revocations. Approval signals the sender
    /// intends to keep using the account, so it also cancels any pending
    /// unlock.
    pub fn approve_signers(&self, sender: Address, signers: &[Address]) -> Result<(), Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        self.store.update(sender, |state| {
            state.signers.approve(signers);
            state.account.reset_unlock();
            Ok(())
        })?;
        tracing::debug!(sender = %sender, count = signers.len(), "approved signers");
        Ok(())
    }

    /// Schedule each signer's authority to end after the configured
    /// revocation delay.
    pub fn request_signer_revocations(
        &self,
        sender: Address,
        signers: &[Address],
    ) -> Result<(), Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        let at_round = self
            .oracle
            .current_round()
            .checked_add(self.config.signer_revocation_delay)
            .ok_or(Error::InvariantViolation("revocation round overflow"))?;
        self.store.update(sender, |state| {
            state.signers.request_revocations(signers, at_round);
            Ok(())
        })?;
        tracing::debug!(sender = %sender, at_round, "requested signer revocations");
        Ok(())
    }

    /// Whether `signer` may currently sign tickets for `sender`. The sender
    /// address itself is always authoritative and is not consulted here.
    pub fn is_approved_signer(&self, sender: Address, signer: Address) -> bool {
        let now = self.oracle.current_round();
        self.store
            .read(sender, |state| state.signers.is_approved(&signer, now))
    }

    /// Request withdrawal of all funds once the unlock period elapses.
    /// Returns the round at which `withdraw` becomes executable.
    pub fn unlock(&self, sender: Address) -> Result<Round, Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        let now = self.oracle.current_round();
        let withdraw_round = self.store.update(sender, |state| {
            let reserve_remaining = state.reserve.remaining;
            state
                .account
                .unlock(reserve_remaining, now, self.config.unlock_period)
        })?;
        tracing::debug!(sender = %sender, withdraw_round, "unlock requested");
        Ok(withdraw_round)
    }

    /// Abort a pending unlock.
    pub fn cancel_unlock(&self, sender: Address) -> Result<(), Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        self.store
            .update(sender, |state| state.account.cancel_unlock())?;
        tracing::debug!(sender = %sender, "unlock cancelled");
        Ok(())
    }

    /// Execute a matured withdrawal: drain the deposit and reserve and
    /// transfer their sum back to the sender. Returns the amount withdrawn.
    pub fn withdraw(&self, sender: Address) -> Result<u128, Error> {
        if sender.is_null() {
            return Err(Error::NullSender);
        }
        let now = self.oracle.current_round();
        let total = self.store.update(sender, |state| {
            let reserve_remaining = state.reserve.remaining;
            let from_deposit = state.account.take_withdrawal(reserve_remaining, now)?;
            let from_reserve = state.reserve.drain();
            Ok(from_deposit + from_reserve)
        })?;

        self.ledger.transfer(sender, total)?;
        tracing::debug!(sender = %sender, amount = total, "withdrawal executed");
        Ok(total)
    }

    /// Snapshot of the sender's balances and withdrawal state.
    pub fn sender_info(&self, sender: Address) -> SenderInfo {
        let now = self.oracle.current_round();
        self.store.read(sender, |state| SenderInfo {
            deposit: state.account.deposit,
            reserve_remaining: state.reserve.remaining,
            withdraw_round: state.account.withdraw_round,
            unlock_state: state.account.unlock_state(now),
        })
    }

    /// Read-only projection of the sender's reserve as seen by `recipient`.
    pub fn reserve_info(&self, sender: Address, recipient: Address) -> ReserveInfo {
        let now = self.oracle.current_round();
        self.store
            .read(sender, |state| state.reserve.info(&recipient, now))
    }

    /// Whether a ticket with this exact content was already redeemed.
    pub fn is_ticket_used(&self, ticket: &Ticket) -> bool {
        let digest = ticket.digest();
        self.store
            .read(ticket.sender, |state| state.used_tickets.contains(&digest))
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn ledger(&self) -> &L {
        &self.ledger
    }

    pub(crate) fn oracle(&self) -> &O {
        &self.oracle
    }
}
