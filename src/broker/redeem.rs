//! The winning-ticket redemption pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{recover_signer, sha256, Address, Signature};
use crate::errors::Error;
use crate::oracle::{Ledger, RoundOracle};
use crate::storage::BrokerStore;
use crate::ticket::{RecipientRand, Ticket, TicketHash};

use super::TicketBroker;

/// The record emitted for every successful redemption.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub sender: Address,
    pub recipient: Address,
    /// The ticket's face value; the amount actually paid may be lower if
    /// the sender's funds could not cover it.
    pub face_value: u128,
    /// Portion paid from the sender's deposit.
    pub from_deposit: u128,
    /// Portion granted from the sender's shared reserve.
    pub from_reserve: u128,
    pub ticket_hash: TicketHash,
}

impl RedemptionReceipt {
    /// The amount transferred to the recipient.
    pub fn total(&self) -> u128 {
        self.from_deposit + self.from_reserve
    }
}

/// Outcome of the transactional phase of a redemption. The zero-balance
/// case commits (the used-ticket mark must survive) but pays nothing.
enum Settlement {
    Paid(RedemptionReceipt),
    ZeroBalance,
}

impl<S: BrokerStore, L: Ledger, O: RoundOracle> TicketBroker<S, L, O> {
    /// Redeem a winning ticket, paying its face value to the recipient
    /// from the sender's deposit first and the shared reserve second.
    ///
    /// The checks run in protocol order: structural validation, signer
    /// authentication, the probabilistic win rule, the double-spend guard,
    /// then settlement. Everything up to and including the win check leaves
    /// no trace on failure. Once the ticket is marked used it stays used,
    /// even if the sender turns out to have no funds at all.
    pub fn redeem_winning_ticket(
        &self,
        ticket: &Ticket,
        signature: &Signature,
        recipient_rand: RecipientRand,
    ) -> Result<RedemptionReceipt, Error> {
        // The single oracle read for this operation; every check below uses
        // the same view of the current round.
        let now = self.oracle().current_round();

        if ticket.recipient.is_null() {
            return Err(Error::NullRecipient);
        }
        if ticket.sender.is_null() {
            return Err(Error::NullSender);
        }
        if ticket.is_expired(now) {
            return Err(Error::TicketExpired);
        }
        if sha256(&recipient_rand) != ticket.recipient_rand_hash {
            return Err(Error::RecipientRandMismatch);
        }

        let digest = ticket.digest();
        let signer = recover_signer(&digest.0, signature)?;

        let settlement = self.store().update(ticket.sender, |state| {
            if signer != ticket.sender && !state.signers.is_approved(&signer, now) {
                return Err(Error::InvalidSignature);
            }

            if !ticket.is_winner(&digest, &recipient_rand) {
                return Err(Error::TicketDidNotWin);
            }

            if state.used_tickets.contains(&digest) {
                return Err(Error::TicketAlreadyUsed);
            }
            Arc::make_mut(&mut state.used_tickets).insert(digest);

            // From here on the transaction must commit: the ticket's
            // one-time semantics apply regardless of payout size.
            if state.has_zero_balance() {
                return Ok(Settlement::ZeroBalance);
            }

            let from_deposit = ticket.face_value.min(state.account.deposit);
            let shortfall = ticket.face_value - from_deposit;
            let from_reserve = state.reserve.claim(ticket.recipient, shortfall, now)?;
            state.account.deposit -= from_deposit;

            Ok(Settlement::Paid(RedemptionReceipt {
                sender: ticket.sender,
                recipient: ticket.recipient,
                face_value: ticket.face_value,
                from_deposit,
                from_reserve,
                ticket_hash: digest,
            }))
        })?;

        let receipt = match settlement {
            Settlement::Paid(receipt) => receipt,
            Settlement::ZeroBalance => return Err(Error::ZeroBalance),
        };

        if receipt.total() > 0 {
            self.ledger().transfer(receipt.recipient, receipt.total())?;
        }

        tracing::info!(
            sender = %receipt.sender,
            recipient = %receipt.recipient,
            face_value = receipt.face_value,
            from_deposit = receipt.from_deposit,
            from_reserve = receipt.from_reserve,
            ticket_hash = %receipt.ticket_hash,
            "redeemed winning ticket",
        );
        Ok(receipt)
    }
}
