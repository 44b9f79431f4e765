//! Per-sender registry of addresses approved to sign tickets.
//!
//! Revocation is delayed rather than immediate so that tickets already
//! issued by a signer stay redeemable for a grace window after the sender
//! decides to rotate it out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::Address;
use crate::Round;

/// The authority state of one (sender, signer) pair.
///
/// Authority is always evaluated as a pure function of this tag and the
/// current round; there is no live lookup anywhere else.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SignerStatus {
    /// Never approved, or fully revoked. Never authoritative.
    Unapproved,
    /// Approved with no revocation pending.
    Approved,
    /// Approved, but scheduled to lose authority at `at_round`.
    PendingRevocation { at_round: Round },
}

impl SignerStatus {
    /// Whether a signer with this status is authoritative at `current_round`.
    pub fn is_authoritative(&self, current_round: Round) -> bool {
        match *self {
            SignerStatus::Unapproved => false,
            SignerStatus::Approved => true,
            SignerStatus::PendingRevocation { at_round } => current_round < at_round,
        }
    }
}

/// One sender's approved-signer set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerRegistry {
    signers: BTreeMap<Address, SignerStatus>,
}

impl SignerRegistry {
    /// Look up the status of a signer. Unknown addresses are
    /// [`SignerStatus::Unapproved`].
    pub fn status(&self, signer: &Address) -> SignerStatus {
        self.signers
            .get(signer)
            .copied()
            .unwrap_or(SignerStatus::Unapproved)
    }

    /// Idempotently approve each signer, clearing any pending revocation.
    pub fn approve(&mut self, signers: &[Address]) {
        for &signer in signers {
            self.signers.insert(signer, SignerStatus::Approved);
        }
    }

    /// Schedule each currently-approved signer to lose authority at
    /// `at_round`. Requesting revocation of an unapproved signer is a
    /// no-op; re-requesting while one is already pending reschedules it.
    pub fn request_revocations(&mut self, signers: &[Address], at_round: Round) {
        for signer in signers {
            if let Some(status) = self.signers.get_mut(signer) {
                if *status != SignerStatus::Unapproved {
                    *status = SignerStatus::PendingRevocation { at_round };
                }
            }
        }
    }

    /// Whether `signer` may currently sign tickets for this sender.
    pub fn is_approved(&self, signer: &Address, current_round: Round) -> bool {
        self.status(signer).is_authoritative(current_round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER: Address = Address([0x55; 20]);

    #[test]
    fn unknown_signers_are_unapproved() {
        let registry = SignerRegistry::default();
        assert_eq!(registry.status(&SIGNER), SignerStatus::Unapproved);
        assert!(!registry.is_approved(&SIGNER, 0));
    }

    #[test]
    fn approval_and_delayed_revocation() {
        let mut registry = SignerRegistry::default();
        registry.approve(&[SIGNER]);
        assert!(registry.is_approved(&SIGNER, 100));

        registry.request_revocations(&[SIGNER], 105);
        // Still authoritative until the revocation round arrives.
        assert!(registry.is_approved(&SIGNER, 104));
        assert!(!registry.is_approved(&SIGNER, 105));
        assert!(!registry.is_approved(&SIGNER, 200));
    }

    #[test]
    fn reapproval_clears_pending_revocation() {
        let mut registry = SignerRegistry::default();
        registry.approve(&[SIGNER]);
        registry.request_revocations(&[SIGNER], 105);
        registry.approve(&[SIGNER]);
        assert!(registry.is_approved(&SIGNER, 500));
    }

    #[test]
    fn revoking_an_unapproved_signer_is_a_noop() {
        let mut registry = SignerRegistry::default();
        registry.request_revocations(&[SIGNER], 105);
        assert_eq!(registry.status(&SIGNER), SignerStatus::Unapproved);

        // Approving afterward re-enables it outright.
        registry.approve(&[SIGNER]);
        assert!(registry.is_approved(&SIGNER, 500));
    }
}
