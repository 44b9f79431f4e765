use thiserror::Error;

/// Every failure the engine can surface to a caller.
///
/// Errors are returned synchronously and never retried internally: tickets
/// are cheap to discard, so callers are expected to re-issue or move on.
/// No error leaves partial balance mutations behind, with one deliberate
/// exception: the used-ticket mark made during redemption survives a
/// [`ZeroBalance`][Error::ZeroBalance] failure, because a ticket's one-time
/// semantics apply regardless of payout size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The ticket names a null recipient address.
    #[error("ticket recipient is the null address")]
    NullRecipient,

    /// The ticket names a null sender address.
    #[error("ticket sender is the null address")]
    NullSender,

    /// Funding amounts must be strictly positive.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The signature is not a 65-byte compact recoverable ECDSA signature,
    /// or carries an out-of-range recovery id.
    #[error("malformed recoverable signature encoding")]
    InvalidSignatureFormat,

    /// The signature does not recover to the ticket sender or to any
    /// currently approved signer.
    #[error("signature does not recover to an authorized signer")]
    InvalidSignature,

    /// The current round is at or past the ticket's expiration round.
    #[error("ticket is expired")]
    TicketExpired,

    /// The revealed `recipient_rand` does not hash to the commitment
    /// embedded in the ticket.
    #[error("recipient_rand does not match the ticket commitment")]
    RecipientRandMismatch,

    /// The win digest fell at or above the ticket's winning probability.
    #[error("ticket did not win")]
    TicketDidNotWin,

    /// A ticket with this exact content was already redeemed.
    #[error("ticket has already been redeemed")]
    TicketAlreadyUsed,

    /// The sender's deposit and reserve are both empty.
    #[error("sender has no deposit or reserve")]
    ZeroBalance,

    /// `unlock` or `withdraw` was called on an account with no funds.
    #[error("sender has no funds to unlock")]
    NothingToUnlock,

    /// `unlock` was called while an unlock is already pending.
    #[error("an unlock is already in progress")]
    AlreadyUnlocking,

    /// `cancel_unlock` or `withdraw` was called with no unlock pending.
    #[error("no unlock is in progress")]
    NotUnlocking,

    /// `withdraw` was called before the unlock period elapsed.
    #[error("unlock period has not yet elapsed")]
    StillLocked,

    /// A state transition that should be impossible if callers and the
    /// ledger behave correctly. Not recoverable; treat as a bug.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

/// Coarse classification of [`Error`] values, mirroring the protocol's
/// error taxonomy. Useful for callers deciding whether an error is their
/// own mistake, a stale ticket, or a bug worth paging over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller mistake: malformed input that no retry will fix.
    InvalidInput,
    /// The signature did not authenticate.
    Authentication,
    /// The operation was valid but the protocol state forbids it.
    ProtocolState,
    /// An internal invariant failed; fatal.
    Fatal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NullRecipient
            | Error::NullSender
            | Error::ZeroAmount
            | Error::InvalidSignatureFormat => ErrorKind::InvalidInput,

            Error::InvalidSignature => ErrorKind::Authentication,

            Error::TicketExpired
            | Error::RecipientRandMismatch
            | Error::TicketDidNotWin
            | Error::TicketAlreadyUsed
            | Error::ZeroBalance
            | Error::NothingToUnlock
            | Error::AlreadyUnlocking
            | Error::NotUnlocking
            | Error::StillLocked => ErrorKind::ProtocolState,

            Error::InvariantViolation(_) => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_the_taxonomy() {
        assert_eq!(Error::ZeroAmount.kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::InvalidSignature.kind(), ErrorKind::Authentication);
        assert_eq!(Error::TicketDidNotWin.kind(), ErrorKind::ProtocolState);
        assert_eq!(
            Error::InvariantViolation("reserve overdraw").kind(),
            ErrorKind::Fatal
        );
    }
}
