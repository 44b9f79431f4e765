//! The ticket value object and its probabilistic win rule.

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::consts::RAND_SIZE;
use crate::crypto::{sha256, Address};
use crate::Round;

/// A recipient's commit/reveal secret.
///
/// At issuance the recipient commits to `sha256(recipient_rand)` inside the
/// ticket; the secret itself is revealed only at redemption. The win digest
/// mixes the ticket digest with the revealed secret, so neither party can
/// know the win outcome when the ticket is signed.
pub type RecipientRand = [u8; RAND_SIZE];

/// Generate a fresh `recipient_rand` secret from a secure RNG.
pub fn random_recipient_rand<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> RecipientRand {
    let mut secret = [0u8; RAND_SIZE];
    rng.fill_bytes(&mut secret);
    secret
}

/// Parse a `recipient_rand` secret from a hex string.
pub fn recipient_rand_from_hex(s: &str) -> Result<RecipientRand, hex::FromHexError> {
    let mut secret = [0u8; RAND_SIZE];
    hex::decode_to_slice(s, &mut secret)?;
    Ok(secret)
}

/// The canonical content digest of a [`Ticket`].
///
/// A ticket is identified by its full content hash, not by a sequence
/// number: two tickets differing only in `sender_nonce` are distinct
/// instruments. This digest is what gets signed by the issuer, and what the
/// used-ticket set records to block double spends. It deliberately does not
/// cover the signature.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct TicketHash(pub [u8; 32]);

impl AsRef<[u8]> for TicketHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A winning probability, encoded as a 256-bit big-endian fixed-point
/// numerator over the denominator 2^256.
///
/// A ticket wins iff its win digest, interpreted as a big-endian unsigned
/// integer, is strictly below this threshold. The comparison is exact;
/// there is no floating point anywhere in the win rule.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct WinProb(pub [u8; 32]);

impl WinProb {
    /// A ticket which never wins.
    pub const NEVER: WinProb = WinProb([0x00; 32]);

    /// A ticket which always wins, short of the one-in-2^256 digest of all
    /// ones.
    pub const ALWAYS: WinProb = WinProb([0xff; 32]);

    /// Encode the probability `numerator / denominator` on the 2^256 scale,
    /// rounding down. Returns `None` if the denominator is zero or the
    /// fraction exceeds one.
    pub fn from_fraction(numerator: u64, denominator: u64) -> Option<WinProb> {
        if denominator == 0 || numerator > denominator {
            return None;
        }
        if numerator == denominator {
            return Some(WinProb::ALWAYS);
        }

        // Byte-wise long division: the i-th output byte is the i-th base-256
        // digit of numerator/denominator.
        let mut threshold = [0u8; 32];
        let mut remainder = numerator as u128;
        let denominator = denominator as u128;
        for byte in threshold.iter_mut() {
            remainder <<= 8;
            *byte = (remainder / denominator) as u8;
            remainder %= denominator;
        }
        Some(WinProb(threshold))
    }
}

impl AsRef<[u8]> for WinProb {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A signed, probabilistic payment instrument.
///
/// Tickets are issued off-ledger in volume; most are discarded unredeemed.
/// Only a ticket whose win digest lands under [`win_prob`][Ticket::win_prob]
/// is worth submitting, so the expected settlement cost amortizes to a
/// small fraction of the value transferred.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// The payer whose deposit and reserve back this ticket.
    pub sender: Address,

    /// The payee who may redeem this ticket if it wins.
    pub recipient: Address,

    /// The fixed payout if this ticket wins. A zero face value is legal:
    /// such a ticket is a valid no-op winner, usable as a liveness probe.
    pub face_value: u128,

    /// The probability that this ticket wins.
    pub win_prob: WinProb,

    /// An issuer-chosen nonce distinguishing otherwise identical tickets.
    pub sender_nonce: u64,

    /// The recipient's commitment, `sha256(recipient_rand)`. The secret is
    /// revealed only at redemption, so the issuer cannot know the win
    /// outcome when signing.
    #[serde(with = "crate::serialization::byte_array")]
    pub recipient_rand_hash: [u8; 32],

    /// The round in which this ticket was issued.
    pub creation_round: Round,

    /// The ledger block hash observed at the creation round, tying the
    /// ticket to a specific ledger history.
    #[serde(with = "crate::serialization::byte_array")]
    pub creation_round_block_hash: [u8; 32],

    /// The ticket is redeemable while the current round is strictly below
    /// this round.
    pub expiration_round: Round,

    /// Free-form issuer data, covered by the digest.
    #[serde(with = "crate::serialization::byte_vec")]
    pub aux_data: Vec<u8>,
}

impl Ticket {
    /// Compute the canonical content digest of this ticket.
    ///
    /// All fields are hashed in a fixed order with fixed-width big-endian
    /// integer encodings; `aux_data` is length-prefixed so no two distinct
    /// field layouts can collide on the same byte stream.
    pub fn digest(&self) -> TicketHash {
        let encoded = sha2::Sha256::new()
            .chain_update(self.sender)
            .chain_update(self.recipient)
            .chain_update(self.face_value.to_be_bytes())
            .chain_update(self.win_prob)
            .chain_update(self.sender_nonce.to_be_bytes())
            .chain_update(self.recipient_rand_hash)
            .chain_update(self.creation_round.to_be_bytes())
            .chain_update(self.creation_round_block_hash)
            .chain_update(self.expiration_round.to_be_bytes())
            .chain_update((self.aux_data.len() as u64).to_be_bytes())
            .chain_update(&self.aux_data)
            .finalize();
        TicketHash(encoded.into())
    }

    /// Returns true once the ticket can no longer be redeemed.
    pub fn is_expired(&self, current_round: Round) -> bool {
        current_round >= self.expiration_round
    }

    /// Compute the win digest binding this ticket to the revealed secret.
    pub fn win_digest(digest: &TicketHash, recipient_rand: &RecipientRand) -> [u8; 32] {
        sha2::Sha256::new()
            .chain_update(digest)
            .chain_update(recipient_rand)
            .finalize()
            .into()
    }

    /// Evaluate the probabilistic win rule: the ticket wins iff the win
    /// digest is strictly below [`win_prob`][Ticket::win_prob] as a 256-bit
    /// big-endian integer.
    pub fn is_winner(&self, digest: &TicketHash, recipient_rand: &RecipientRand) -> bool {
        Ticket::win_digest(digest, recipient_rand) < self.win_prob.0
    }
}
