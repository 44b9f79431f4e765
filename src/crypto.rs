//! Addresses and recoverable ECDSA signatures.
//!
//! Tickets are authenticated by recovering the signing key directly from
//! the signature, so a redemption carries no public key: the recovered
//! signer address is compared against the ticket sender and the sender's
//! approved-signer set.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use sha2::Digest as _;

use crate::consts::{ADDRESS_SIZE, SIGNATURE_SIZE};
use crate::errors::Error;

/// Compute the SHA256 hash of some input data. Every digest in the
/// protocol is a SHA256 output: ticket digests, win digests, address
/// derivation, and `recipient_rand` commitments.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    sha2::Sha256::new().chain_update(input).finalize().into()
}

/// A party identifier, derived from a secp256k1 public key as the trailing
/// 20 bytes of the SHA256 hash of its uncompressed encoding.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// The all-zero address. Never authoritative: tickets naming it are
    /// rejected, and signature recovery refuses to yield it.
    pub const NULL: Address = Address([0; ADDRESS_SIZE]);

    /// Derive the address controlled by a public key.
    pub fn from_pubkey(pubkey: &PublicKey) -> Address {
        let encoded = pubkey.serialize_uncompressed();
        // Skip the constant 0x04 SEC1 prefix byte.
        let digest = sha256(&encoded[1..]);
        let mut addr = [0u8; ADDRESS_SIZE];
        addr.copy_from_slice(&digest[digest.len() - ADDRESS_SIZE..]);
        Address(addr)
    }

    /// Derive the address controlled by a secret key.
    pub fn from_secret_key(seckey: &SecretKey) -> Address {
        Address::from_pubkey(&PublicKey::from_secret_key(SECP256K1, seckey))
    }

    pub fn is_null(&self) -> bool {
        *self == Address::NULL
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A compact recoverable ECDSA signature: `r || s || recovery_id`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Parse a signature from raw bytes. Fails with
    /// [`Error::InvalidSignatureFormat`] unless the slice is exactly
    /// [`SIGNATURE_SIZE`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Signature, Error> {
        let encoded: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSignatureFormat)?;
        Ok(Signature(encoded))
    }

    fn to_recoverable(self) -> Result<RecoverableSignature, Error> {
        let recovery_id = RecoveryId::from_i32(self.0[SIGNATURE_SIZE - 1] as i32)
            .map_err(|_| Error::InvalidSignatureFormat)?;
        RecoverableSignature::from_compact(&self.0[..SIGNATURE_SIZE - 1], recovery_id)
            .map_err(|_| Error::InvalidSignatureFormat)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recover the address which signed `digest`.
///
/// Fails with [`Error::InvalidSignatureFormat`] if the signature encoding
/// is malformed, and [`Error::InvalidSignature`] if key recovery fails or
/// would yield the null address.
pub fn recover_signer(digest: &[u8; 32], signature: &Signature) -> Result<Address, Error> {
    let recoverable = signature.to_recoverable()?;
    let message = Message::from_digest(*digest);
    let pubkey = SECP256K1
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| Error::InvalidSignature)?;

    let signer = Address::from_pubkey(&pubkey);
    if signer.is_null() {
        return Err(Error::InvalidSignature);
    }
    Ok(signer)
}

/// Sign a 32-byte digest, producing a signature [`recover_signer`] will
/// accept. Ticket issuers use this over [`Ticket::digest`][crate::Ticket::digest].
pub fn sign_digest(digest: &[u8; 32], seckey: &SecretKey) -> Signature {
    let message = Message::from_digest(*digest);
    let recoverable = SECP256K1.sign_ecdsa_recoverable(&message, seckey);
    let (recovery_id, compact) = recoverable.serialize_compact();

    let mut encoded = [0u8; SIGNATURE_SIZE];
    encoded[..SIGNATURE_SIZE - 1].copy_from_slice(&compact);
    encoded[SIGNATURE_SIZE - 1] = recovery_id.to_i32() as u8;
    Signature(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seckey(fill: u8) -> SecretKey {
        SecretKey::from_slice(&[fill; 32]).unwrap()
    }

    #[test]
    fn sign_and_recover() {
        let seckey = test_seckey(0x42);
        let digest = sha256(b"some ticket digest");

        let signature = sign_digest(&digest, &seckey);
        let signer = recover_signer(&digest, &signature).expect("recovery failed");
        assert_eq!(signer, Address::from_secret_key(&seckey));
    }

    #[test]
    fn recovery_is_digest_bound() {
        let seckey = test_seckey(0x42);
        let signature = sign_digest(&sha256(b"digest A"), &seckey);

        // Recovery over a different digest yields a different (wrong) signer.
        let signer = recover_signer(&sha256(b"digest B"), &signature).unwrap();
        assert_ne!(signer, Address::from_secret_key(&seckey));
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert_eq!(
            Signature::from_slice(&[0u8; 64]).unwrap_err(),
            Error::InvalidSignatureFormat,
        );

        let seckey = test_seckey(0x07);
        let digest = sha256(b"digest");
        let mut signature = sign_digest(&digest, &seckey);
        signature.0[64] = 9; // out-of-range recovery id
        assert_eq!(
            recover_signer(&digest, &signature).unwrap_err(),
            Error::InvalidSignatureFormat,
        );
    }

    #[test]
    fn garbage_signature_fails_recovery() {
        let mut encoded = [0xffu8; 65];
        encoded[64] = 0;
        let signature = Signature(encoded);
        assert_eq!(
            recover_signer(&sha256(b"digest"), &signature).unwrap_err(),
            Error::InvalidSignature,
        );
    }
}
