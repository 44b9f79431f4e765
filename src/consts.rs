/// The serialized length of an address: the trailing 20 bytes of the
/// SHA256 hash of an uncompressed secp256k1 public key.
pub const ADDRESS_SIZE: usize = 20;

/// The serialized length of a recoverable ECDSA signature:
/// 64 compact bytes (`r || s`) followed by a one-byte recovery id.
pub const SIGNATURE_SIZE: usize = 65;

/// The length of every digest used by the protocol: ticket digests,
/// win digests, and `recipient_rand` commitments are all SHA256 outputs.
pub const DIGEST_SIZE: usize = 32;

/// The size of `recipient_rand` secrets committed to in tickets.
pub const RAND_SIZE: usize = 32;
