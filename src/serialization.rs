//! Display and serde impls for the byte-array newtypes.
//!
//! Human-readable formats (JSON and friends) see lowercase hex strings;
//! binary formats see raw bytes.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::SIGNATURE_SIZE;
use crate::crypto::{Address, Signature};
use crate::ticket::{TicketHash, WinProb};

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            self.to_string().serialize(ser)
        } else {
            self.0.serialize(ser)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(|_| {
                D::Error::invalid_value(serde::de::Unexpected::Str(&s), &"a 20-byte hex address")
            })
        } else {
            Ok(Address(<[u8; 20]>::deserialize(deserializer)?))
        }
    }
}

impl std::fmt::Display for TicketHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::str::FromStr for TicketHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(TicketHash(bytes))
    }
}

impl Serialize for TicketHash {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            self.to_string().serialize(ser)
        } else {
            self.0.serialize(ser)
        }
    }
}

impl<'de> Deserialize<'de> for TicketHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<TicketHash, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(|_| {
                D::Error::invalid_value(serde::de::Unexpected::Str(&s), &"a 32-byte hex digest")
            })
        } else {
            Ok(TicketHash(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

impl std::fmt::Display for WinProb {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for WinProb {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            self.to_string().serialize(ser)
        } else {
            self.0.serialize(ser)
        }
    }
}

impl<'de> Deserialize<'de> for WinProb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<WinProb, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(&s, &mut bytes).map_err(|_| {
                D::Error::invalid_value(
                    serde::de::Unexpected::Str(&s),
                    &"a 32-byte hex win probability",
                )
            })?;
            Ok(WinProb(bytes))
        } else {
            Ok(WinProb(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            self.to_string().serialize(ser)
        } else {
            ser.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Signature, D::Error> {
        struct SignatureVisitor;

        impl<'de> serde::de::Visitor<'de> for SignatureVisitor {
            type Value = Signature;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a {}-byte recoverable signature", SIGNATURE_SIZE)
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Signature, E> {
                Signature::from_slice(v)
                    .map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Signature, A::Error> {
                let mut bytes = Vec::with_capacity(SIGNATURE_SIZE);
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                self.visit_bytes(&bytes)
            }
        }

        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let bytes = hex::decode(&s).map_err(|_| {
                D::Error::invalid_value(serde::de::Unexpected::Str(&s), &"a hex signature")
            })?;
            Signature::from_slice(&bytes)
                .map_err(|_| D::Error::invalid_length(bytes.len(), &"a 65-byte signature"))
        } else {
            deserializer.deserialize_bytes(SignatureVisitor)
        }
    }
}

pub(crate) mod byte_array {
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn serialize<S: Serializer>(value: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            hex::encode(value).serialize(ser)
        } else {
            value.serialize(ser)
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; 32], D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(&s, &mut bytes).map_err(|_| {
                D::Error::invalid_value(serde::de::Unexpected::Str(&s), &"a 32-byte hex string")
            })?;
            Ok(bytes)
        } else {
            <[u8; 32]>::deserialize(deserializer)
        }
    }
}

pub(crate) mod byte_vec {
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn serialize<S: Serializer>(value: &Vec<u8>, ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            hex::encode(value).serialize(ser)
        } else {
            value.serialize(ser)
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(&s).map_err(|_| {
                D::Error::invalid_value(serde::de::Unexpected::Str(&s), &"a hex string")
            })
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}
