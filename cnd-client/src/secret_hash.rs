use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The commitment value of a swap.
///
/// Before the counterparty's resource has been discovered no shared swap
/// identifier exists; the secret hash is the only value both parties'
/// resources agree on and is therefore what correlation matches on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretHash([u8; Self::LENGTH]);

impl SecretHash {
    pub const LENGTH: usize = 32;

    pub fn raw(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl From<[u8; SecretHash::LENGTH]> for SecretHash {
    fn from(bytes: [u8; SecretHash::LENGTH]) -> Self {
        SecretHash(bytes)
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretHash({:x})", self)
    }
}

impl fmt::Display for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl fmt::LowerHex for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("secret hash is not valid hex")]
    InvalidHex,
    #[error("secret hash must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

impl FromStr for SecretHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseError::InvalidHex)?;

        if bytes.len() != Self::LENGTH {
            return Err(ParseError::InvalidLength {
                expected: Self::LENGTH,
                got: bytes.len(),
            });
        }

        let mut raw = [0u8; Self::LENGTH];
        raw.copy_from_slice(&bytes);

        Ok(SecretHash(raw))
    }
}

impl Serialize for SecretHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:x}", self))
    }
}

impl<'de> Deserialize<'de> for SecretHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;

        hex.parse().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&hex), &"a hex encoded 32 byte value")
        })
    }
}
