// Canonical 256-bit content hash.
//
// A thin function over a concrete hasher, returning a fixed-size value.
// The canonical *text* form — 64 lowercase hex characters — is the value
// itself, since the wire protocol and the hash preimage both need the
// string rendering, not raw bytes.

use blake2::{Blake2s256, Digest as _};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("digest must be {DIGEST_HEX_LEN} hex characters, got {0}")]
    WrongLength(usize),
    #[error("digest contains non-hex or uppercase characters: {0}")]
    NotLowerHex(String),
}

/// A 256-bit digest, canonically 64 lowercase hex characters. Ordered
/// numerically for difficulty comparison — since all digests are the same
/// zero-padded length, byte/ASCII lexicographic order on the hex string
/// already equals numeric order, so no big-integer conversion is needed to
/// compare two digests (only to do arithmetic on one, see `consensus::chain`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    /// Parse a canonical 64-lowercase-hex digest. Rejects wrong length,
    /// uppercase, or non-hex input — construction never silently normalizes.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::WrongLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(DigestError::NotLowerHex(s.to_string()));
        }
        Ok(Digest(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_str_radix(&self.0, 16).expect("validated hex on construction")
    }

    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Digest(hex::encode(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// BLAKE2s-256 over arbitrary bytes, rendered as a canonical digest.
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Blake2s256::new();
    hasher.update(data);
    let out = hasher.finalize();
    Digest(hex::encode(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_hex() {
        let d = hash_bytes(b"loomchain");
        let parsed = Digest::from_hex(d.as_str()).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        let bad = "A".repeat(DIGEST_HEX_LEN);
        assert!(Digest::from_hex(&bad).is_err());
    }

    #[test]
    fn ordering_matches_numeric_value() {
        let low = Digest::from_hex(&"0".repeat(DIGEST_HEX_LEN)).unwrap();
        let mut high_s = "0".repeat(DIGEST_HEX_LEN);
        high_s.replace_range(DIGEST_HEX_LEN - 1..DIGEST_HEX_LEN, "f");
        let high = Digest::from_hex(&high_s).unwrap();
        assert!(low < high);
        assert!(low.to_u256() < high.to_u256());
    }

    #[test]
    fn from_u256_zero_pads() {
        let d = Digest::from_u256(U256::from(255));
        assert_eq!(d.as_str(), format!("{}ff", "0".repeat(DIGEST_HEX_LEN - 2)));
    }
}
