// Data structures: Block
//
// Mirrors the original chain's dataclass (original_source/chain/block.py):
// a frozen tuple of seven fields, with hash and difficulty re-derived on
// every validation rather than trusted blindly on deserialisation.

use serde::{Deserialize, Serialize};

use crate::digest::{hash_bytes, Digest};

/// Sentinel `prev_hash` value for the genesis block — not a Digest.
pub const GENESIS_PREV_HASH: &str = "0";

/// Immutable block record. `prev_hash` is a plain string because genesis
/// uses the non-digest sentinel `"0"`; `target` and `hash` are always
/// canonical digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub prev_hash: String,
    pub timestamp: u64,
    pub data: String,
    pub nonce: u64,
    pub target: Digest,
    pub hash: Digest,
}

impl Block {
    /// Construct a block, refusing one that fails `is_valid`. There is no
    /// path that creates a `Block` with a hash that wasn't checked against
    /// its own preimage and difficulty target.
    pub fn new(
        index: u64,
        prev_hash: String,
        timestamp: u64,
        data: String,
        nonce: u64,
        target: Digest,
    ) -> Result<Self, BlockError> {
        let hash = calculate_hash(index, &prev_hash, timestamp, &data, nonce, &target);
        let block = Block {
            index,
            prev_hash,
            timestamp,
            data,
            nonce,
            target,
            hash,
        };
        if !block.is_valid() {
            return Err(BlockError::FailedDifficulty);
        }
        Ok(block)
    }

    /// Re-derive the hash from this block's own fields.
    pub fn recompute_hash(&self) -> Digest {
        calculate_hash(
            self.index,
            &self.prev_hash,
            self.timestamp,
            &self.data,
            self.nonce,
            &self.target,
        )
    }

    pub fn is_valid_hash(&self) -> bool {
        self.recompute_hash() == self.hash
    }

    pub fn is_valid_difficulty(&self) -> bool {
        validate_difficulty(&self.hash, &self.target)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_hash() && self.is_valid_difficulty()
    }

    /// Deserialise from the wire/storage map, re-verifying the stored hash.
    /// No implicit recomputation — an invalid stored hash is refused, not
    /// silently corrected.
    pub fn deserialize(wire: WireBlock) -> Result<Self, BlockError> {
        let target = Digest::from_hex(&wire.target).map_err(BlockError::BadTarget)?;
        let hash = Digest::from_hex(&wire.hash).map_err(BlockError::BadHash)?;
        let block = Block {
            index: wire.index,
            prev_hash: wire.prev_hash,
            timestamp: wire.timestamp,
            data: wire.data,
            nonce: wire.nonce,
            target,
            hash,
        };
        if !block.is_valid() {
            return Err(BlockError::FailedDifficulty);
        }
        Ok(block)
    }

    pub fn serialize(&self) -> WireBlock {
        WireBlock {
            index: self.index,
            prev_hash: self.prev_hash.clone(),
            timestamp: self.timestamp,
            data: self.data.clone(),
            nonce: self.nonce,
            target: self.target.as_str().to_string(),
            hash: self.hash.as_str().to_string(),
        }
    }
}

/// The wire/storage shape of a block: plain strings for the
/// hex-shaped fields, so the bijection with `serialize`/`deserialize` is
/// exact and independent of the in-memory `Digest` newtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBlock {
    pub index: u64,
    pub prev_hash: String,
    pub timestamp: u64,
    pub data: String,
    pub nonce: u64,
    pub target: String,
    pub hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block hash does not satisfy its own difficulty target")]
    FailedDifficulty,
    #[error("invalid target hex: {0}")]
    BadTarget(crate::digest::DigestError),
    #[error("invalid hash hex: {0}")]
    BadHash(crate::digest::DigestError),
}

/// Canonical preimage concatenation: string renderings of
/// `index, prev_hash, timestamp, data, nonce, target`, no separators,
/// integers in base-10 without leading zeros. This format is ambiguous
/// between field boundaries (e.g. index=1,prev_hash="23" collides with
/// index=12,prev_hash="3") — preserved deliberately for interoperability
/// with the source algorithm, not corrected here.
pub fn calculate_hash(
    index: u64,
    prev_hash: &str,
    timestamp: u64,
    data: &str,
    nonce: u64,
    target: &Digest,
) -> Digest {
    let preimage = format!("{index}{prev_hash}{timestamp}{data}{nonce}{target}");
    hash_bytes(preimage.as_bytes())
}

/// `int(hash, 16) <= int(target, 16)`.
pub fn validate_difficulty(hash: &Digest, target: &Digest) -> bool {
    hash.to_u256() <= target.to_u256()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn easy_target() -> Digest {
        // Maximal target: every hash satisfies the difficulty predicate.
        Digest::from_hex(&"f".repeat(64)).unwrap()
    }

    #[test]
    fn construction_refuses_tampered_hash() {
        let target = easy_target();
        let block = Block::new(0, "0".into(), 0, "Genesis Block".into(), 0, target.clone()).unwrap();
        let mut wire = block.serialize();
        // Flip one hex digit of the stored hash.
        let mut chars: Vec<char> = wire.hash.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        wire.hash = chars.into_iter().collect();
        assert!(Block::deserialize(wire).is_err());
    }

    #[test]
    fn mined_block_round_trips() {
        let target = easy_target();
        let block = Block::new(0, "0".into(), 1000, "Genesis Block".into(), 0, target).unwrap();
        let wire = block.serialize();
        let parsed = Block::deserialize(wire).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn difficulty_is_numeric_not_lexical() {
        // A hash that is lexically "larger" but numerically smaller must
        // still be rejected if it exceeds target, and accepted if not —
        // validate_difficulty must compare as big integers.
        let target = Digest::from_hex(&"00".to_string().repeat(32)).unwrap();
        let hash_ok = Digest::from_hex(&"00".to_string().repeat(32)).unwrap();
        assert!(validate_difficulty(&hash_ok, &target));
        let mut over = "0".repeat(64);
        over.replace_range(63..64, "1");
        let hash_over = Digest::from_hex(&over).unwrap();
        assert!(!validate_difficulty(&hash_over, &target));
    }
}
