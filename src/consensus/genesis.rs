// Genesis block definition.
//
// Fixed network-wide timestamp, not wall-clock-at-startup, so every node
// that mines genesis independently converges on the same hash.

use crate::digest::Digest;
use crate::primitives::block::{Block, GENESIS_PREV_HASH};

/// Network genesis timestamp (seconds since epoch). Fixed so independently
/// started nodes agree on the genesis block without exchanging it.
pub const GENESIS_TIMESTAMP: u64 = 1_706_745_600;

pub const GENESIS_DATA: &str = "Genesis Block";

/// Initial target: easy enough that genesis mines in well under a second.
pub const INITIAL_TARGET_HEX: &str =
    "00000ffff0000000000000000000000000000000000000000000000000000000";

pub fn initial_target() -> Digest {
    Digest::from_hex(INITIAL_TARGET_HEX).expect("initial target is a valid 64-hex digest")
}

/// Mine the genesis block: index 0, sentinel prev_hash, fixed timestamp and
/// data, against `initial_target`. Deterministic — every caller gets the
/// same block.
pub fn mine_genesis() -> Block {
    let target = initial_target();
    let mut nonce: u64 = 0;
    loop {
        let hash = crate::primitives::block::calculate_hash(
            0,
            GENESIS_PREV_HASH,
            GENESIS_TIMESTAMP,
            GENESIS_DATA,
            nonce,
            &target,
        );
        if crate::primitives::block::validate_difficulty(&hash, &target) {
            return Block::new(
                0,
                GENESIS_PREV_HASH.to_string(),
                GENESIS_TIMESTAMP,
                GENESIS_DATA.to_string(),
                nonce,
                target,
            )
            .expect("genesis mined against its own target must validate");
        }
        nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let a = mine_genesis();
        let b = mine_genesis();
        assert_eq!(a, b);
    }

    #[test]
    fn genesis_fields() {
        let g = mine_genesis();
        assert_eq!(g.index, 0);
        assert_eq!(g.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(g.data, GENESIS_DATA);
        assert!(g.is_valid());
    }
}
