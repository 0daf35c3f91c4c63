// Mining loop: search nonces from 0 over a snapshot of the block template
// until difficulty holds. Checked for cancellation every `YIELD_EVERY`
// iterations so `stop()` latency stays well under 100ms on typical
// hardware; never touches the chain lock while searching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::digest::Digest;
use crate::primitives::block::{calculate_hash, validate_difficulty, Block};

const YIELD_EVERY: u64 = 10_000;

pub enum MineOutcome {
    Found(Block),
    Cancelled,
}

/// Immutable snapshot of what the miner needs: the fields of the block
/// being built, captured once before the search starts.
pub struct BlockTemplate {
    pub index: u64,
    pub prev_hash: String,
    pub data: String,
    pub target: Digest,
}

impl BlockTemplate {
    pub fn from_tip(tip: &Block, target: Digest, data: String) -> Self {
        BlockTemplate {
            index: tip.index + 1,
            prev_hash: tip.hash.as_str().to_string(),
            data,
            target,
        }
    }
}

/// Search nonces from 0 until `validate_difficulty` holds or `stop` is
/// observed set. Timestamp is captured once at search start.
pub fn mine_cancellable(template: &BlockTemplate, stop: &AtomicBool) -> MineOutcome {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();

    let mut nonce: u64 = 0;
    loop {
        if nonce.is_multiple_of(YIELD_EVERY) && stop.load(Ordering::Relaxed) {
            return MineOutcome::Cancelled;
        }

        let hash = calculate_hash(
            template.index,
            &template.prev_hash,
            timestamp,
            &template.data,
            nonce,
            &template.target,
        );
        if validate_difficulty(&hash, &template.target) {
            let block = Block::new(
                template.index,
                template.prev_hash.clone(),
                timestamp,
                template.data.clone(),
                nonce,
                template.target.clone(),
            )
            .expect("freshly mined block must validate against its own target");
            return MineOutcome::Found(block);
        }
        nonce = nonce.wrapping_add(1);
    }
}
