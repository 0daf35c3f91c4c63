// Persistence is out of scope as a feature; this is the ambient seam the
// node talks to, so a real sink can be plugged in later without touching
// consensus or networking code.

use crate::primitives::block::Block;

pub trait ChainSink: Send + Sync {
    fn on_block(&self, block: &Block);
    fn load_chain(&self) -> Option<Vec<Block>>;
}

pub struct NullSink;

impl ChainSink for NullSink {
    fn on_block(&self, _block: &Block) {}
    fn load_chain(&self) -> Option<Vec<Block>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_never_persists() {
        let sink = NullSink;
        assert!(sink.load_chain().is_none());
        sink.on_block(&crate::consensus::genesis::mine_genesis());
    }
}
