// Minimal injected collaborator for the mining path: holds the payload
// string `mine_loop` snapshots before each mining attempt. Transaction
// selection, fees, and replace-by-fee policy are out of scope — this is
// just the one operation the miner actually reaches.

use std::sync::Mutex;

pub struct Mempool {
    payload: Mutex<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool {
            payload: Mutex::new(String::new()),
        }
    }

    /// Nothing in this crate calls this yet — there's no transaction
    /// source to feed it, so every mined block's payload is `""`. Kept as
    /// the seam a real mempool would set before each mining attempt.
    pub fn set_payload(&self, payload: String) {
        *self.payload.lock().unwrap() = payload;
    }

    /// Snapshot the current payload for a mining attempt.
    pub fn snapshot(&self) -> String {
        self.payload.lock().unwrap().clone()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_latest_payload() {
        let pool = Mempool::new();
        assert_eq!(pool.snapshot(), "");
        pool.set_payload("hello".into());
        assert_eq!(pool.snapshot(), "hello");
    }
}
