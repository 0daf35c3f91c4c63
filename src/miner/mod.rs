pub mod miner;

pub use miner::{mine_cancellable, MineOutcome};
