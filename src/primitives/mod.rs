pub mod block;

pub use block::{Block, BlockError, WireBlock};
