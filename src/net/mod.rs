pub mod node;
pub mod protocol;

pub use protocol::{FramedStream, Message};
