// Wire protocol — every frame is:
//   [4 bytes magic][4 bytes LE payload length][bincode-encoded Message]
//
// One message per connection in this version: a peer sends exactly one
// `Message`, optionally receives exactly one reply on the same connection,
// then either side may close.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::consensus::chain::WireChain;
use crate::primitives::block::WireBlock;

const MAGIC: [u8; 4] = [0x4C, 0x4F, 0x4F, 0x4D]; // "LOOM"
const MAX_FRAME: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    RequestLatestBlock,
    ReceiveLatestBlock { block: WireBlock },
    RequestBlockchain,
    ReceiveBlockchain { blockchain: WireChain },
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        let payload = bincode::serialize(self).expect("Message always serializes");
        let mut frame = Vec::with_capacity(8 + payload.len());
        frame.extend_from_slice(&MAGIC);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[..4] != MAGIC {
            return None;
        }
        let payload_len = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        if data.len() < 8 + payload_len {
            return None;
        }
        bincode::deserialize(&data[8..8 + payload_len]).ok()
    }
}

/// One-message-per-connection framed stream: `send` writes a full frame,
/// `recv` buffers until a full frame arrives then returns it, `None` on
/// clean EOF before a full frame was seen.
pub struct FramedStream {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl FramedStream {
    pub fn new(stream: TcpStream) -> Self {
        FramedStream {
            stream,
            buf: Vec::new(),
        }
    }

    pub async fn send(&mut self, msg: &Message) -> io::Result<()> {
        self.stream.write_all(&msg.encode()).await
    }

    pub async fn recv(&mut self) -> io::Result<Option<Message>> {
        loop {
            if self.buf.len() >= 8 {
                let payload_len = u32::from_le_bytes(self.buf[4..8].try_into().unwrap()) as usize;
                if payload_len > MAX_FRAME {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
                }
                let frame_len = 8 + payload_len;
                if self.buf.len() >= frame_len {
                    let frame = self.buf[..frame_len].to_vec();
                    self.buf.drain(..frame_len);
                    return Ok(Message::decode(&frame));
                }
            }

            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&tmp[..n]);
        }
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: Message) -> Message {
        let enc = msg.encode();
        Message::decode(&enc).expect("decode failed")
    }

    #[test]
    fn request_latest_block_roundtrips() {
        matches!(roundtrip(Message::RequestLatestBlock), Message::RequestLatestBlock);
    }

    #[test]
    fn request_blockchain_roundtrips() {
        matches!(roundtrip(Message::RequestBlockchain), Message::RequestBlockchain);
    }

    #[test]
    fn receive_latest_block_roundtrips() {
        let block = crate::consensus::genesis::mine_genesis().serialize();
        let msg = Message::ReceiveLatestBlock { block: block.clone() };
        match roundtrip(msg) {
            Message::ReceiveLatestBlock { block: got } => assert_eq!(got, block),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn decode_rejects_wrong_magic() {
        let mut enc = Message::RequestLatestBlock.encode();
        enc[0] ^= 0xFF;
        assert!(Message::decode(&enc).is_none());
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let enc = Message::RequestLatestBlock.encode();
        assert!(Message::decode(&enc[..enc.len() - 1]).is_none());
    }
}
