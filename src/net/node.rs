// Per-connection state machine: one message per connection, an optional
// reply on the same connection, then close. Outbound requests read their
// reply on the same connection and feed it through the same handling an
// unsolicited inbound push would get.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use colored::*;
use tokio::net::TcpStream;

use crate::consensus::chain::{Chain, WireChain};
use crate::net::protocol::{FramedStream, Message};
use crate::node::Shared;
use crate::primitives::block::WireBlock;

pub async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) -> std::io::Result<()> {
    let mut framed = FramedStream::new(stream);
    let Some(msg) = framed.recv().await? else {
        return Ok(());
    };

    match msg {
        Message::RequestLatestBlock => {
            let tip = {
                let chain = shared.chain.lock().await;
                chain.tip().serialize()
            };
            framed.send(&Message::ReceiveLatestBlock { block: tip }).await?;
        }

        Message::ReceiveLatestBlock { block } => {
            process_latest_block(&shared, block).await;
        }

        Message::RequestBlockchain => {
            let wire = {
                let chain = shared.chain.lock().await;
                chain.to_wire()
            };
            framed.send(&Message::ReceiveBlockchain { blockchain: wire }).await?;
        }

        Message::ReceiveBlockchain { blockchain } => {
            process_blockchain(&shared, blockchain).await;
        }
    }

    Ok(())
}

/// A block learned from the network, whether pushed unsolicited or
/// returned as the reply to our own `RequestLatestBlock`: extend the
/// chain if adjacent, otherwise ask around for the full chain if we
/// look behind.
fn process_latest_block<'a>(
    shared: &'a Arc<Shared>,
    block: WireBlock,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let Ok(block) = crate::primitives::block::Block::deserialize(block) else {
            if shared.config.debug {
                eprintln!("{} dropped undecodable block", "[p2p]".yellow());
            }
            return;
        };

        let (added, tip_index) = {
            let mut chain = shared.chain.lock().await;
            let tip_index = chain.tip().index;
            (chain.add_block(block.clone()), tip_index)
        };

        if added {
            shared.mining_epoch.fetch_add(1, Ordering::Relaxed);
            rebroadcast(shared, Message::ReceiveLatestBlock { block: block.serialize() }).await;
        } else if block.index > tip_index {
            rebroadcast(shared, Message::RequestBlockchain).await;
        }
    })
}

/// A full chain, whether pushed unsolicited or returned as the reply to
/// our own `RequestBlockchain`: replace ours if it is longer and valid.
fn process_blockchain<'a>(
    shared: &'a Arc<Shared>,
    blockchain: WireChain,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let interval = {
            let chain = shared.chain.lock().await;
            chain.interval()
        };
        let Some(candidate) = Chain::from_wire(blockchain, interval) else {
            return;
        };
        let mut chain = shared.chain.lock().await;
        if chain.replace(candidate) {
            shared.mining_epoch.fetch_add(1, Ordering::Relaxed);
            if shared.config.debug {
                println!("{} replaced chain, new length {}", "[p2p]".bright_green(), chain.length());
            }
        }
    })
}

async fn rebroadcast(shared: &Arc<Shared>, message: Message) {
    let neighbors = shared.overlay.find_neighbors(shared.local_peer_id, shared.config.alpha);
    for peer in neighbors {
        let message = message.clone();
        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = contact_peer(peer.addr, &message, &shared).await
                && shared.config.debug
            {
                eprintln!("{} rebroadcast to {} failed: {e}", "[p2p]".bright_yellow(), peer.addr);
            }
        });
    }
}

/// Connect to `addr` and send `message`. `RequestLatestBlock` and
/// `RequestBlockchain` expect a reply on the same connection; read it and
/// run it through the same dispatch an inbound push would get. The two
/// `Receive*` variants are one-way pushes and expect no reply.
pub async fn contact_peer(addr: SocketAddr, message: &Message, shared: &Arc<Shared>) -> std::io::Result<()> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = FramedStream::new(stream);
    framed.send(message).await?;

    if matches!(message, Message::RequestLatestBlock | Message::RequestBlockchain)
        && let Some(reply) = framed.recv().await?
    {
        match reply {
            Message::ReceiveLatestBlock { block } => process_latest_block(shared, block).await,
            Message::ReceiveBlockchain { blockchain } => process_blockchain(shared, blockchain).await,
            _ => {}
        }
    }
    Ok(())
}
