// Node orchestrator: owns the Chain exclusively, drives the single
// cooperative event loop (accept connections, sync/refresh timers,
// mining completions), and is the only place the chain is mutated.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colored::*;
use libp2p::identity;
use libp2p::PeerId;
use rand::seq::index::sample;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::{NodeConfig, REFRESH_TICK_SECS};
use crate::consensus::chain::Chain;
use crate::mempool::Mempool;
use crate::miner::miner::BlockTemplate;
use crate::miner::{mine_cancellable, MineOutcome};
use crate::net::node::{contact_peer, handle_connection};
use crate::net::protocol::Message;
use crate::overlay::{KadPeerDirectory, PeerDirectory, BUCKET_COUNT};
use crate::persistence::{ChainSink, NullSink};

/// State shared between the event loop, per-connection handlers, and the
/// mining worker. The Chain is mutated only on the event-loop task; peer
/// handlers and the miner only ever see it through this mutex.
pub struct Shared {
    pub chain: Mutex<Chain>,
    pub config: NodeConfig,
    pub overlay: Arc<dyn PeerDirectory + Send + Sync>,
    pub local_peer_id: PeerId,
    pub mempool: Mempool,
    pub sink: Box<dyn ChainSink + Send + Sync>,
    pub cancel_mining: Arc<AtomicBool>,
    pub mining_epoch: AtomicU64,
}

impl Shared {
    fn debug_enabled(&self) -> bool {
        self.config.debug
    }

    async fn broadcast(self: &Arc<Self>, message: Message) {
        let neighbors = self
            .overlay
            .find_neighbors(self.local_peer_id, self.config.alpha);
        for peer in neighbors {
            let message = message.clone();
            let shared = self.clone();
            tokio::spawn(async move {
                if let Err(e) = contact_peer(peer.addr, &message, &shared).await
                    && shared.debug_enabled()
                {
                    eprintln!("{} broadcast to {} failed: {e}", "[p2p]".bright_yellow().bold(), peer.addr);
                }
            });
        }
    }
}

pub struct Node {
    shared: Arc<Shared>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let keypair = identity::Keypair::generate_ed25519();
        let overlay = Arc::new(KadPeerDirectory::new(&keypair));
        let local_peer_id = overlay.local_peer_id();

        let sink: Box<dyn ChainSink + Send + Sync> = Box::new(NullSink);
        let chain = sink
            .load_chain()
            .and_then(|blocks| Chain::from_blocks(blocks, config.interval_secs))
            .unwrap_or_else(|| Chain::new(config.interval_secs));

        let shared = Arc::new(Shared {
            chain: Mutex::new(chain),
            config,
            overlay,
            local_peer_id,
            // Nothing feeds `Mempool::set_payload` yet — transaction selection
            // is out of scope, so every mined block carries an empty payload.
            mempool: Mempool::new(),
            sink,
            cancel_mining: Arc::new(AtomicBool::new(false)),
            mining_epoch: AtomicU64::new(0),
        });
        Node { shared }
    }

    /// Join the overlay via known seeds.
    pub fn bootstrap(&self) {
        if self.shared.config.bootstrap_peers.is_empty() {
            println!("{} no bootstrap peers configured", "[p2p]".bright_blue().bold());
            return;
        }
        self.shared.overlay.bootstrap(&self.shared.config.bootstrap_peers);
        println!(
            "{} bootstrapped from {} seed(s)",
            "[p2p]".bright_blue().bold(),
            self.shared.config.bootstrap_peers.len()
        );
    }

    /// Signal the miner to abort at the next nonce boundary and mark the
    /// loop for shutdown. `listen`'s caller is responsible for dropping
    /// its own cancellation token to stop the accept loop.
    pub fn stop(&self) {
        self.shared.cancel_mining.store(true, Ordering::Relaxed);
    }

    /// Bind the stream-oriented block-exchange socket and start the event
    /// loop. Runs until `stop_flag` is observed set.
    pub async fn listen(&self, stop_flag: Arc<AtomicBool>) -> std::io::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.shared.config.bind_address, self.shared.config.port)
            .parse()
            .expect("bind address and port form a valid SocketAddr");
        let listener = TcpListener::bind(addr).await?;
        println!("{} listening on {addr}", "[p2p]".bright_green().bold());

        let mut sync_tick = tokio::time::interval(Duration::from_secs(self.shared.config.interval_secs.max(1)));
        let mut refresh_tick = tokio::time::interval(Duration::from_secs(REFRESH_TICK_SECS));

        if self.shared.config.mine {
            let shared = self.shared.clone();
            tokio::spawn(async move { mine_loop(shared).await });
        }

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            tokio::select! {
                accept_res = listener.accept() => {
                    match accept_res {
                        Ok((stream, peer_addr)) => {
                            let shared = self.shared.clone();
                            let debug = self.shared.debug_enabled();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, shared).await
                                    && debug
                                {
                                    eprintln!("{} {peer_addr} error: {e}", "[p2p]".bright_red().bold());
                                }
                            });
                        }
                        Err(e) => eprintln!("{} accept failed: {e}", "[p2p]".bright_red().bold()),
                    }
                }
                _ = sync_tick.tick() => {
                    self.shared.broadcast(Message::RequestLatestBlock).await;
                }
                _ = refresh_tick.tick() => {
                    // Refresh a random third of the keyspace's buckets, one
                    // probe per chosen bucket, rather than a single bucket.
                    let count = (BUCKET_COUNT / 3).max(1) as usize;
                    let mut rng = rand::thread_rng();
                    for bucket in sample(&mut rng, BUCKET_COUNT as usize, count).into_iter() {
                        self.shared.overlay.refresh_bucket(bucket as u32);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }
}

/// Mining worker: snapshot mempool payload, attempt a cancellable mine, on
/// success broadcast `RECEIVE_LATEST_BLOCK`; if stale (tip advanced during
/// search) broadcast `REQUEST_BLOCKCHAIN` and read back whatever chain
/// comes of it.
async fn mine_loop(shared: Arc<Shared>) {
    loop {
        let (template, epoch_at_start) = {
            let chain = shared.chain.lock().await;
            let old_target = chain.tip().target.clone();
            let target = chain.next_target();
            if shared.config.debug && target != old_target {
                println!(
                    "{} retarget at height {}: {old_target} -> {target}",
                    "[chain]".cyan().bold(),
                    chain.length(),
                );
            }
            let template = BlockTemplate::from_tip(chain.tip(), target, shared.mempool.snapshot());
            (template, shared.mining_epoch.load(Ordering::Relaxed))
        };

        shared.cancel_mining.store(false, Ordering::Relaxed);
        let cancel = shared.cancel_mining.clone();
        let outcome = tokio::task::spawn_blocking(move || mine_cancellable(&template, &cancel))
            .await
            .expect("mining task does not panic");

        match outcome {
            MineOutcome::Found(block) => {
                let stale = shared.mining_epoch.load(Ordering::Relaxed) != epoch_at_start;
                let mut chain = shared.chain.lock().await;
                let committed = !stale && chain.add_block(block.clone());
                drop(chain);

                if committed {
                    shared.mining_epoch.fetch_add(1, Ordering::Relaxed);
                    shared.sink.on_block(&block);
                    println!(
                        "{} mined block {} (nonce {})",
                        "[miner]".bright_magenta().bold(),
                        block.index,
                        block.nonce
                    );
                    shared
                        .broadcast(Message::ReceiveLatestBlock { block: block.serialize() })
                        .await;
                } else {
                    shared.broadcast(Message::RequestBlockchain).await;
                    tokio::time::sleep(Duration::from_secs(shared.config.interval_secs.max(1) / 2 + 1)).await;
                }
            }
            MineOutcome::Cancelled => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_starts_with_genesis_only_chain() {
        let node = Node::new(NodeConfig::new(0));
        let shared = node.shared();
        assert_eq!(shared.chain.blocking_lock().length(), 1);
    }
}
