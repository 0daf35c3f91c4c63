// Overlay: a narrow, consumed interface over a Kademlia-style peer
// directory. The node only ever asks it for neighbours, tells it to
// refresh a bucket, or hands it bootstrap seeds — it never reaches into
// libp2p internals beyond that.

use std::net::SocketAddr;
use std::sync::Mutex;

use libp2p::kad::store::MemoryStore;
use libp2p::kad::Behaviour as Kademlia;
use libp2p::{identity, Multiaddr, PeerId};

/// Number of k-buckets in the keyspace (one per common-prefix length of a
/// 256-bit peer id). `refresh_tick` samples a random third of these.
pub const BUCKET_COUNT: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub addr: SocketAddr,
    pub id: PeerId,
}

/// Opaque peer directory: no assumption beyond "returns reachable peers
/// most of the time".
pub trait PeerDirectory: Send + Sync {
    fn find_neighbors(&self, self_id: PeerId, alpha: usize) -> Vec<Peer>;
    fn refresh_bucket(&self, bucket_id: u32);
    fn bootstrap(&self, seeds: &[SocketAddr]);
}

/// `libp2p` Kademlia-backed directory. Driving the DHT's own swarm events
/// is the node event loop's job; this type is a thin registration/lookup
/// handle plus a small known-peer cache populated as addresses are learned.
pub struct KadPeerDirectory {
    local_id: PeerId,
    kademlia: Mutex<Kademlia<MemoryStore>>,
    known: Mutex<Vec<Peer>>,
}

impl KadPeerDirectory {
    pub fn new(keypair: &identity::Keypair) -> Self {
        let local_id = PeerId::from(keypair.public());
        let store = MemoryStore::new(local_id);
        Self {
            local_id,
            kademlia: Mutex::new(Kademlia::new(local_id, store)),
            known: Mutex::new(Vec::new()),
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_id
    }

    /// Register a discovered peer address, both in the routing table (for
    /// real DHT lookups) and in the flat cache `find_neighbors` reads from.
    pub fn learn(&self, peer: PeerId, addr: SocketAddr) {
        if let Some(multi) = socket_to_multiaddr(addr) {
            self.kademlia.lock().unwrap().add_address(&peer, multi);
        }
        let mut known = self.known.lock().unwrap();
        if !known.iter().any(|p| p.id == peer) {
            known.push(Peer { addr, id: peer });
        }
    }
}

impl PeerDirectory for KadPeerDirectory {
    fn find_neighbors(&self, self_id: PeerId, alpha: usize) -> Vec<Peer> {
        let mut known = self.known.lock().unwrap().clone();
        known.retain(|p| p.id != self_id);
        known.sort_by_key(|p| xor_distance(p.id, self_id));
        known.truncate(alpha);
        known
    }

    fn refresh_bucket(&self, _bucket_id: u32) {
        // Standard Kademlia refresh: a random target drives a lookup that
        // populates buckets along the way.
        self.kademlia.lock().unwrap().get_closest_peers(PeerId::random());
    }

    fn bootstrap(&self, seeds: &[SocketAddr]) {
        for seed in seeds {
            self.learn(PeerId::random(), *seed);
        }
        let _ = self.kademlia.lock().unwrap().bootstrap();
    }
}

fn xor_distance(a: PeerId, b: PeerId) -> u64 {
    let ab = a.to_bytes();
    let bb = b.to_bytes();
    let n = ab.len().min(bb.len()).min(8);
    let mut out = 0u64;
    for i in 0..n {
        out = (out << 8) | (ab[i] ^ bb[i]) as u64;
    }
    out
}

fn socket_to_multiaddr(addr: SocketAddr) -> Option<Multiaddr> {
    use libp2p::multiaddr::Protocol;
    let mut m = Multiaddr::empty();
    m.push(match addr.ip() {
        std::net::IpAddr::V4(v4) => Protocol::Ip4(v4),
        std::net::IpAddr::V6(v6) => Protocol::Ip6(v6),
    });
    m.push(Protocol::Udp(addr.port()));
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_accepts_empty_seed_list() {
        let keypair = identity::Keypair::generate_ed25519();
        let dir = KadPeerDirectory::new(&keypair);
        dir.bootstrap(&[]);
    }

    #[test]
    fn local_peer_id_is_derived_from_keypair() {
        let keypair = identity::Keypair::generate_ed25519();
        let dir = KadPeerDirectory::new(&keypair);
        assert_eq!(dir.local_peer_id(), PeerId::from(keypair.public()));
    }

    #[test]
    fn find_neighbors_excludes_self_and_respects_alpha() {
        let keypair = identity::Keypair::generate_ed25519();
        let dir = KadPeerDirectory::new(&keypair);
        let self_id = dir.local_peer_id();
        for i in 0..5u16 {
            let peer_id = PeerId::random();
            let addr: SocketAddr = format!("127.0.0.1:{}", 10_000 + i).parse().unwrap();
            dir.learn(peer_id, addr);
        }
        dir.learn(self_id, "127.0.0.1:1".parse().unwrap());
        let neighbors = dir.find_neighbors(self_id, 3);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.iter().all(|p| p.id != self_id));
    }
}
