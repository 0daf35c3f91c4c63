// Node configuration: defaults plus environment overrides.

/// Default block interval, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Default alpha: neighbours contacted per broadcast.
pub const DEFAULT_ALPHA: usize = 3;

/// `refresh_tick` period, in seconds.
pub const REFRESH_TICK_SECS: u64 = 10;

/// Bind address default — `0.0.0.0` to allow peer discovery. Set
/// `LOOMCHAIN_BIND` to override (e.g. `127.0.0.1` for a loopback-only node).
pub const BIND_ADDRESS_DEFAULT: &str = "0.0.0.0";

pub struct NodeConfig {
    pub port: u16,
    pub bind_address: String,
    pub interval_secs: u64,
    pub alpha: usize,
    pub mine: bool,
    pub debug: bool,
    pub bootstrap_peers: Vec<std::net::SocketAddr>,
}

impl NodeConfig {
    pub fn new(port: u16) -> Self {
        NodeConfig {
            port,
            bind_address: bind_address(),
            interval_secs: interval_secs(),
            alpha: DEFAULT_ALPHA,
            mine: false,
            debug: false,
            bootstrap_peers: Vec::new(),
        }
    }
}

pub fn bind_address() -> String {
    let v = std::env::var("LOOMCHAIN_BIND").unwrap_or_else(|_| BIND_ADDRESS_DEFAULT.to_string());
    if v.trim().is_empty() {
        BIND_ADDRESS_DEFAULT.to_string()
    } else {
        v
    }
}

pub fn interval_secs() -> u64 {
    std::env::var("LOOMCHAIN_INTERVAL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_picks_up_defaults() {
        let cfg = NodeConfig::new(9000);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.alpha, DEFAULT_ALPHA);
        assert!(!cfg.mine);
    }
}
