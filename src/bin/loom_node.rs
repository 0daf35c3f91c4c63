// Process surface: `loom-node <port> [-b IP PORT]... [-m] [-D]`.
// Manual argv parsing — no subcommands, no flags beyond what's listed.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::*;
use loomchain::config::NodeConfig;
use loomchain::node::Node;

fn banner() {
    println!("{}", " _                          _           _       ".bright_cyan());
    println!("{}", "| |    ___   ___  _ __ ___ | |__   ___ (_)_ __  ".bright_cyan());
    println!("{}", "| |   / _ \\ / _ \\| '_ ` _ \\| '_ \\ / _ \\| | '_ \\ ".bright_cyan().bold());
    println!("{}", "| |__| (_) | (_) | | | | | | | | | (_) | | | | |".bright_cyan().bold());
    println!("{}", "|_____\\___/ \\___/|_| |_| |_|_| |_|\\___/|_|_| |_|".blue());
    println!();
    println!("{}", "          minimal proof-of-work p2p node          ".bright_green().bold());
    println!();
}

fn usage() -> ! {
    eprintln!("usage: loom-node <port> [-b IP PORT]... [-m] [-D]");
    std::process::exit(2);
}

fn parse_args() -> NodeConfig {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let port: u16 = args[0].parse().unwrap_or_else(|_| usage());
    let mut config = NodeConfig::new(port);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-b" | "--bootstrap" => {
                if i + 2 >= args.len() {
                    usage();
                }
                let ip = &args[i + 1];
                let bport = &args[i + 2];
                let addr: SocketAddr = format!("{ip}:{bport}").parse().unwrap_or_else(|_| usage());
                config.bootstrap_peers.push(addr);
                i += 3;
            }
            "-m" | "--mine" => {
                config.mine = true;
                i += 1;
            }
            "-D" | "--debug" => {
                config.debug = true;
                i += 1;
            }
            _ => usage(),
        }
    }

    config
}

#[tokio::main]
async fn main() {
    banner();
    let config = parse_args();

    println!(
        "{} port {} · mine {} · debug {} · {} bootstrap peer(s)",
        "[init]".bright_blue().bold(),
        config.port,
        config.mine,
        config.debug,
        config.bootstrap_peers.len()
    );

    let node = Node::new(config);
    node.bootstrap();

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_for_signal = stop_flag.clone();
    let shared_for_signal = node.shared();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stop_for_signal.store(true, Ordering::Relaxed);
        shared_for_signal.cancel_mining.store(true, Ordering::Relaxed);
    });

    if let Err(e) = node.listen(stop_flag).await {
        eprintln!("{} bind failed: {e}", "[p2p]".bright_red().bold());
        std::process::exit(1);
    }
    node.stop();
    println!("{} done", "[shutdown]".bright_red().bold());
}
