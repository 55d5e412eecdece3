//! main.rs — Gateway Hub entry point
//!
//! Wires the three gateway tasks (spec §5): an ingress loop that only
//! memcpys inbound frames into a bounded queue, a periodic floor
//! broadcaster, and a relay task that is the sole consumer of the ingress
//! queue and the sole writer of the Kalman table.

mod broadcaster;
mod config;
mod ingress;
mod kalman;
mod provisioning;
mod relay;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;

use ftm_types::MacAddr;
use hw_sim::UdpEspNow;

use config::GatewayConfig;

#[derive(Parser, Debug)]
#[command(name = "gateway-hub", about = "FTM positioning gateway relay agent")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// UDP address this gateway binds as its simulated ESP-NOW endpoint
    #[arg(long, default_value = "127.0.0.1:6101")]
    own_addr: String,
    /// MAC this gateway identifies itself as on the simulated L2 fabric
    #[arg(long, default_value = "BB:BB:BB:BB:BB:01")]
    own_mac: String,
    /// One peer endpoint (beacon or another gateway), `mac@addr`, repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,
}

fn parse_peer(spec: &str) -> anyhow::Result<(MacAddr, std::net::SocketAddr)> {
    let (mac, addr) = spec
        .split_once('@')
        .ok_or_else(|| anyhow::anyhow!("peer spec must be mac@addr, got {spec}"))?;
    Ok((mac.parse()?, addr.parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "gateway_hub=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = GatewayConfig::load(&args.config)?;
    let identity = provisioning::load_or_provision().await;
    let own_mac: MacAddr = args.own_mac.parse()?;
    let own_addr: std::net::SocketAddr = args.own_addr.parse()?;

    info!("gateway '{}' starting on floor {}, mac={}", identity.device_name, identity.floor, own_mac);

    let mut pairs = vec![(own_mac, own_addr)];
    for spec in &args.peers {
        pairs.push(parse_peer(spec)?);
    }
    let book = hw_sim::AddressBook::from_pairs(pairs);
    let transport = Arc::new(Mutex::new(UdpEspNow::bind(own_mac, book).await?));

    // Ingress polls in short bursts so it shares the one simulated radio
    // endpoint with the broadcaster without starving it (see ingress::spawn).
    let poll_interval = Duration::from_millis(cfg.broadcast_interval_ms.min(200));
    let rx = ingress::spawn(transport.clone(), cfg.ingress_queue_capacity, poll_interval);

    let floor = identity.floor as i8;
    let broadcast_interval_ms = cfg.broadcast_interval_ms;
    let broadcast_jitter_ms = cfg.broadcast_jitter_ms;
    tokio::spawn(broadcaster::run(transport, floor, broadcast_interval_ms, broadcast_jitter_ms));

    relay::run(rx, cfg).await;
    Ok(())
}
