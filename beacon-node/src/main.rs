//! main.rs — Beacon Node entry point
//!
//! Drives the beacon's wake cycle forever: scan, sweep every discovered
//! channel (ranging + floor dwell), pick the strongest gateways, send the
//! summary, sleep.

mod config;
mod floor_listener;
mod ftm_session;
mod ranger;
mod reporter;
mod stats;
mod sweep;

use std::time::Duration;

use clap::Parser;
use tracing::info;

use ftm_types::{GatewayRecord, MacAddr};
use hw_sim::{RadioConfig, SimFtmDriver, SimWifiScanner, SimWorld, UdpEspNow};

use config::BeaconConfig;

#[derive(Parser, Debug)]
#[command(name = "beacon-node", about = "FTM positioning beacon wake-cycle agent")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// UDP address this beacon binds as its simulated ESP-NOW endpoint
    #[arg(long, default_value = "127.0.0.1:6001")]
    own_addr: String,
    /// MAC this beacon identifies itself as on the simulated L2 fabric
    #[arg(long, default_value = "AA:AA:AA:AA:AA:01")]
    own_mac: String,
    /// One gateway endpoint to range against, `mac@addr`, repeatable
    #[arg(long = "gateway")]
    gateways: Vec<String>,
    /// Battery level reported in each summary (0-100), static in this
    /// simulated agent — a real device would read its fuel gauge
    #[arg(long, default_value = "100")]
    battery_level: u8,
}

fn parse_gateway(spec: &str) -> anyhow::Result<(MacAddr, std::net::SocketAddr)> {
    let (mac, addr) = spec
        .split_once('@')
        .ok_or_else(|| anyhow::anyhow!("gateway spec must be mac@addr, got {spec}"))?;
    Ok((mac.parse()?, addr.parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "beacon_node=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = BeaconConfig::load(&args.config)?;
    let own_mac: MacAddr = args.own_mac.parse()?;
    let own_addr: std::net::SocketAddr = args.own_addr.parse()?;

    info!("beacon {} starting, serial={}", own_mac, cfg.serial_number);

    let mut pairs = vec![(own_mac, own_addr)];
    let mut scan_results = Vec::new();
    let mut world = SimWorld::default();
    for spec in &args.gateways {
        let (mac, addr) = parse_gateway(spec)?;
        pairs.push((mac, addr));
        scan_results.push(GatewayRecord { mac, channel: 1, rssi_dbm: -55 });
        world.true_distance_m.insert(mac, 3.0);
    }

    let book = hw_sim::AddressBook::from_pairs(pairs);
    let mut transport = UdpEspNow::bind(own_mac, book).await?;
    let mut scanner = SimWifiScanner::new(scan_results);
    let mut ftm = SimFtmDriver::new(world, RadioConfig::default());

    loop {
        let outcome = sweep::run_sweep(&mut scanner, &mut ftm, &mut transport, &cfg).await;
        info!(
            "sweep complete: {} observations, floor={}, {} gateways heard",
            outcome.observations.len(),
            outcome.floor,
            outcome.gateways.len()
        );

        let delivered =
            reporter::send_summary(&mut transport, &outcome, &cfg.serial_number, args.battery_level, &cfg).await;
        if !delivered {
            info!("summary not delivered this cycle");
        }

        tokio::time::sleep(Duration::from_millis(cfg.sleep_duration_ms)).await;
    }
}
