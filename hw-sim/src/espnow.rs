//! UDP-based stand-in for ESP-NOW (spec §1 — out of scope, accessed only
//! through the `EspNowTransport` interface). Frames are JSON-wrapped with a
//! thin envelope carrying the logical src/dst MAC, mirroring the "JSON
//! envelope now, binary wire later" stance a real radio integration would
//! take before a production transport exists.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

use ftm_types::MacAddr;

use crate::traits::EspNowTransport;

/// Static mac -> UDP endpoint directory. Real ESP-NOW needs no such thing
/// (it addresses by MAC directly); this substrate runs over UDP loopback/LAN
/// and needs somewhere to send to.
#[derive(Debug, Clone, Default)]
pub struct AddressBook(pub HashMap<MacAddr, SocketAddr>);

impl AddressBook {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (MacAddr, SocketAddr)>) -> Self {
        Self(pairs.into_iter().collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    src: MacAddr,
    /// `MacAddr::ZERO` means broadcast.
    dst: MacAddr,
    payload: Vec<u8>,
}

/// Default simulated RSSI for a peer with no explicit entry.
const DEFAULT_RSSI_DBM: i8 = -65;

pub struct UdpEspNow {
    own_mac: MacAddr,
    socket: UdpSocket,
    address_book: AddressBook,
    peers: HashSet<MacAddr>,
    channel: u8,
    /// Simulated per-peer RSSI — real ESP-NOW reports this per received
    /// frame; UDP carries no such thing, so the substrate is configured with
    /// a fixed value per peer instead.
    peer_rssi: HashMap<MacAddr, i8>,
}

impl UdpEspNow {
    pub async fn bind(own_mac: MacAddr, address_book: AddressBook) -> std::io::Result<Self> {
        let own_addr = *address_book.0.get(&own_mac).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "own MAC not present in address book")
        })?;
        let socket = UdpSocket::bind(own_addr).await?;
        Ok(Self { own_mac, socket, address_book, peers: HashSet::new(), channel: 1, peer_rssi: HashMap::new() })
    }

    pub fn with_peer_rssi(mut self, mac: MacAddr, rssi_dbm: i8) -> Self {
        self.peer_rssi.insert(mac, rssi_dbm);
        self
    }
}

impl EspNowTransport for UdpEspNow {
    async fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
    }

    async fn add_peer(&mut self, mac: MacAddr) -> bool {
        if self.address_book.0.contains_key(&mac) {
            self.peers.insert(mac);
            true
        } else {
            warn!("espnow: add_peer failed, {mac} has no known endpoint");
            false
        }
    }

    async fn send(&mut self, mac: MacAddr, payload: &[u8]) -> bool {
        let Some(&addr) = self.address_book.0.get(&mac) else {
            warn!("espnow: send to unknown peer {mac}");
            return false;
        };
        let env = Envelope { src: self.own_mac, dst: mac, payload: payload.to_vec() };
        let Ok(bytes) = serde_json::to_vec(&env) else { return false };
        self.socket.send_to(&bytes, addr).await.is_ok()
    }

    async fn recv(&mut self, dur: Duration) -> Option<(MacAddr, Vec<u8>, i8)> {
        let mut buf = vec![0u8; 4096];
        match timeout(dur, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _src))) => match serde_json::from_slice::<Envelope>(&buf[..len]) {
                Ok(env) if env.dst == self.own_mac || env.dst.is_zero() => {
                    let rssi = self.peer_rssi.get(&env.src).copied().unwrap_or(DEFAULT_RSSI_DBM);
                    Some((env.src, env.payload, rssi))
                }
                Ok(_) => None,
                Err(e) => {
                    debug!("espnow: malformed frame: {e}");
                    None
                }
            },
            Ok(Err(e)) => {
                warn!("espnow: recv error: {e}");
                None
            }
            Err(_) => None, // timeout elapsed, no frame
        }
    }

    async fn broadcast(&mut self, payload: &[u8]) -> bool {
        let env = Envelope { src: self.own_mac, dst: MacAddr::ZERO, payload: payload.to_vec() };
        let Ok(bytes) = serde_json::to_vec(&env) else { return false };
        let mut any_ok = false;
        for (&mac, &addr) in self.address_book.0.iter() {
            if mac == self.own_mac {
                continue;
            }
            match self.socket.send_to(&bytes, addr).await {
                Ok(_) => any_ok = true,
                Err(e) => warn!("espnow: broadcast send to {mac} failed: {e}"),
            }
        }
        any_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::Duration;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
    }

    #[tokio::test]
    async fn unicast_roundtrip() {
        let mac_a = MacAddr([1, 0, 0, 0, 0, 0]);
        let mac_b = MacAddr([2, 0, 0, 0, 0, 0]);

        // Probe two ephemeral ports, then bind the real transports on them
        // (a small TOCTOU window, acceptable for a test helper).
        let sock_a = UdpSocket::bind(loopback(0)).await.unwrap();
        let sock_b = UdpSocket::bind(loopback(0)).await.unwrap();
        let addr_a = sock_a.local_addr().unwrap();
        let addr_b = sock_b.local_addr().unwrap();
        drop(sock_a);
        drop(sock_b);
        let book = AddressBook::from_pairs([(mac_a, addr_a), (mac_b, addr_b)]);

        let mut a = UdpEspNow::bind(mac_a, book.clone()).await.unwrap();
        let mut b = UdpEspNow::bind(mac_b, book).await.unwrap();

        assert!(a.add_peer(mac_b).await);
        assert!(a.send(mac_b, b"hello").await);

        let (src, payload, _rssi) = b.recv(Duration::from_millis(500)).await.unwrap();
        assert_eq!(src, mac_a);
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn add_peer_fails_for_unknown_mac() {
        let mac_a = MacAddr([1, 0, 0, 0, 0, 0]);
        let book = AddressBook::from_pairs([(mac_a, loopback(0))]);
        let sock = UdpSocket::bind(loopback(0)).await.unwrap();
        let addr = sock.local_addr().unwrap();
        drop(sock);
        let book = AddressBook::from_pairs([(mac_a, addr)]);
        let mut a = UdpEspNow::bind(mac_a, book).await.unwrap();

        let unknown = MacAddr([9, 9, 9, 9, 9, 9]);
        assert!(!a.add_peer(unknown).await);
    }
}
