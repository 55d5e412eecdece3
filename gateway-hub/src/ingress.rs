//! C8 — Gateway Ingress. Distinguishes inbound layer-2 payload shapes by
//! length and hands `BeaconSummary` frames to the relay task over a bounded,
//! drop-newest queue (spec §4.8, §5 — "must not block; only memcpy + enqueue").

use std::sync::Arc;
use std::time::Duration;

use ftm_types::BEACON_SUMMARY_WIRE_LEN;
use hw_sim::EspNowTransport;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Spawn the ingress loop; returns the receiving half of the bounded queue
/// the relay task drains.
///
/// The transport is shared with the broadcaster task (both need `&mut`
/// access to the one simulated radio endpoint), so ingress polls in short
/// bursts rather than holding the lock across one long `recv` wait — the
/// real interrupt-driven ingress path has no such constraint, but this
/// substrate's one UDP socket does.
pub fn spawn<T>(transport: Arc<Mutex<T>>, capacity: usize, poll_interval: Duration) -> mpsc::Receiver<Vec<u8>>
where
    T: EspNowTransport + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(async move {
        loop {
            let received = {
                let mut guard = transport.lock().await;
                guard.recv(poll_interval).await
            };
            if let Some((_src, payload, _rssi)) = received {
                dispatch(payload, &tx);
            }
        }
    });
    rx
}

pub(crate) fn dispatch(payload: Vec<u8>, tx: &mpsc::Sender<Vec<u8>>) {
    match payload.len() {
        1 => {
            // A peer gateway's floor broadcast; it has nothing to do with
            // ingress relay and is dropped here.
        }
        n if n == BEACON_SUMMARY_WIRE_LEN => {
            if tx.try_send(payload).is_err() {
                warn!("ingress: queue full, dropping beacon summary");
            }
        }
        n => warn!("ingress: unrecognized payload length {n}, dropping"),
    }
}
