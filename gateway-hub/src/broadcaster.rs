//! C7 — Gateway Floor Broadcaster. Independent periodic task: emits a 1-byte
//! layer-2 broadcast of this gateway's configured floor, jittered to avoid
//! deterministic collisions on a shared channel (spec §4.7).

use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use hw_sim::EspNowTransport;

/// Run forever, broadcasting `floor` every `interval_ms` ± `jitter_ms`. The
/// transport is shared with the ingress task; the lock is only held for the
/// broadcast call itself.
pub async fn run<T: EspNowTransport>(transport: Arc<Mutex<T>>, floor: i8, interval_ms: u64, jitter_ms: u64) -> ! {
    loop {
        let sleep_ms = next_interval_ms(interval_ms, jitter_ms);
        tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;

        let ok = transport.lock().await.broadcast(&[floor as u8]).await;
        debug!("broadcaster: floor={floor} sent={ok}");
    }
}

pub(crate) fn next_interval_ms(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let offset = rand::thread_rng().gen_range(0..=(2 * jitter_ms)) as i64 - jitter_ms as i64;
    (base_ms as i64 + offset).max(0) as u64
}
