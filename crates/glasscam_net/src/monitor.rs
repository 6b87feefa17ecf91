//! Background network-path monitor.

use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Continuously-running path observer. `is_connected` reflects the last
/// probe result and is safe to read from any task.
pub struct NetworkMonitor {
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl NetworkMonitor {
    /// Probe once immediately, then keep probing in the background until
    /// dropped or [`stop`](Self::stop)ped.
    pub fn start() -> Self {
        let connected = Arc::new(AtomicBool::new(probe_path()));
        let shutdown = CancellationToken::new();

        let flag = connected.clone();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PROBE_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let usable = probe_path();
                        if usable != flag.swap(usable, Ordering::Relaxed) {
                            info!(
                                target: "glasscam::net",
                                connected = usable,
                                "Network path changed"
                            );
                        }
                    }
                }
            }
            debug!(target: "glasscam::net", "Network monitor stopped");
        });

        Self {
            connected,
            shutdown,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A UDP connect() resolves a route without sending a packet; failure
/// means no usable path (airplane mode, no default route).
fn probe_path() -> bool {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|sock| sock.connect("8.8.8.8:53"))
        .is_ok()
}
