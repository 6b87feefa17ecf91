use std::sync::Arc;

use glasscam_camera::{CaptureEvents, ServerManager};
use glasscam_config::CamConfig;
use tracing::info;
use utils::init_tracing;

/// Stand-in capture target for the standalone daemon. In the companion app
/// the streaming session registers itself here and drives the wearable.
struct LoggingEvents;

impl CaptureEvents for LoggingEvents {
    fn capture_requested(&self) {
        info!(target: "glasscam", "Capture requested over HTTP");
    }

    fn recording_start_requested(&self) {
        info!(target: "glasscam", "Recording start requested over HTTP");
    }

    fn recording_stop_requested(&self) {
        info!(target: "glasscam", "Recording stop requested over HTTP");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = CamConfig::from_file_or_default("glasscam.conf");
    let port = cfg.port();

    let manager = ServerManager::with_config(cfg);
    manager.start_server(Arc::new(LoggingEvents), None).await?;

    match glasscam_net::best_ip() {
        Some(ip) => info!(target: "glasscam", url = %format!("http://{ip}:{port}"), "Gallery available"),
        None => info!(target: "glasscam", "No usable network interface; serving on localhost only"),
    }
    for addr in glasscam_net::all_ips() {
        tracing::debug!(target: "glasscam", %addr, "Local address");
    }

    tokio::signal::ctrl_c().await?;
    info!(target: "glasscam", "Shutting down");
    manager.stop_server().await;

    Ok(())
}
