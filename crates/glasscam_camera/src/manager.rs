//! Lifecycle wrapper around the engine/handler pair.
//!
//! An explicitly-constructed service object owned by the composition root;
//! it holds at most one running server instance at a time and preserves the
//! event target and photos directory across a restart.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use glasscam_cache::ResponseCache;
use glasscam_config::CamConfig;
use glasscam_core::HttpServer;
use glasscam_limit::SlidingWindowLimiter;
use glasscam_net::NetworkMonitor;
use tracing::info;

use crate::events::{CaptureEvents, EventSink};
use crate::handler::CameraServer;

struct ActiveServer {
    engine: Arc<HttpServer>,
    camera: Arc<CameraServer>,
    sink: Arc<EventSink>,
    monitor: Arc<NetworkMonitor>,
}

struct ManagerState {
    cfg: Arc<CamConfig>,
    photos_dir: Option<PathBuf>,
    events_target: Option<Arc<dyn CaptureEvents>>,
    active: Option<ActiveServer>,
}

pub struct ServerManager {
    state: tokio::sync::Mutex<ManagerState>,
}

impl ServerManager {
    pub fn new() -> Self {
        Self::with_config(CamConfig::default())
    }

    pub fn with_config(cfg: CamConfig) -> Self {
        Self {
            state: tokio::sync::Mutex::new(ManagerState {
                cfg: Arc::new(cfg),
                photos_dir: None,
                events_target: None,
                active: None,
            }),
        }
    }

    /// Store a configuration for the next start. A running server keeps its
    /// current configuration until restarted.
    pub async fn configure(&self, cfg: CamConfig) {
        self.state.lock().await.cfg = Arc::new(cfg);
    }

    /// Start the server. Already running is a no-op that reports success.
    pub async fn start_server(
        &self,
        events: Arc<dyn CaptureEvents>,
        photos_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.active.is_some() {
            info!(target: "glasscam::manager", "Server already running; start is a no-op");
            return Ok(());
        }

        let dir = photos_dir
            .or_else(|| state.photos_dir.clone())
            .unwrap_or_else(|| PathBuf::from(state.cfg.photos_dir()));

        start_locked(&mut state, events, dir).await
    }

    /// Tear down the running server, if any. The event sink is cleared
    /// before teardown so late notifications are no-ops.
    pub async fn stop_server(&self) {
        let mut state = self.state.lock().await;
        stop_locked(&mut state).await;
    }

    /// Stop/start cycle preserving the prior event target (unless a new one
    /// is supplied) and the prior photos directory. Does nothing when the
    /// server is not running.
    pub async fn restart_server(
        &self,
        events: Option<Arc<dyn CaptureEvents>>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.active.is_none() {
            return Ok(());
        }

        let target = match events.or_else(|| state.events_target.clone()) {
            Some(t) => t,
            None => return Ok(()),
        };
        let dir = state
            .photos_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(state.cfg.photos_dir()));

        stop_locked(&mut state).await;
        start_locked(&mut state, target, dir).await
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Bound address of the running engine, for URL display and tests.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let engine = {
            let state = self.state.lock().await;
            state.active.as_ref().map(|a| a.engine.clone())
        };
        match engine {
            Some(engine) => engine.local_addr().await,
            None => None,
        }
    }

    // ---- delegated mutations; all no-ops when stopped ----

    pub async fn save_photo(&self, bytes: &[u8], name: Option<&str>) -> Option<PathBuf> {
        let camera = self.active_camera().await?;
        camera.save_photo(bytes, name).await
    }

    pub async fn save_video(&self, src: &std::path::Path, name: Option<&str>) -> Option<PathBuf> {
        let camera = self.active_camera().await?;
        camera.save_video(src, name).await
    }

    pub async fn update_latest_photo(&self, bytes: Vec<u8>) {
        if let Some(camera) = self.active_camera().await {
            camera.update_latest_photo(bytes);
        }
    }

    async fn active_camera(&self) -> Option<Arc<CameraServer>> {
        let state = self.state.lock().await;
        state.active.as_ref().map(|a| a.camera.clone())
    }
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn start_locked(
    state: &mut ManagerState,
    events: Arc<dyn CaptureEvents>,
    photos_dir: PathBuf,
) -> anyhow::Result<()> {
    let cfg = state.cfg.clone();

    let sink = Arc::new(EventSink::new());
    sink.register(events.clone());

    let limiter = Arc::new(SlidingWindowLimiter::new(
        cfg.rate_limit_max_requests(),
        cfg.rate_limit_window_secs(),
    ));
    let cache = Arc::new(ResponseCache::new(cfg.cache_max_entries()));
    let monitor = Arc::new(NetworkMonitor::start());

    let camera = Arc::new(CameraServer::new(
        cfg.clone(),
        photos_dir.clone(),
        cache.clone(),
        sink.clone(),
        monitor.clone(),
    ));
    let engine = Arc::new(HttpServer::new(cfg, camera.clone(), limiter, cache));

    if let Err(e) = engine.start().await {
        monitor.stop();
        return Err(e);
    }

    state.photos_dir = Some(photos_dir);
    state.events_target = Some(events);
    state.active = Some(ActiveServer {
        engine,
        camera,
        sink,
        monitor,
    });

    Ok(())
}

async fn stop_locked(state: &mut ManagerState) {
    let Some(active) = state.active.take() else {
        return;
    };
    active.sink.clear();
    active.engine.stop().await;
    active.monitor.stop();
    info!(target: "glasscam::manager", "Server instance released");
}
