//! Listener lifecycle: bind, accept loop, shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use glasscam_cache::ResponseCache;
use glasscam_config::CamConfig;
use glasscam_limit::SlidingWindowLimiter;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::RequestHandler;
use crate::conn::serve_connection;

struct EngineRuntime {
    shutdown: CancellationToken,
    tracker: TaskTracker,
    local_addr: SocketAddr,
}

/// The engine. One instance owns at most one listening socket at a time.
pub struct HttpServer {
    cfg: Arc<CamConfig>,
    handler: Arc<dyn RequestHandler>,
    limiter: Arc<SlidingWindowLimiter>,
    cache: Arc<ResponseCache>,
    runtime: Mutex<Option<EngineRuntime>>,
}

impl HttpServer {
    pub fn new(
        cfg: Arc<CamConfig>,
        handler: Arc<dyn RequestHandler>,
        limiter: Arc<SlidingWindowLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            cfg,
            handler,
            limiter,
            cache,
            runtime: Mutex::new(None),
        }
    }

    /// Bind the listener and spawn the accept loop. A bind failure (port in
    /// use, no permission) surfaces here and the engine does not enter the
    /// running state. Starting an already-running engine is a no-op.
    pub async fn start(&self) -> anyhow::Result<()> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            info!(target: "glasscam::core", "Server already running; start is a no-op");
            return Ok(());
        }

        let bind_addr = format!("0.0.0.0:{}", self.cfg.port());
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(l) => {
                info!(target: "glasscam::core", listen = %bind_addr, "Bind() successful");
                l
            }
            Err(e) => {
                error!(
                    target: "glasscam::core",
                    listen = %bind_addr,
                    error = ?e,
                    "Failed to bind listener"
                );
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        let cfg = self.cfg.clone();
        let handler = self.handler.clone();
        let limiter = self.limiter.clone();
        let token = shutdown.clone();
        let conn_tracker = tracker.clone();
        tracker.spawn(async move {
            accept_loop(listener, cfg, handler, limiter, token, conn_tracker).await;
        });

        *runtime = Some(EngineRuntime {
            shutdown,
            tracker,
            local_addr,
        });

        info!(target: "glasscam::core", listen = %local_addr, "Camera server listening");
        Ok(())
    }

    /// Cancel the listener and every tracked connection, then clear the
    /// response cache. Idempotent: stopping a stopped engine is a no-op.
    pub async fn stop(&self) {
        let Some(rt) = self.runtime.lock().await.take() else {
            debug!(target: "glasscam::core", "Stop called while not running; ignoring");
            return;
        };

        rt.shutdown.cancel();
        rt.tracker.close();
        rt.tracker.wait().await;
        self.cache.clear();

        info!(target: "glasscam::core", listen = %rt.local_addr, "Camera server stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    /// The bound address while running (useful when the configured port is 0).
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.runtime.lock().await.as_ref().map(|rt| rt.local_addr)
    }
}

async fn accept_loop(
    listener: TcpListener,
    cfg: Arc<CamConfig>,
    handler: Arc<dyn RequestHandler>,
    limiter: Arc<SlidingWindowLimiter>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    let semaphore = Arc::new(Semaphore::new(cfg.max_connections() as usize));

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                // Transient accept errors must not take the listener down.
                error!(target: "glasscam::core", error = ?e, "Failed to accept connection");
                continue;
            }
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };

        debug!(
            target: "glasscam::core",
            client_addr = %addr,
            available_permits = semaphore.available_permits(),
            "Connection accepted"
        );

        let cfg = cfg.clone();
        let handler = handler.clone();
        let limiter = limiter.clone();
        let token = shutdown.clone();

        tracker.spawn(async move {
            let _permit = permit;
            let mut stream = stream;

            let result = tokio::select! {
                _ = token.cancelled() => Ok(()),
                res = serve_connection(&mut stream, addr, &cfg, &handler, &limiter) => res,
            };

            // A failed send tears down this connection only.
            if let Err(e) = result {
                warn!(
                    target: "glasscam::core",
                    client_addr = %addr,
                    error = ?e,
                    "Error while handling connection"
                );
            }
        });
    }

    debug!(target: "glasscam::core", "Accept loop exited");
}
