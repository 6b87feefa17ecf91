//! The camera request handler: REST + gallery API over a flat photos
//! directory. Performs no capture itself; capture requests are forwarded
//! through the [`EventSink`] and answered immediately.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use chrono::Utc;
use glasscam_cache::ResponseCache;
use glasscam_config::CamConfig;
use glasscam_core::RequestHandler;
use glasscam_http::{HttpRequest, HttpResponse, content_type_for};
use glasscam_net::NetworkMonitor;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::events::EventSink;
use crate::gallery::{GALLERY_HTML, scan_media};
use crate::metadata::PhotoMetadata;

const DEFAULT_GALLERY_LIMIT: usize = 50;
const DEFAULT_CLEANUP_AGE_HOURS: u64 = 24;

pub struct CameraServer {
    cfg: Arc<CamConfig>,
    photos_dir: PathBuf,
    cache: Arc<ResponseCache>,
    events: Arc<EventSink>,
    monitor: Arc<NetworkMonitor>,
    latest_photo: Mutex<Option<Vec<u8>>>,
    started_at: Instant,
}

impl CameraServer {
    pub fn new(
        cfg: Arc<CamConfig>,
        photos_dir: PathBuf,
        cache: Arc<ResponseCache>,
        events: Arc<EventSink>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            cfg,
            photos_dir,
            cache,
            events,
            monitor,
            latest_photo: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    pub fn photos_dir(&self) -> &Path {
        &self.photos_dir
    }

    // ---- host-app mutations ----

    /// Persist captured photo bytes. Without a name, files are stamped
    /// `photo_<epochMillis>.jpg`. Errors are logged and yield `None`.
    pub async fn save_photo(&self, bytes: &[u8], name: Option<&str>) -> Option<PathBuf> {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("photo_{}.jpg", Utc::now().timestamp_millis()),
        };
        if !is_safe_filename(&name) {
            warn!(target: "glasscam::camera", file = %name, "Refusing unsafe photo name");
            return None;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.photos_dir).await {
            warn!(target: "glasscam::camera", error = ?e, "Cannot create photos directory");
            return None;
        }

        let path = self.photos_dir.join(&name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
                info!(target: "glasscam::camera", file = %name, bytes = bytes.len(), "Photo saved");
                // Stale cached bytes for an overwritten name must not win.
                self.cache.remove(&name);
                Some(path)
            }
            Err(e) => {
                warn!(target: "glasscam::camera", file = %name, error = ?e, "Photo write failed");
                None
            }
        }
    }

    /// Move a finished recording from a local temp path into the photos
    /// directory. Default name: `video_<epochMillis>.mp4`.
    pub async fn save_video(&self, src: &Path, name: Option<&str>) -> Option<PathBuf> {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("video_{}.mp4", Utc::now().timestamp_millis()),
        };
        if !is_safe_filename(&name) {
            warn!(target: "glasscam::camera", file = %name, "Refusing unsafe video name");
            return None;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.photos_dir).await {
            warn!(target: "glasscam::camera", error = ?e, "Cannot create photos directory");
            return None;
        }

        let dest = self.photos_dir.join(&name);
        match tokio::fs::copy(src, &dest).await {
            Ok(_) => {
                info!(target: "glasscam::camera", file = %name, "Video saved");
                self.cache.remove(&name);
                Some(dest)
            }
            Err(e) => {
                warn!(target: "glasscam::camera", file = %name, error = ?e, "Video copy failed");
                None
            }
        }
    }

    /// Update the in-memory "latest" photo without touching disk.
    pub fn update_latest_photo(&self, bytes: Vec<u8>) {
        *self.latest_photo.lock().unwrap_or_else(|e| e.into_inner()) = Some(bytes);
    }

    // ---- routes ----

    async fn route_root(&self) -> HttpResponse {
        HttpResponse::ok(GALLERY_HTML.as_bytes().to_vec(), "text/html; charset=utf-8")
    }

    fn route_take_picture(&self) -> HttpResponse {
        self.events.notify_capture();
        HttpResponse::success(json!({ "message": "Capture requested" }))
    }

    fn route_start_recording(&self) -> HttpResponse {
        self.events.notify_recording_start();
        HttpResponse::success(json!({ "message": "Recording start requested" }))
    }

    fn route_stop_recording(&self) -> HttpResponse {
        self.events.notify_recording_stop();
        HttpResponse::success(json!({ "message": "Recording stop requested" }))
    }

    async fn route_latest_photo(&self) -> HttpResponse {
        let in_memory = self
            .latest_photo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(bytes) = in_memory {
            return HttpResponse::ok(bytes, "image/jpeg");
        }

        match scan_media(&self.photos_dir).await {
            Ok(files) => match files.first() {
                Some(newest) => self.serve_file_bytes(&newest.name, false).await,
                None => HttpResponse::not_found("No photos available"),
            },
            Err(e) => HttpResponse::internal_error(&format!("Cannot read photos directory: {e}")),
        }
    }

    async fn route_gallery(&self, request: &HttpRequest) -> HttpResponse {
        let offset = parse_usize(request.query_param("offset")).unwrap_or(0);
        let limit = parse_usize(request.query_param("limit")).unwrap_or(DEFAULT_GALLERY_LIMIT);

        let files = match scan_media(&self.photos_dir).await {
            Ok(files) => files,
            Err(e) => {
                return HttpResponse::internal_error(&format!(
                    "Cannot read photos directory: {e}"
                ));
            }
        };

        let total_count = files.len();
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        let items: Vec<PhotoMetadata> = files
            .iter()
            .skip(offset)
            .take(limit)
            .map(|f| PhotoMetadata::from_stat(&f.name, f.size, f.modified))
            .collect();

        HttpResponse::success(json!({
            "items": items,
            "total_count": total_count,
            "total_size": total_size,
            "offset": offset,
            "limit": limit,
            "has_more": offset + limit < total_count,
        }))
    }

    async fn route_photo(&self, request: &HttpRequest, as_download: bool) -> HttpResponse {
        let Some(name) = request.query_param("file") else {
            return HttpResponse::bad_request("Missing file parameter");
        };
        if !is_safe_filename(name) {
            warn!(target: "glasscam::camera", file = %name, "Rejected unsafe file parameter");
            return HttpResponse::bad_request("Invalid file name");
        }
        self.serve_file_bytes(name, as_download).await
    }

    async fn serve_file_bytes(&self, name: &str, as_download: bool) -> HttpResponse {
        let bytes = match self.cache.get(name) {
            Some(bytes) => {
                debug!(target: "glasscam::camera", file = %name, "Cache hit");
                bytes
            }
            None => {
                let path = self.photos_dir.join(name);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        let ttl = match self.cfg.cache_default_ttl_millis() {
                            0 => None,
                            ms => Some(ms),
                        };
                        self.cache.put(name, bytes.clone(), ttl);
                        bytes
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return HttpResponse::not_found(&format!("File not found: {name}"));
                    }
                    Err(e) => {
                        return HttpResponse::internal_error(&format!("Cannot read file: {e}"));
                    }
                }
            }
        };

        let mut response = HttpResponse::ok(bytes, &content_type_for(name));
        if as_download {
            response.set_header(
                "Content-Disposition",
                &format!("attachment; filename=\"{name}\""),
            );
        }
        response
    }

    async fn route_status(&self) -> HttpResponse {
        let photo_count = match scan_media(&self.photos_dir).await {
            Ok(files) => files.len(),
            Err(_) => 0,
        };

        let port = self.cfg.port();
        let server_url = match glasscam_net::best_ip() {
            Some(ip) => format!("http://{ip}:{port}"),
            None => format!("http://localhost:{port}"),
        };

        HttpResponse::success(json!({
            "server_name": self.cfg.server_name(),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "photo_count": photo_count,
            "photos_dir": self.photos_dir.display().to_string(),
            "server_url": server_url,
            "network_connected": self.monitor.is_connected(),
        }))
    }

    fn route_health(&self) -> HttpResponse {
        HttpResponse::success(json!({ "healthy": true }))
    }

    async fn route_cleanup(&self, request: &HttpRequest) -> HttpResponse {
        let max_age_hours =
            parse_u64(request.query_param("max_age_hours")).unwrap_or(DEFAULT_CLEANUP_AGE_HOURS);
        let max_age = Duration::from_secs(max_age_hours.saturating_mul(3600));
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let files = match scan_media(&self.photos_dir).await {
            Ok(files) => files,
            Err(e) => {
                return HttpResponse::internal_error(&format!(
                    "Cannot read photos directory: {e}"
                ));
            }
        };

        let mut deleted = 0usize;
        for file in files {
            if file.modified >= cutoff {
                continue;
            }
            let path = self.photos_dir.join(&file.name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    self.cache.remove(&file.name);
                    deleted += 1;
                }
                Err(e) => {
                    warn!(target: "glasscam::camera", file = %file.name, error = ?e, "Delete failed");
                }
            }
        }

        info!(
            target: "glasscam::camera",
            deleted,
            max_age_hours,
            "Cleanup finished"
        );
        HttpResponse::success(json!({
            "deleted_count": deleted,
            "max_age_hours": max_age_hours,
        }))
    }
}

#[async_trait]
impl RequestHandler for CameraServer {
    async fn handle_request(&self, request: HttpRequest) -> HttpResponse {
        match request.path.as_str() {
            "/" => self.route_root().await,
            "/api/take-picture" => self.route_take_picture(),
            "/api/start-recording" => self.route_start_recording(),
            "/api/stop-recording" => self.route_stop_recording(),
            "/api/latest-photo" => self.route_latest_photo().await,
            "/api/gallery" => self.route_gallery(&request).await,
            "/api/photo" => self.route_photo(&request, false).await,
            "/api/download" => self.route_photo(&request, true).await,
            "/api/status" => self.route_status().await,
            "/api/health" => self.route_health(),
            "/api/cleanup" => self.route_cleanup(&request).await,
            other => HttpResponse::not_found(&format!("No route for {other}")),
        }
    }
}

/// The sole defense against path traversal: a served name must be a plain
/// file name. Parent references, separators of either flavor, and absolute
/// paths are all rejected.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !Path::new(name).is_absolute()
}

fn parse_usize(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|v| v.parse().ok())
}

fn parse_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use glasscam_cache::ResponseCache;
    use glasscam_config::CamConfig;
    use glasscam_core::RequestHandler;
    use glasscam_http::HttpRequest;
    use glasscam_net::NetworkMonitor;
    use serde_json::Value;
    use tempfile::TempDir;

    use super::{CameraServer, is_safe_filename};
    use crate::events::EventSink;

    fn request(path: &str, query: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            method: "GET".to_string(),
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: HashMap::new(),
            body: None,
            client_addr: "127.0.0.1".to_string(),
        }
    }

    fn camera(dir: &TempDir) -> CameraServer {
        CameraServer::new(
            Arc::new(CamConfig::default()),
            PathBuf::from(dir.path()),
            Arc::new(ResponseCache::new(8)),
            Arc::new(EventSink::new()),
            Arc::new(NetworkMonitor::start()),
        )
    }

    fn body_json(resp: &glasscam_http::HttpResponse) -> Value {
        serde_json::from_slice(resp.body.as_deref().expect("expected body"))
            .expect("expected json body")
    }

    #[test]
    fn unsafe_filenames_are_rejected() {
        assert!(is_safe_filename("photo_1.jpg"));
        assert!(!is_safe_filename("../../etc/passwd"));
        assert!(!is_safe_filename("a/b"));
        assert!(!is_safe_filename("a\\b"));
        assert!(!is_safe_filename("/etc/passwd"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn photo_route_rejects_traversal_attempts() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        for candidate in ["../../etc/passwd", "a/b", "..\\x.jpg"] {
            let resp = cam
                .handle_request(request("/api/photo", &[("file", candidate)]))
                .await;
            assert_eq!(resp.status, 400, "expected 400 for {candidate}");
            assert_eq!(body_json(&resp)["status"], "error");
        }

        let resp = cam.handle_request(request("/api/photo", &[])).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn photo_route_serves_bytes_with_mime() {
        let dir = TempDir::new().expect("expected tempdir");
        std::fs::write(dir.path().join("a.jpg"), b"jpegbytes").expect("expected write");
        let cam = camera(&dir);

        let resp = cam
            .handle_request(request("/api/photo", &[("file", "a.jpg")]))
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("Content-Type"), Some("image/jpeg"));
        assert_eq!(resp.body.as_deref(), Some(b"jpegbytes".as_ref()));

        let missing = cam
            .handle_request(request("/api/photo", &[("file", "nope.jpg")]))
            .await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn download_route_adds_attachment_disposition() {
        let dir = TempDir::new().expect("expected tempdir");
        std::fs::write(dir.path().join("a.jpg"), b"x").expect("expected write");
        let cam = camera(&dir);

        let resp = cam
            .handle_request(request("/api/download", &[("file", "a.jpg")]))
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.header("Content-Disposition"),
            Some("attachment; filename=\"a.jpg\"")
        );
    }

    #[tokio::test]
    async fn gallery_paginates_newest_first() {
        let dir = TempDir::new().expect("expected tempdir");
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("p{i}.jpg")), b"x").expect("expected write");
            std::thread::sleep(Duration::from_millis(10));
        }
        // Non-media files are invisible to the gallery.
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("expected write");
        let cam = camera(&dir);

        let resp = cam
            .handle_request(request("/api/gallery", &[("offset", "0"), ("limit", "3")]))
            .await;
        let data = body_json(&resp)["data"].clone();
        assert_eq!(data["total_count"], 5);
        assert_eq!(data["has_more"], true);
        let items = data["items"].as_array().expect("expected items");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["name"], "p4.jpg");
        assert_eq!(items[2]["name"], "p2.jpg");

        let resp = cam
            .handle_request(request("/api/gallery", &[("offset", "3"), ("limit", "3")]))
            .await;
        let data = body_json(&resp)["data"].clone();
        assert_eq!(data["items"].as_array().expect("expected items").len(), 2);
        assert_eq!(data["has_more"], false);
    }

    #[tokio::test]
    async fn save_photo_uses_timestamp_name_and_appears_in_gallery() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        let path = cam.save_photo(b"bytes", None).await.expect("expected path");
        let name = path
            .file_name()
            .expect("expected file name")
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("photo_"));
        assert!(name.ends_with(".jpg"));
        name["photo_".len()..name.len() - ".jpg".len()]
            .parse::<u64>()
            .expect("expected epoch millis in name");

        let resp = cam.handle_request(request("/api/gallery", &[])).await;
        let data = body_json(&resp)["data"].clone();
        assert_eq!(data["total_count"], 1);
        assert_eq!(data["items"][0]["name"], name.as_str());
    }

    #[tokio::test]
    async fn latest_photo_prefers_memory_then_disk_then_404() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        let resp = cam.handle_request(request("/api/latest-photo", &[])).await;
        assert_eq!(resp.status, 404);

        std::fs::write(dir.path().join("disk.jpg"), b"from-disk").expect("expected write");
        let resp = cam.handle_request(request("/api/latest-photo", &[])).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_deref(), Some(b"from-disk".as_ref()));

        cam.update_latest_photo(b"from-memory".to_vec());
        let resp = cam.handle_request(request("/api/latest-photo", &[])).await;
        assert_eq!(resp.body.as_deref(), Some(b"from-memory".as_ref()));
    }

    #[tokio::test]
    async fn cleanup_deletes_aged_files_and_reports_count() {
        let dir = TempDir::new().expect("expected tempdir");
        std::fs::write(dir.path().join("old1.jpg"), b"x").expect("expected write");
        std::fs::write(dir.path().join("old2.jpg"), b"x").expect("expected write");
        let cam = camera(&dir);

        // Everything on disk is older than a zero-hour cutoff.
        std::thread::sleep(Duration::from_millis(20));
        let resp = cam
            .handle_request(request("/api/cleanup", &[("max_age_hours", "0")]))
            .await;
        let data = body_json(&resp)["data"].clone();
        assert_eq!(data["deleted_count"], 2);

        let resp = cam.handle_request(request("/api/gallery", &[])).await;
        assert_eq!(body_json(&resp)["data"]["total_count"], 0);
    }

    #[tokio::test]
    async fn status_uptime_is_monotonic() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        let first = body_json(&cam.handle_request(request("/api/status", &[])).await)["data"]
            ["uptime_secs"]
            .as_u64()
            .expect("expected uptime");
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second = body_json(&cam.handle_request(request("/api/status", &[])).await)["data"]
            ["uptime_secs"]
            .as_u64()
            .expect("expected uptime");
        assert!(second >= first);
        assert!(second >= 1);
    }

    #[tokio::test]
    async fn health_and_unknown_routes() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        let resp = cam.handle_request(request("/api/health", &[])).await;
        assert_eq!(resp.status, 200);
        assert_eq!(body_json(&resp)["data"]["healthy"], true);

        let resp = cam.handle_request(request("/api/unknown", &[])).await;
        assert_eq!(resp.status, 404);
        let message = body_json(&resp)["message"]
            .as_str()
            .expect("expected message")
            .to_string();
        assert!(message.contains("/api/unknown"));
    }

    #[tokio::test]
    async fn root_serves_gallery_page() {
        let dir = TempDir::new().expect("expected tempdir");
        let cam = camera(&dir);

        let resp = cam.handle_request(request("/", &[])).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("Content-Type"), Some("text/html; charset=utf-8"));
        let html = String::from_utf8(resp.body.expect("expected body")).expect("expected utf8");
        assert!(html.contains("/api/gallery"));
        assert!(html.contains("Error loading gallery"));
    }
}
