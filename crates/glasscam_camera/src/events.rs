//! Fire-and-forget capture notifications.
//!
//! The streaming session registers itself here; the handler answers the
//! HTTP request without waiting for the capture to happen. The sink is
//! cleared before teardown, so a notification after the collaborator is
//! gone is a logged no-op.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Implemented by whatever performs the actual capture work.
pub trait CaptureEvents: Send + Sync {
    fn capture_requested(&self);
    fn recording_start_requested(&self);
    fn recording_stop_requested(&self);
}

/// Re-registrable callback handle. Holds a non-owning registration slot
/// rather than a weak reference.
pub struct EventSink {
    target: Mutex<Option<Arc<dyn CaptureEvents>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self {
            target: Mutex::new(None),
        }
    }

    pub fn register(&self, target: Arc<dyn CaptureEvents>) {
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = Some(target);
    }

    pub fn clear(&self) {
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn notify_capture(&self) {
        self.dispatch("capture", |t| t.capture_requested());
    }

    pub fn notify_recording_start(&self) {
        self.dispatch("start-recording", |t| t.recording_start_requested());
    }

    pub fn notify_recording_stop(&self) {
        self.dispatch("stop-recording", |t| t.recording_stop_requested());
    }

    fn dispatch(&self, what: &'static str, f: impl FnOnce(&dyn CaptureEvents) + Send + 'static) {
        let target = self
            .target
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match target {
            Some(target) => {
                tokio::spawn(async move { f(target.as_ref()) });
            }
            None => {
                debug!(target: "glasscam::camera", event = what, "No capture target registered");
            }
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
