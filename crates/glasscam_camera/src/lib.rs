//! Camera-facing request handler and server lifecycle wrapper.
//!
//! [`CameraServer`] implements the REST + gallery surface on top of a flat
//! photos directory; [`ServerManager`] owns the engine/handler pair and the
//! configure → start → stop → restart cycle.

mod events;
mod gallery;
mod handler;
mod manager;
mod metadata;

pub use events::{CaptureEvents, EventSink};
pub use handler::CameraServer;
pub use manager::ServerManager;
pub use metadata::PhotoMetadata;
