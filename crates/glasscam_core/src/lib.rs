//! The HTTP protocol engine.
//!
//! Owns the listening socket, accepts connections, reads and parses one
//! request per connection, applies CORS and rate-limit policy, dispatches
//! to the pluggable [`RequestHandler`], frames the response, and closes.

mod conn;
mod server;

pub use server::HttpServer;

use async_trait::async_trait;
use glasscam_http::{HttpRequest, HttpResponse};
use tokio::io::{AsyncRead, AsyncWrite};

pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// The seam between the engine and whatever owns the routes.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_request(&self, request: HttpRequest) -> HttpResponse;
}
