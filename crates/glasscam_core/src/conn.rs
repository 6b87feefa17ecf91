//! Per-connection request servicing.
//!
//! The server is request-per-connection: read one request, write one
//! response, close. Keep-alive is intentionally not implemented.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use glasscam_config::CamConfig;
use glasscam_http::{HttpResponse, parse_request};
use glasscam_limit::SlidingWindowLimiter;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::{ClientStream, RequestHandler};

// Hard cap on the request head; anything larger is rejected before parsing.
const MAX_HEAD_BYTES: usize = 64 * 1024;

pub(crate) enum ReadOutcome {
    Read(usize),
    Timeout,
}

pub(crate) async fn read_more(
    stream: &mut dyn ClientStream,
    buf: &mut BytesMut,
    timeout_dur: Duration,
) -> anyhow::Result<ReadOutcome> {
    let mut tmp = [0u8; 4096];
    match timeout(timeout_dur, stream.read(&mut tmp)).await {
        Ok(res) => {
            let n = res?;
            if n > 0 {
                buf.extend_from_slice(&tmp[..n]);
            }
            Ok(ReadOutcome::Read(n))
        }
        Err(_) => Ok(ReadOutcome::Timeout),
    }
}

fn find_head_end(buf: &BytesMut) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Scan the raw head for a Content-Length declaration. Invalid values are
/// treated as absent; the parser proper rejects nothing here.
fn declared_content_length(head: &str) -> usize {
    for line in head.split("\r\n").skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse::<usize>().unwrap_or(0);
        }
    }
    0
}

/// Read one request, apply policy, dispatch, write one response, done.
pub(crate) async fn serve_connection(
    stream: &mut dyn ClientStream,
    client_addr: SocketAddr,
    cfg: &Arc<CamConfig>,
    handler: &Arc<dyn RequestHandler>,
    limiter: &Arc<SlidingWindowLimiter>,
) -> anyhow::Result<()> {
    let idle_timeout = Duration::from_secs(cfg.idle_timeout_secs());
    let mut buf = BytesMut::new();

    // 1) Read until the end of the head section.
    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return send(stream, cfg, HttpResponse::bad_request("Request head too large")).await;
        }
        match read_more(stream, &mut buf, idle_timeout).await? {
            ReadOutcome::Timeout => {
                if buf.is_empty() {
                    return Ok(());
                }
                return send(
                    stream,
                    cfg,
                    HttpResponse::error(408, "Request Timeout", "Request timeout"),
                )
                .await;
            }
            ReadOutcome::Read(0) => return Ok(()),
            ReadOutcome::Read(_) => {}
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let body_start = head_end + 4;

    // 2) Read the Content-Length-bounded body, if one is declared.
    let content_length = declared_content_length(&head);
    if content_length as u64 > cfg.max_request_body_bytes() {
        warn!(
            target: "glasscam::core",
            content_length,
            max = cfg.max_request_body_bytes(),
            "Rejecting oversized request body"
        );
        return send(stream, cfg, HttpResponse::payload_too_large()).await;
    }
    while buf.len() < body_start + content_length {
        match read_more(stream, &mut buf, idle_timeout).await? {
            ReadOutcome::Timeout => {
                return send(
                    stream,
                    cfg,
                    HttpResponse::error(408, "Request Timeout", "Request timeout"),
                )
                .await;
            }
            ReadOutcome::Read(0) => return Ok(()),
            ReadOutcome::Read(_) => {}
        }
    }
    let body = if content_length > 0 {
        Some(buf[body_start..body_start + content_length].to_vec())
    } else {
        None
    };

    // 3) Parse. A malformed request line gets a 400, never a crash.
    let client = client_addr.ip().to_string();
    let request = match parse_request(&head, body, &client) {
        Ok(req) => req,
        Err(e) => {
            warn!(target: "glasscam::core", %client, error = %e, "Invalid request");
            return send(stream, cfg, HttpResponse::bad_request("Malformed request")).await;
        }
    };

    debug!(
        target: "glasscam::core",
        method = %request.method,
        path = %request.path,
        %client,
        "Parsed request"
    );

    // 4) CORS preflight short-circuits before the rate limiter.
    if request.method == "OPTIONS" && cfg.cors_enabled() {
        return send(stream, cfg, HttpResponse::new(200, "OK")).await;
    }

    // 5) Rate limit; a rejected request is not recorded and never reaches
    //    the handler.
    if !limiter.is_allowed(&client) {
        return send(stream, cfg, HttpResponse::too_many_requests()).await;
    }
    limiter.record_request(&client);

    // 6) Dispatch.
    let response = handler.handle_request(request).await;
    send(stream, cfg, response).await
}

async fn send(
    stream: &mut dyn ClientStream,
    cfg: &Arc<CamConfig>,
    mut response: HttpResponse,
) -> anyhow::Result<()> {
    if cfg.cors_enabled() {
        response.apply_cors();
    }
    stream.write_all(&response.to_bytes(cfg.server_name())).await?;
    stream.flush().await?;
    Ok(())
}
