use std::collections::HashMap;
use std::time::SystemTime;

use httpdate::fmt_http_date;
use serde_json::{Value, json};

const CRLF: &str = "\r\n";

/// Outbound response value. Built by the request handler (or one of the
/// convenience constructors) and framed by [`HttpResponse::to_bytes`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpResponse {
    pub fn new(status: u16, reason: &str) -> Self {
        Self {
            status,
            reason: reason.to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.set_header("Content-Type", content_type);
        self.body = Some(body);
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    // ---- convenience constructors ----

    pub fn ok(body: Vec<u8>, content_type: &str) -> Self {
        Self::new(200, "OK").with_body(body, content_type)
    }

    pub fn json(status: u16, reason: &str, value: &Value) -> Self {
        Self::new(status, reason).with_body(value.to_string().into_bytes(), "application/json")
    }

    /// `{"status":"success","data":{...}}`
    pub fn success(data: Value) -> Self {
        Self::json(200, "OK", &json!({ "status": "success", "data": data }))
    }

    /// `{"status":"error","message":"..."}`
    pub fn error(status: u16, reason: &str, message: &str) -> Self {
        Self::json(status, reason, &json!({ "status": "error", "message": message }))
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(400, "Bad Request", message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::error(404, "Not Found", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, "Internal Server Error", message)
    }

    pub fn too_many_requests() -> Self {
        Self::error(429, "Too Many Requests", "Rate limit exceeded")
    }

    pub fn payload_too_large() -> Self {
        Self::error(413, "Payload Too Large", "Request body too large")
    }

    /// Attach the permissive CORS header set.
    pub fn apply_cors(&mut self) {
        self.set_header("Access-Control-Allow-Origin", "*");
        self.set_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS");
        self.set_header("Access-Control-Allow-Headers", "Content-Type");
    }

    /// Frame the response for the wire.
    ///
    /// `Content-Length` is always written from the actual body length,
    /// overriding anything a handler may have set. Connections are
    /// request-per-connection, so every response closes.
    pub fn to_bytes(&self, server_name: &str) -> Vec<u8> {
        let body_len = self.body.as_ref().map(Vec::len).unwrap_or(0);
        let date = fmt_http_date(SystemTime::now());

        let mut head = String::with_capacity(128 + self.headers.len() * 32);
        head.push_str("HTTP/1.1 ");
        head.push_str(&self.status.to_string());
        head.push(' ');
        head.push_str(&self.reason);
        head.push_str(CRLF);

        write_header(&mut head, "Server", server_name);
        write_header(&mut head, "Date", &date);
        write_header(&mut head, "Content-Length", &body_len.to_string());

        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("connection")
            {
                continue;
            }
            write_header(&mut head, name, value);
        }

        write_header(&mut head, "Connection", "close");
        head.push_str(CRLF);

        let mut out = head.into_bytes();
        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
        out
    }
}

fn write_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str(CRLF);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::HttpResponse;

    #[test]
    fn to_bytes_sets_content_length_from_body() {
        let resp = HttpResponse::ok(b"hello".to_vec(), "text/plain");
        let bytes = resp.to_bytes("glasscam");
        let text = String::from_utf8(bytes).expect("expected utf8 head");
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn to_bytes_overrides_handler_content_length() {
        let resp = HttpResponse::ok(b"abc".to_vec(), "text/plain")
            .with_header("Content-Length", "999");
        let text = String::from_utf8(resp.to_bytes("glasscam")).expect("expected utf8 head");
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(!text.contains("999"));
    }

    #[test]
    fn bodyless_response_has_zero_content_length() {
        let resp = HttpResponse::new(200, "OK");
        let text = String::from_utf8(resp.to_bytes("glasscam")).expect("expected utf8 head");
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn success_envelope_shape() {
        let resp = HttpResponse::success(json!({ "n": 1 }));
        let body: serde_json::Value =
            serde_json::from_slice(resp.body.as_deref().expect("expected body"))
                .expect("expected json body");
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["n"], 1);
    }

    #[test]
    fn error_envelope_shape() {
        let resp = HttpResponse::not_found("no such file");
        assert_eq!(resp.status, 404);
        let body: serde_json::Value =
            serde_json::from_slice(resp.body.as_deref().expect("expected body"))
                .expect("expected json body");
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "no such file");
    }

    #[test]
    fn apply_cors_sets_three_headers() {
        let mut resp = HttpResponse::new(200, "OK");
        resp.apply_cors();
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            resp.header("Access-Control-Allow-Methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(
            resp.header("Access-Control-Allow-Headers"),
            Some("Content-Type")
        );
    }
}
