use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
}

/// One parsed inbound request. Constructed by [`parse_request`], read-only
/// afterward; lives for the duration of a single connection.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    /// Percent-decoded URI path, query string stripped.
    pub path: String,
    /// Query parameters; on duplicate keys the last occurrence wins.
    pub query: HashMap<String, String>,
    /// Header names are lower-cased for lookup consistency.
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    /// Identifying address string of the originating client.
    pub client_addr: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Parse the head section (request line + headers) of an HTTP/1.1 request.
///
/// `head` is everything up to (not including) the `\r\n\r\n` terminator.
/// The body, if any, is attached verbatim by the caller once it has been
/// read off the wire.
pub fn parse_request(
    head: &str,
    body: Option<Vec<u8>>,
    client_addr: &str,
) -> Result<HttpRequest, ParseError> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| ParseError::MalformedRequestLine(request_line.to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| ParseError::MalformedRequestLine(request_line.to_string()))?;

    let (raw_path, raw_query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };

    let path = decode_or_raw(raw_path);
    let query = raw_query.map(parse_query).unwrap_or_default();

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        headers.insert(
            name.trim().to_ascii_lowercase(),
            value.trim().to_string(),
        );
    }

    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        headers,
        body,
        client_addr: client_addr.to_string(),
    })
}

/// Split a query string on `&`, each pair at the first `=`, and
/// percent-decode both sides. Last occurrence wins on duplicate keys.
fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        out.insert(decode_or_raw(key), decode_or_raw(value));
    }
    out
}

fn decode_or_raw(token: &str) -> String {
    match urlencoding::decode(token) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => token.to_string(),
    }
}
