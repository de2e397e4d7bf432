//! HTTP/1.x wire format: request parsing off a buffered byte stream and
//! response serialization.
//!
//! Only what a one-request-per-connection server needs is supported: a
//! request line, header block, and a body delimited by `Content-Length` or
//! chunked transfer coding. No pipelining, no upgrades, no HTTP/2.

use crate::error::HostError;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Read, Write};

/// Size caps applied while parsing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for WireLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpVersion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn parse(s: &str) -> Result<Self, HostError> {
        match s {
            "HTTP/1.0" => Ok(HttpVersion::Http10),
            "HTTP/1.1" => Ok(HttpVersion::Http11),
            other => Err(HostError::MalformedRequest(format!(
                "unsupported protocol version '{}'",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ParsedRequest
// ---------------------------------------------------------------------------

/// One request read off a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    /// The raw request target, query string included.
    pub target: String,
    /// The path component of the target (everything before `?`).
    pub path: String,
    pub version: HttpVersion,
    /// Canonicalized names; repeated headers joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(name))
            .map(String::as_str)
    }
}

/// Parse one request. The reader may have buffered bytes past the end of
/// the request; they are discarded along with the connection.
pub fn read_request<R: BufRead>(
    reader: &mut R,
    limits: &WireLimits,
) -> Result<ParsedRequest, HostError> {
    let mut budget = limits.max_header_bytes;

    // Tolerate stray CRLFs ahead of the request line.
    let request_line = loop {
        let line = read_line(reader, &mut budget)?
            .ok_or_else(|| malformed("connection closed before request line"))?;
        if !line.is_empty() {
            break line;
        }
    };

    let mut parts = request_line.splitn(3, ' ');
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) if !m.is_empty() && !t.is_empty() => (m, t, v),
        _ => return Err(malformed(format!("bad request line '{}'", request_line))),
    };
    if !method.bytes().all(is_token_byte) {
        return Err(malformed(format!("bad method '{}'", method)));
    }
    let version = HttpVersion::parse(version)?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = BTreeMap::new();
    loop {
        let line = read_line(reader, &mut budget)?
            .ok_or_else(|| malformed("connection closed inside header block"))?;
        if line.is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            return Err(malformed("obsolete header line folding"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("header line without ':' '{}'", line)))?;
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(malformed(format!("bad header name '{}'", name)));
        }
        insert_header(&mut headers, &canonical_header_name(name), value.trim());
    }

    let body = read_body(reader, &headers, limits)?;

    Ok(ParsedRequest {
        method: method.to_string(),
        target: target.to_string(),
        path,
        version,
        headers,
        body,
    })
}

fn read_body<R: BufRead>(
    reader: &mut R,
    headers: &BTreeMap<String, String>,
    limits: &WireLimits,
) -> Result<Vec<u8>, HostError> {
    if let Some(te) = headers.get("Transfer-Encoding") {
        let last = te.rsplit(',').next().unwrap_or("").trim();
        if last.eq_ignore_ascii_case("chunked") {
            return read_chunked(reader, limits);
        }
        return Err(malformed(format!("unsupported transfer encoding '{}'", te)));
    }
    let Some(length) = headers.get("Content-Length") else {
        return Ok(Vec::new());
    };
    let length: usize = length
        .trim()
        .parse()
        .map_err(|_| malformed(format!("bad Content-Length '{}'", length)))?;
    if length > limits.max_body_bytes {
        return Err(malformed(format!(
            "body of {} bytes exceeds limit of {}",
            length, limits.max_body_bytes
        )));
    }
    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .map_err(|e| HostError::io("read body", e))?;
    Ok(body)
}

/// Longest accepted chunk-size line, extensions included. Each line gets its
/// own budget; the body limit bounds how many chunks can arrive.
const MAX_CHUNK_LINE: usize = 4096;

fn read_chunked<R: BufRead>(reader: &mut R, limits: &WireLimits) -> Result<Vec<u8>, HostError> {
    let mut body = Vec::new();
    let mut trailer_budget = limits.max_header_bytes;
    loop {
        let mut line_budget = MAX_CHUNK_LINE;
        let line = read_line(reader, &mut line_budget)?
            .ok_or_else(|| malformed("connection closed inside chunked body"))?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| malformed(format!("bad chunk size '{}'", size_str)))?;
        if size == 0 {
            // Trailers are read and dropped.
            loop {
                let trailer = read_line(reader, &mut trailer_budget)?
                    .ok_or_else(|| malformed("connection closed inside trailers"))?;
                if trailer.is_empty() {
                    return Ok(body);
                }
            }
        }
        let start = body.len();
        let end = start
            .checked_add(size)
            .filter(|&total| total <= limits.max_body_bytes)
            .ok_or_else(|| {
                malformed(format!("chunked body exceeds limit of {}", limits.max_body_bytes))
            })?;
        body.resize(end, 0);
        reader
            .read_exact(&mut body[start..])
            .map_err(|e| HostError::io("read body", e))?;
        let mut crlf = [0u8; 2];
        reader
            .read_exact(&mut crlf)
            .map_err(|e| HostError::io("read body", e))?;
        if &crlf != b"\r\n" {
            return Err(malformed("chunk not terminated by CRLF"));
        }
    }
}

/// Read one CRLF- (or bare LF-) terminated line, charging its length to
/// `budget`. `Ok(None)` means the stream ended before any byte was read.
fn read_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<String>, HostError> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(*budget as u64 + 1)
        .read_until(b'\n', &mut buf)
        .map_err(|e| HostError::io("read request", e))?;
    if read == 0 {
        return Ok(None);
    }
    if read > *budget {
        return Err(malformed("header block too large"));
    }
    *budget -= read;
    if buf.last() != Some(&b'\n') {
        return Err(malformed("connection closed mid-line"));
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| malformed("non UTF-8 bytes in request head"))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn malformed(msg: impl Into<String>) -> HostError {
    HostError::MalformedRequest(msg.into())
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Canonical MIME header form: `content-type` becomes `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Insert a header, joining repeated names with `", "`.
pub fn insert_header(headers: &mut BTreeMap<String, String>, name: &str, value: &str) {
    headers
        .entry(name.to_string())
        .and_modify(|existing| {
            existing.push_str(", ");
            existing.push_str(value);
        })
        .or_insert_with(|| value.to_string());
}

/// Reject header names or values that would break the response framing.
pub fn validate_response_headers(headers: &BTreeMap<String, String>) -> Result<(), HostError> {
    for (name, value) in headers {
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(HostError::InvalidArgument(format!(
                "invalid response header name '{}'",
                name
            )));
        }
        if value.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(HostError::InvalidArgument(format!(
                "response header '{}' contains a line break",
                name
            )));
        }
        if name.eq_ignore_ascii_case("content-length") && value.trim().parse::<u64>().is_err() {
            return Err(HostError::InvalidArgument(format!(
                "Content-Length must be a byte count, got '{}'",
                value
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Serialize a complete response with `Connection: close`.
///
/// `Content-Length` always matches the body written. The caller's value is
/// kept only with `omit_body` (replies to `HEAD`), where it describes the
/// body a `GET` would have returned. 1xx, 204 and 304 replies carry neither
/// a length nor a body.
pub fn write_response<W: Write>(
    out: &mut W,
    version: HttpVersion,
    status: u16,
    headers: &BTreeMap<String, String>,
    body: &[u8],
    omit_body: bool,
) -> io::Result<()> {
    let bodyless = forbids_body(status);
    let mut head = format!("{} {} {}\r\n", version, status, reason_phrase(status));
    let mut has_length = false;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("connection") {
            continue;
        }
        if name.eq_ignore_ascii_case("content-length") {
            if bodyless || !omit_body {
                continue;
            }
            has_length = true;
        }
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !bodyless && !has_length {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    out.write_all(head.as_bytes())?;
    if !omit_body && !bodyless {
        out.write_all(body)?;
    }
    out.flush()
}

fn forbids_body(status: u16) -> bool {
    (100..200).contains(&status) || status == 204 || status == 304
}

/// Standard reason phrase, or an empty string for unregistered codes.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Content Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        418 => "I'm a teapot",
        422 => "Unprocessable Content",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}
