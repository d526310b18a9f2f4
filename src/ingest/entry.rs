//! Decoding of Caddy's structured (JSON) access-log lines
//!
//! Decoding is purely structural: values are copied out as logged and
//! missing fields default to empty/zero. Normalisation (port stripping,
//! content-type trimming, ...) happens where the values are consumed.

use serde::Deserialize;

/// One request, as recorded by a single access-log line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestEvent {
    /// Seconds since the unix epoch (fractional)
    pub timestamp: f64,
    pub status: u16,
    /// Seconds spent handling the request
    pub duration: f64,
    /// Response body size in bytes
    pub size: u64,
    pub host: String,
    /// Remote IP, possibly with a `:port` suffix
    pub remote_address: String,
    pub protocol: String,
    pub method: String,
    pub path: String,
    pub tls_version: u16,
    pub tls_cipher: u16,
    pub accept_language: Vec<String>,
    pub accept_encoding: Vec<String>,
    pub user_agent: Vec<String>,
    pub referer: Vec<String>,
    pub content_type: Vec<String>,
}

impl RequestEvent {
    /// Decode one log line.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEntry = serde_json::from_slice(line)?;
        Ok(raw.into())
    }

    /// First `User-Agent` header value, or the empty string
    pub fn first_user_agent(&self) -> &str {
        self.user_agent.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    ts: f64,
    status: u16,
    duration: f64,
    size: u64,
    request: RawRequest,
    resp_headers: RawResponseHeaders,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequest {
    /// Caddy < 2.5 logs `ip:port` here
    remote_addr: Option<String>,
    /// Newer Caddy splits the address into `remote_ip`/`remote_port`
    remote_ip: Option<String>,
    proto: String,
    method: String,
    host: String,
    uri: String,
    tls: RawTls,
    headers: RawRequestHeaders,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTls {
    version: u16,
    cipher_suite: u16,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequestHeaders {
    #[serde(rename = "Accept-Language")]
    accept_language: Vec<String>,
    #[serde(rename = "Accept-Encoding")]
    accept_encoding: Vec<String>,
    #[serde(rename = "User-Agent")]
    user_agent: Vec<String>,
    #[serde(rename = "Referer")]
    referer: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResponseHeaders {
    #[serde(rename = "Content-Type")]
    content_type: Vec<String>,
}

impl From<RawEntry> for RequestEvent {
    fn from(raw: RawEntry) -> Self {
        let request = raw.request;
        let remote_address = request
            .remote_addr
            .or(request.remote_ip)
            .unwrap_or_default();

        Self {
            timestamp: raw.ts,
            status: raw.status,
            duration: raw.duration,
            size: raw.size,
            host: request.host,
            remote_address,
            protocol: request.proto,
            method: request.method,
            path: request.uri,
            tls_version: request.tls.version,
            tls_cipher: request.tls.cipher_suite,
            accept_language: request.headers.accept_language,
            accept_encoding: request.headers.accept_encoding,
            user_agent: request.headers.user_agent,
            referer: request.headers.referer,
            content_type: raw.resp_headers.content_type,
        }
    }
}
