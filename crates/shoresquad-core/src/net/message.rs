//! Request and response snapshots.
//!
//! Responses are fully buffered so they can be cloned into the cache and
//! handed back to the page at the same time.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// How the page issued the request. Only `NoCors` changes what the worker
/// gets back: cross-origin no-cors responses are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            mode: RequestMode::default(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// Mirrors the Fetch API's `Response.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
    OpaqueRedirect,
    Error,
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseType::Basic => write!(f, "basic"),
            ResponseType::Cors => write!(f, "cors"),
            ResponseType::Opaque => write!(f, "opaque"),
            ResponseType::OpaqueRedirect => write!(f, "opaqueredirect"),
            ResponseType::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default, with = "base64_body")]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: &Url, status: u16, response_type: ResponseType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.to_string(),
            status,
            status_text: String::new(),
            response_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Same-origin 200 response.
    pub fn basic(url: &Url, body: impl Into<Vec<u8>>) -> Self {
        Self::new(url, 200, ResponseType::Basic, body)
    }

    /// What a cross-origin no-cors fetch hands back: no status, no body.
    pub fn opaque(url: &Url) -> Self {
        Self::new(url, 0, ResponseType::Opaque, Vec::new())
    }

    /// `Response.error()`.
    pub fn error() -> Self {
        Self {
            url: String::new(),
            status: 0,
            status_text: String::new(),
            response_type: ResponseType::Error,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `Response.ok`: any 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only complete, readable responses may be written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && matches!(self.response_type, ResponseType::Basic | ResponseType::Cors)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Bodies are stored as base64 text in the on-disk cache files.
mod base64_body {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
