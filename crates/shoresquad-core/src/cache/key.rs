use serde::{Deserialize, Serialize};
use url::Url;

use crate::net::Request;

/// Identity of a cache entry: request method plus the request URL with any
/// fragment removed. Query strings are part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method.as_str(), &request.url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
