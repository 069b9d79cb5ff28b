//! Network client used by the worker on cache misses and during install.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{NetworkError, Request, RequestMode, Response, ResponseType};

/// HTTP request timeout in seconds.
/// The worker itself never times out a fetch; this is the only bound on a hung request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Anything the worker can send a request through.
///
/// `Err` means the request never produced a response (offline, DNS, reset).
/// HTTP error statuses are successful fetches and come back as `Ok`.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// reqwest-backed network.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: Url) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, origin })
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    fn response_type_for(&self, request: &Request, final_url: &Url) -> ResponseType {
        if self.is_same_origin(final_url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let final_url = response.url().clone();
        let response_type = self.response_type_for(request, &final_url);

        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status().as_u16(),
            response_type = %response_type,
            "Network response"
        );

        // Cross-origin no-cors responses are not readable by the page
        if response_type == ResponseType::Opaque {
            return Ok(Response::opaque(&final_url));
        }

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}
