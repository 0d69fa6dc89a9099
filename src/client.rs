//! Blocking client for the invocation endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::endpoint::ErrorBody;
use crate::error::BenchError;
use crate::harness::Invoke;
use crate::schema::Invocation;
use crate::Backend;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EndpointClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl EndpointClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BenchError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BenchError> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| BenchError::Config(format!("invalid base url {base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BenchError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, backend: Backend, n: i64) -> Result<Url, BenchError> {
        let n = n.to_string();
        Url::parse_with_params(&self.base_url, &[("backend", backend.as_str()), ("n", n.as_str())])
            .map_err(|e| BenchError::Config(format!("invalid base url {}: {e}", self.base_url)))
    }

    fn transport_error(&self, url: &Url, err: reqwest::Error) -> BenchError {
        if err.is_timeout() {
            BenchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            BenchError::Http(err.to_string())
        }
    }
}

impl Invoke for EndpointClient {
    fn invoke(&self, backend: Backend, n: i64) -> Result<Invocation, BenchError> {
        let url = self.url_for(backend, n)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| self.transport_error(&url, e))?;
        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(&url, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), %message, "endpoint rejected invocation");
            return Err(BenchError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let invocation: Invocation = serde_json::from_str(&body)?;
        if invocation.backend != backend {
            return Err(BenchError::Http(format!(
                "asked for {backend}, endpoint answered for {}",
                invocation.backend
            )));
        }
        Ok(invocation)
    }
}
