//! HTTP POST transport boundary.
//!
//! The host contract is a single POST that returns a status code and raw
//! body bytes; everything JSON-RPC lives above in [`crate::rpc`]. Browser
//! and extension hosts supply their own implementation, native callers use
//! [`ReqwestTransport`].

use std::time::Duration;

use async_trait::async_trait;
use displaydoc::Display;
use thiserror::Error;

/// Transport-level failures, i.e. no usable HTTP response was obtained.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Request timed out
    Timeout,

    /// Network error: {0}
    Network(String),
}

/// A raw HTTP response: status code plus body bytes.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Host-provided HTTP POST transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body to `url`, bounded by `timeout`.
    ///
    /// Implementations must abort the request on expiry and report it as
    /// [`TransportError::Timeout`]; any HTTP response, including error
    /// statuses, is returned as [`HttpResponse`].
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post_json(url, body, timeout).await
    }
}

/// Default transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
