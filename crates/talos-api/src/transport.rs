//! Request transport abstraction and its reqwest implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use talos_contract::ApiError;
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use crate::TransportError;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP verbs used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// Upper-case verb name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One request relative to the client's base URL.
pub struct ApiRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Endpoint path starting with `/`.
    pub path: &'static str,
    /// Serialized JSON body.
    pub body: Option<Zeroizing<String>>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Raw response as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl ApiResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the server.
///
/// Implementations report connect, TLS and timeout failures as
/// [`ApiError::Transport`]; every response, whatever its status, is returned
/// as [`ApiResponse`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends `request` against `base`.
    async fn send(&self, base: &Url, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Settings for [`ReqwestTransport`].
#[derive(Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// PEM bundle with client certificate and private key for mutual TLS.
    pub identity_pem: Option<Zeroizing<Vec<u8>>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            identity_pem: None,
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("timeout", &self.timeout)
            .field("has_identity", &self.identity_pem.is_some())
            .finish()
    }
}

/// reqwest-backed transport with a session cookie store.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the underlying HTTP client.
    ///
    /// # Errors
    /// Returns [`TransportError::Identity`] for an unusable PEM bundle and
    /// [`TransportError::Build`] when the TLS backend cannot initialize.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .cookie_store(true)
            .timeout(config.timeout);

        if let Some(pem) = &config.identity_pem {
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|error| TransportError::Identity(error.to_string()))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|error| TransportError::Build(error.to_string()))?;
        Ok(Self { client })
    }
}

/// Request body buffer that is wiped once reqwest releases it.
struct WipedBody(Zeroizing<Vec<u8>>);

impl AsRef<[u8]> for WipedBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn wiped_body(body: &Zeroizing<String>) -> Bytes {
    Bytes::from_owner(WipedBody(Zeroizing::new(body.as_bytes().to_vec())))
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn send(&self, base: &Url, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", base.as_str().trim_end_matches('/'), request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(wiped_body(body));
        }

        let response = builder
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Transport(error.without_url().to_string()))?;

        debug!(
            method = request.method.as_str(),
            path = request.path,
            status,
            "request completed"
        );
        Ok(ApiResponse { status, body })
    }
}
