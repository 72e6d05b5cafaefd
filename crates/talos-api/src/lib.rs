#![warn(missing_docs)]
//! # talos-api
//!
//! ## Purpose
//! Typed HTTP client for the secret server.
//!
//! ## Responsibilities
//! - Validate the server base URL.
//! - Encode request bodies and decode response payloads per `talos-contract`.
//! - Map non-2xx responses to domain or availability errors.
//! - Serve as the [`AuthBackend`] and [`HealthProbe`] of the application.
//!
//! ## Data flow
//! Caller -> [`ApiClient`] method -> [`ApiRequest`] -> [`ApiTransport`] ->
//! [`ApiResponse`] -> status mapping -> typed result.
//!
//! ## Ownership and lifetimes
//! The client is cheap to clone; clones share one transport and therefore one
//! cookie-backed server session.
//!
//! ## Error model
//! Every call returns [`ApiError`]. Construction problems are
//! [`TransportError`].
//!
//! ## Security and privacy notes
//! Request bodies and decrypted blobs are held in zeroizing buffers. Logs
//! carry method, path and status only.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use talos_auth::AuthBackend;
use talos_contract::{
    AUTH_STATUS_PATH, ApiError, AuthStatus, CREATE_CATEGORY_PATH, DECRYPT_PATH, DELETE_PATH,
    DecryptRequest, HEALTH_PATH, HealthReport, IMPORT_PATH, INITIALIZE_PATH, ImportRequest,
    KeyRequest, LOGIN_PATH, LOGOUT_PATH, PathRequest, SAVE_PATH, SaveRequest, TREE_PATH,
    TreeNode, VERSION_PATH, VersionInfo, parse_decrypted_blob, parse_error_message, parse_json,
};
use talos_health::HealthProbe;
use thiserror::Error;
use tracing::warn;
use url::Url;
use zeroize::Zeroizing;

mod transport;

pub use transport::{
    ApiRequest, ApiResponse, ApiTransport, DEFAULT_REQUEST_TIMEOUT, HttpMethod, ReqwestTransport,
    TransportConfig,
};

/// Client construction errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Base URL unusable.
    #[error("invalid server url: {0}")]
    InvalidBaseUrl(String),
    /// Client identity PEM could not be loaded.
    #[error("invalid client identity: {0}")]
    Identity(String),
    /// HTTP client could not be built.
    #[error("http client build failure: {0}")]
    Build(String),
}

/// Validates a server base URL.
///
/// # Errors
/// Returns [`TransportError::InvalidBaseUrl`] unless the URL parses, uses
/// `http` or `https`, names a host and carries no query or fragment.
pub fn validate_base_url(raw: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| TransportError::InvalidBaseUrl(format!("{raw}: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TransportError::InvalidBaseUrl(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TransportError::InvalidBaseUrl("missing host".to_string()));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(TransportError::InvalidBaseUrl(
            "query and fragment are not allowed".to_string(),
        ));
    }

    Ok(parsed)
}

/// Typed client for every server endpoint.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn ApiTransport>,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidBaseUrl`] for a rejected URL.
    pub fn new(base_url: &str, transport: Arc<dyn ApiTransport>) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            transport,
        })
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches auth status.
    pub async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        let body = self.get(AUTH_STATUS_PATH).await?;
        Ok(parse_json(&body)?)
    }

    /// Submits a master key.
    pub async fn login(&self, request: &KeyRequest) -> Result<(), ApiError> {
        self.post(LOGIN_PATH, request).await.map(drop)
    }

    /// Ends the server session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(ApiRequest {
            method: HttpMethod::Post,
            path: LOGOUT_PATH,
            body: None,
        })
        .await
        .map(drop)
    }

    /// Initializes the store with a new master key.
    pub async fn initialize(&self, request: &KeyRequest) -> Result<(), ApiError> {
        self.post(INITIALIZE_PATH, request).await.map(drop)
    }

    /// Initializes the store from an existing private key.
    pub async fn import_key(&self, request: &ImportRequest) -> Result<(), ApiError> {
        self.post(IMPORT_PATH, request).await.map(drop)
    }

    /// Decrypts one record and returns its blob.
    ///
    /// With `reveal == false` the server substitutes the hidden marker for the
    /// password line.
    pub async fn decrypt(&self, path: &str, reveal: bool) -> Result<Zeroizing<String>, ApiError> {
        let request = DecryptRequest {
            path: path.to_string(),
            reveal,
        };
        let body = Zeroizing::new(self.post(DECRYPT_PATH, &request).await?);
        Ok(Zeroizing::new(parse_decrypted_blob(&body)))
    }

    /// Saves one record.
    pub async fn save(&self, request: &SaveRequest) -> Result<(), ApiError> {
        self.post(SAVE_PATH, request).await.map(drop)
    }

    /// Deletes a record or an empty category.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = PathRequest {
            path: path.to_string(),
        };
        self.post(DELETE_PATH, &request).await.map(drop)
    }

    /// Creates a category.
    pub async fn create_category(&self, path: &str) -> Result<(), ApiError> {
        let request = PathRequest {
            path: path.to_string(),
        };
        self.post(CREATE_CATEGORY_PATH, &request).await.map(drop)
    }

    /// Fetches the record tree.
    pub async fn tree(&self) -> Result<Vec<TreeNode>, ApiError> {
        self.get_json(TREE_PATH).await
    }

    /// Fetches subsystem liveness.
    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        self.get_json(HEALTH_PATH).await
    }

    /// Fetches the server version.
    pub async fn version(&self) -> Result<VersionInfo, ApiError> {
        self.get_json(VERSION_PATH).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, ApiError> {
        let body = self.get(path).await?;
        Ok(parse_json(&body)?)
    }

    async fn get(&self, path: &'static str) -> Result<String, ApiError> {
        self.execute(ApiRequest {
            method: HttpMethod::Get,
            path,
            body: None,
        })
        .await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &'static str,
        body: &B,
    ) -> Result<String, ApiError> {
        let encoded = serde_json::to_string(body)
            .map_err(|error| ApiError::Validation(format!("request encode failure: {error}")))?;
        self.execute(ApiRequest {
            method: HttpMethod::Post,
            path,
            body: Some(Zeroizing::new(encoded)),
        })
        .await
    }

    async fn execute(&self, request: ApiRequest) -> Result<String, ApiError> {
        let response = self.transport.send(&self.base_url, &request).await?;
        if response.is_success() {
            return Ok(response.body);
        }

        let error = match parse_error_message(&response.body) {
            Some(message) => ApiError::Domain {
                status: response.status,
                message,
            },
            None => ApiError::UnexpectedStatus(response.status),
        };
        warn!(
            method = request.method.as_str(),
            path = request.path,
            status = response.status,
            "request rejected"
        );
        Err(error)
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        ApiClient::auth_status(self).await
    }

    async fn login(&self, request: &KeyRequest) -> Result<(), ApiError> {
        ApiClient::login(self, request).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        ApiClient::logout(self).await
    }

    async fn initialize(&self, request: &KeyRequest) -> Result<(), ApiError> {
        ApiClient::initialize(self, request).await
    }

    async fn import_key(&self, request: &ImportRequest) -> Result<(), ApiError> {
        ApiClient::import_key(self, request).await
    }
}

#[async_trait]
impl HealthProbe for ApiClient {
    async fn probe(&self) -> Result<HealthReport, ApiError> {
        self.health().await
    }
}
