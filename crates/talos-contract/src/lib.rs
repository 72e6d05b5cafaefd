#![warn(missing_docs)]
//! # talos-contract
//!
//! ## Purpose
//! Defines the HTTP/JSON contract between `talos-client` and the secret
//! server, plus the shared client error taxonomy.
//!
//! ## Responsibilities
//! - Name every endpoint path the client calls.
//! - Model request/response bodies with serde.
//! - Extract user-facing messages from non-2xx bodies.
//! - Classify failures into availability, domain and validation classes.
//!
//! ## Data flow
//! Client builds a request body -> transport sends it -> raw response text is
//! parsed with [`parse_json`], [`parse_decrypted_blob`] or
//! [`parse_error_message`].
//!
//! ## Ownership and lifetimes
//! All bodies own their strings so they can cross async boundaries freely.
//!
//! ## Error model
//! Malformed payloads surface as [`ContractError`]; every client-side failure
//! is an [`ApiError`].
//!
//! ## Security and privacy notes
//! Bodies carrying keys, passphrases or record content wipe themselves on
//! drop and redact themselves in `Debug` output.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// `GET` auth status.
pub const AUTH_STATUS_PATH: &str = "/api/auth/status";
/// `POST` master-key login.
pub const LOGIN_PATH: &str = "/api/auth/login";
/// `POST` logout.
pub const LOGOUT_PATH: &str = "/api/auth/logout";
/// `POST` first-run initialize with a generated passphrase.
pub const INITIALIZE_PATH: &str = "/api/initialize";
/// `POST` first-run import of an existing private key.
pub const IMPORT_PATH: &str = "/api/initialize/import";
/// `POST` decrypt one record.
pub const DECRYPT_PATH: &str = "/api/decrypt";
/// `POST` save one record.
pub const SAVE_PATH: &str = "/api/save";
/// `POST` delete a record or an empty category.
pub const DELETE_PATH: &str = "/api/delete";
/// `POST` create a category.
pub const CREATE_CATEGORY_PATH: &str = "/api/create_category";
/// `GET` record tree.
pub const TREE_PATH: &str = "/api/tree";
/// `GET` subsystem liveness.
pub const HEALTH_PATH: &str = "/api/health";
/// `GET` server version.
pub const VERSION_PATH: &str = "/api/version";

/// Wire value the server reports for certificate-based sessions.
pub const MTLS_METHOD_TAG: &str = "mtls";

/// Bunker status string meaning "keys loaded and usable".
pub const BUNKER_UNSEALED: &str = "UNSEALED";

/// How the active session was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMethod {
    /// Master-key login.
    MasterKey,
    /// Client-certificate (mutual TLS) login.
    MutualTls,
}

impl From<String> for AuthMethod {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case(MTLS_METHOD_TAG) {
            Self::MutualTls
        } else {
            Self::MasterKey
        }
    }
}

impl From<AuthMethod> for String {
    fn from(value: AuthMethod) -> Self {
        match value {
            AuthMethod::MasterKey => "password".to_string(),
            AuthMethod::MutualTls => MTLS_METHOD_TAG.to_string(),
        }
    }
}

/// Server-reported authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether a master key exists on the server.
    pub initialized: bool,
    /// Whether the current session is authenticated.
    pub authenticated: bool,
    /// Method of the authenticated session, if any.
    #[serde(default)]
    pub auth_method: Option<AuthMethod>,
}

/// Liveness of the backend subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    /// Storage tier reachable.
    #[serde(default)]
    pub storage: bool,
    /// Key bunker reachable and unsealed.
    #[serde(default, deserialize_with = "bunker_flag")]
    pub bunker: bool,
}

impl HealthReport {
    /// Report used when the probe itself fails.
    pub fn offline() -> Self {
        Self {
            storage: false,
            bunker: false,
        }
    }

    /// Returns `true` when both subsystems are available.
    pub fn is_healthy(&self) -> bool {
        self.storage && self.bunker
    }
}

fn bunker_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BunkerField {
        Flag(bool),
        Status(String),
    }

    Ok(match BunkerField::deserialize(deserializer)? {
        BunkerField::Flag(flag) => flag,
        BunkerField::Status(status) => status == BUNKER_UNSEALED,
    })
}

/// Body carrying one master key (`login`, `initialize`).
#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyRequest {
    /// Candidate or new master key.
    pub key: String,
}

impl KeyRequest {
    /// Copies `key` into a new request body.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl fmt::Debug for KeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRequest")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Body for importing an existing private key.
#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct ImportRequest {
    /// Armored private key.
    pub key: String,
    /// Passphrase protecting the key; may be empty.
    pub passphrase: String,
}

impl fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportRequest")
            .field("key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Body for decrypting one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// Record path.
    pub path: String,
    /// Ask for the literal secret instead of the hidden marker.
    pub reveal: bool,
}

/// Body for saving one record.
#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct SaveRequest {
    /// Destination record path.
    pub path: String,
    /// Encoded record blob.
    pub content: String,
    /// Path the record was loaded from, when editing (enables rename).
    pub original_path: Option<String>,
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveRequest")
            .field("path", &self.path)
            .field("content", &"<redacted>")
            .field("original_path", &self.original_path)
            .finish()
    }
}

/// Body naming a single path (`delete`, `create_category`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Target path.
    pub path: String,
}

/// One node of the record tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Display name.
    pub name: String,
    /// Store-relative path.
    pub path: String,
    /// `true` for categories.
    pub is_dir: bool,
    /// Child nodes of a category.
    #[serde(default)]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    /// Returns the children, or an empty slice for records.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Collects record (non-category) paths in depth-first order.
    pub fn record_paths(nodes: &[TreeNode]) -> Vec<&str> {
        let mut paths = Vec::new();
        for node in nodes {
            if node.is_dir {
                paths.extend(Self::record_paths(node.children()));
            } else {
                paths.push(node.path.as_str());
            }
        }
        paths
    }
}

/// Server version payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Semantic version string.
    pub version: String,
}

/// Error body shape of non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// Parses a JSON response body.
///
/// # Errors
/// Returns [`ContractError::Decode`] for malformed or mismatched JSON.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, ContractError> {
    serde_json::from_str(raw).map_err(ContractError::Decode)
}

/// Extracts the record blob from a decrypt response.
///
/// A JSON string yields its contents; any other JSON value yields its compact
/// serialization; text that is not JSON is returned unchanged.
pub fn parse_decrypted_blob(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(blob)) => blob,
        Ok(other) => other.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Extracts the user-facing message from a non-2xx body.
///
/// Accepts `{"error": "..."}` and bare JSON strings; anything else yields
/// `None`.
pub fn parse_error_message(raw: &str) -> Option<String> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::String(message) if !message.trim().is_empty() => Some(message),
        Value::Object(map) => match map.get("error") {
            Some(Value::String(message)) if !message.trim().is_empty() => Some(message.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Malformed payload errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure.
    #[error("response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Every failure a client call can produce.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response (connect, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),
    /// Non-2xx response without a parseable message.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    /// Non-2xx response carrying a server message.
    #[error("{message}")]
    Domain {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, shown verbatim.
        message: String,
    },
    /// Input rejected locally; no request was sent.
    #[error("{0}")]
    Validation(String),
    /// 2xx response whose body violated the contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ContractError> for ApiError {
    fn from(error: ContractError) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

/// Message shown for failures without a server-provided explanation.
pub const GENERIC_FAILURE_MESSAGE: &str = "request failed: backend unavailable";

impl ApiError {
    /// Returns the text to show the user.
    ///
    /// Domain and validation messages are verbatim; availability failures
    /// collapse to [`GENERIC_FAILURE_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            Self::Transport(_) | Self::UnexpectedStatus(_) | Self::InvalidResponse(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// Failure classes that decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Backend unreachable or misbehaving; show a generic message.
    Availability,
    /// Server rejected the request; show its message verbatim.
    Domain,
    /// Rejected before any request.
    Validation,
}

/// Classifies an error for notification handling.
pub fn classify_api_error(error: &ApiError) -> FailureClass {
    match error {
        ApiError::Transport(_) | ApiError::UnexpectedStatus(_) | ApiError::InvalidResponse(_) => {
            FailureClass::Availability
        }
        ApiError::Domain { .. } => FailureClass::Domain,
        ApiError::Validation(_) => FailureClass::Validation,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for lenient payload parsing.

    use super::*;

    #[test]
    fn auth_method_maps_wire_tags() {
        let status: AuthStatus = parse_json(
            r#"{"initialized":true,"authenticated":true,"auth_method":"mtls","bunker":true}"#,
        )
        .expect("status should parse");
        assert_eq!(status.auth_method, Some(AuthMethod::MutualTls));

        let status: AuthStatus =
            parse_json(r#"{"initialized":true,"authenticated":true,"auth_method":"password"}"#)
                .expect("status should parse");
        assert_eq!(status.auth_method, Some(AuthMethod::MasterKey));

        let status: AuthStatus =
            parse_json(r#"{"initialized":false,"authenticated":false,"auth_method":null}"#)
                .expect("status should parse");
        assert_eq!(status.auth_method, None);
    }

    #[test]
    fn bunker_status_strings_fail_closed() {
        let sealed: HealthReport =
            parse_json(r#"{"storage":true,"bunker":"SEALED"}"#).expect("report should parse");
        assert!(!sealed.is_healthy());

        let unsealed: HealthReport =
            parse_json(r#"{"storage":true,"bunker":"UNSEALED"}"#).expect("report should parse");
        assert!(unsealed.is_healthy());

        let missing: HealthReport = parse_json(r#"{"storage":true}"#).expect("report should parse");
        assert!(!missing.is_healthy());
    }

    #[test]
    fn error_messages_from_object_or_string() {
        assert_eq!(
            parse_error_message(r#"{"error":"Invalid Master Key"}"#).as_deref(),
            Some("Invalid Master Key")
        );
        assert_eq!(
            parse_error_message(r#""Error: Bunker unavailable""#).as_deref(),
            Some("Error: Bunker unavailable")
        );
        assert_eq!(parse_error_message("<html>502</html>"), None);
        assert_eq!(parse_error_message(r#"{"status":"nope"}"#), None);
    }
}
