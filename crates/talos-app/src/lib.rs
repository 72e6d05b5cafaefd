#![warn(missing_docs)]
//! # talos-app
//!
//! ## Purpose
//! Orchestrates auth lifecycle, health gate, session timer, API client and UI
//! state for `talos-client`.
//!
//! ## Responsibilities
//! - Derive all state from the server on load and after every transition.
//! - Gate revealing and mutating actions on a fresh health probe.
//! - Run the idle timer while a session is active and log out on expiry.
//! - Discard out-of-order responses for the same UI target.
//! - Turn every action failure into a notification.
//! - Load configuration and redact log output.
//!
//! ## Data flow
//! Shell command -> [`App`] action -> validation -> health gate -> API call ->
//! codec -> [`talos_ui::UiState`] update -> subscribers render.
//!
//! ## Ownership and lifetimes
//! [`App`] is an `Arc` handle; the session timer holds only a weak reference
//! so an expired timer never keeps the application alive.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Public actions return
//! [`ActionOutcome`] and never propagate errors.
//!
//! ## Security and privacy notes
//! - Records are decoded per action and dropped (wiped) afterwards.
//! - Log lines built from error text pass through [`redact_sensitive`].

use talos_api::TransportError;
use talos_contract::{ApiError, FailureClass, classify_api_error};
use talos_core::ValidationError;
use talos_ui::{Screen, SubsystemStatus, UiState};
use thiserror::Error;

mod app;
pub mod config;
mod inflight;

pub use app::{ActionOutcome, App, Submitted};
pub use config::{ClientConfig, ConfigError};
pub use inflight::{InFlight, Slot, Ticket};

/// Build-time client version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("TALOS_CLIENT_VERSION");

const SENSITIVE_KEYS: [&str; 6] = [
    "password",
    "passphrase",
    "key",
    "token",
    "cookie",
    "authorization",
];

/// Flat status snapshot for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Current screen.
    pub screen: String,
    /// Auth badge text, empty outside the vault.
    pub badge: String,
    /// Storage LED.
    pub storage: String,
    /// Bunker LED.
    pub bunker: String,
    /// Idle countdown as `MM:SS`, empty outside the vault.
    pub session: String,
    /// Whether sensitive actions are currently offered.
    pub actions_allowed: bool,
}

/// Returns the client version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Redacts secret-bearing assignments in log-safe output.
///
/// Everything from the first `key=`/`key:` style assignment of a sensitive
/// key, or from a `Bearer ` credential, is replaced.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();

    let assignment = SENSITIVE_KEYS
        .iter()
        .filter_map(|key| find_assignment(&lower, key).map(|index| (index, *key)))
        .min_by_key(|(index, _)| *index);
    let bearer = lower.find("bearer ").map(|index| (index, "bearer"));

    match [assignment, bearer].into_iter().flatten().min_by_key(|(index, _)| *index) {
        Some((index, "bearer")) => format!("{}bearer <redacted>", &input[..index]),
        Some((index, key)) => format!("{}{key}=<redacted>", &input[..index]),
        None => input.to_string(),
    }
}

fn find_assignment(lower: &str, key: &str) -> Option<usize> {
    lower
        .match_indices(key)
        .find(|(index, _)| {
            let rest = lower[index + key.len()..].trim_start_matches([' ', '"']);
            rest.starts_with('=') || rest.starts_with(':')
        })
        .map(|(index, _)| index)
}

/// Projects UI state into a flat status snapshot.
pub fn project_runtime_status(state: &UiState) -> RuntimeStatus {
    RuntimeStatus {
        screen: format!("{:?}", state.screen),
        badge: state
            .badge
            .map(|badge| badge.label().to_string())
            .unwrap_or_default(),
        storage: led(state.storage).to_string(),
        bunker: led(state.bunker).to_string(),
        session: if state.screen == Screen::Vault {
            state.countdown_label().unwrap_or_default()
        } else {
            String::new()
        },
        actions_allowed: state.can_run_sensitive_actions(),
    }
}

fn led(status: SubsystemStatus) -> &'static str {
    match status {
        SubsystemStatus::Unknown => "UNKNOWN",
        SubsystemStatus::Online => "ONLINE",
        SubsystemStatus::Offline => "OFFLINE",
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// HTTP client could not be set up.
    #[error("transport setup error: {0}")]
    Transport(#[from] TransportError),
    /// Server call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Input rejected before any request.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// Server returned the hidden marker where a literal was requested.
    #[error("the server withheld the secret")]
    SecretWithheld,
    /// Record has no password to reveal.
    #[error("record has an empty password")]
    EmptySecret,
}

impl AppError {
    /// Decides how the failure is surfaced.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::Api(error) => classify_api_error(error),
            Self::Config(_) | Self::Transport(_) => FailureClass::Availability,
            Self::Validation(_) => FailureClass::Validation,
            Self::SecretWithheld | Self::EmptySecret => FailureClass::Domain,
        }
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.user_message(),
            Self::Validation(error) => error.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_class_follows_api_taxonomy() {
        assert_eq!(
            AppError::from(ApiError::Transport("refused".to_string())).failure_class(),
            FailureClass::Availability
        );
        assert_eq!(
            AppError::from(ApiError::Domain {
                status: 409,
                message: "Secret already exists".to_string(),
            })
            .failure_class(),
            FailureClass::Domain
        );
        assert_eq!(
            AppError::from(ValidationError::TraversalSegment).failure_class(),
            FailureClass::Validation
        );
        assert_eq!(AppError::SecretWithheld.failure_class(), FailureClass::Domain);
    }
}
