#![warn(missing_docs)]
//! # talos-auth
//!
//! ## Purpose
//! Implements the client authentication lifecycle and the idle-session timer
//! for `talos-client`.
//!
//! ## Responsibilities
//! - Classify server-reported [`AuthStatus`] into exactly one mode.
//! - Drive first-run setup (generate or import a key), login and logout
//!   through an injectable [`AuthBackend`].
//! - Expire idle sessions with an activity-reset countdown ([`SessionTimer`]).
//!
//! ## Data flow
//! [`AuthLifecycle::start`] queries status -> [`LifecycleState`] -> UI collects
//! input into [`SetupForm`] / [`LoginForm`] -> submit asks the server to change
//! its truth -> [`Transition::Reload`] -> caller calls `start` again.
//!
//! ## Ownership and lifetimes
//! Transitions take form state by value and hand it back on failure, so no
//! controller-side copy of the state can drift from the server.
//!
//! ## Error model
//! Submission failures never escape as errors: they are recorded on the
//! returned form. A status query that fails at the transport level yields
//! [`LifecycleState::Unknown`].
//!
//! ## Security and privacy notes
//! Keys and passphrases live in zeroizing buffers and are redacted in `Debug`
//! output. Nothing in this crate logs credential values.
//!
//! ## Example
//! ```rust
//! use talos_auth::{SessionMode, classify_status};
//! use talos_contract::AuthStatus;
//!
//! let status = AuthStatus { initialized: true, authenticated: false, auth_method: None };
//! assert_eq!(classify_status(&status), SessionMode::AwaitingLogin);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use talos_contract::{ApiError, AuthMethod, AuthStatus, ImportRequest, KeyRequest};
use talos_core::{PasswordPolicy, ValidationError, generate_password};
use tracing::{info, warn};
use zeroize::Zeroizing;

mod session;

pub use session::{
    ActivityHandle, DEFAULT_IDLE_BUDGET, SessionCountdown, SessionSignal, SessionState,
    SessionTimer, TICK_PERIOD, TickOutcome,
};

/// Delay between a successful setup and the reload that re-derives state.
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(1_500);

/// Message prefix shown when a login attempt is rejected.
pub const ACCESS_DENIED: &str = "ACCESS DENIED";

/// Top-level mode derived from server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// No master key exists; first-run setup is required.
    Uninitialized,
    /// Key exists but this client has no session.
    AwaitingLogin,
    /// Authenticated session.
    Active,
}

/// Maps server status to the single mode the UI enters.
pub fn classify_status(status: &AuthStatus) -> SessionMode {
    match (status.initialized, status.authenticated) {
        (false, _) => SessionMode::Uninitialized,
        (true, false) => SessionMode::AwaitingLogin,
        (true, true) => SessionMode::Active,
    }
}

/// Server operations the lifecycle depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Fetches current auth status.
    async fn auth_status(&self) -> Result<AuthStatus, ApiError>;
    /// Submits a candidate master key.
    async fn login(&self, request: &KeyRequest) -> Result<(), ApiError>;
    /// Ends the server session.
    async fn logout(&self) -> Result<(), ApiError>;
    /// Initializes the store with a new master key.
    async fn initialize(&self, request: &KeyRequest) -> Result<(), ApiError>;
    /// Initializes the store from an existing private key.
    async fn import_key(&self, request: &ImportRequest) -> Result<(), ApiError>;
}

/// First-run setup sub-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupMode {
    /// Generate a fresh master passphrase.
    #[default]
    Generate,
    /// Import an existing private key.
    Import,
}

/// Input owned by the generate sub-mode.
#[derive(Clone, Default)]
pub struct GenerateInput {
    /// Generator settings chosen by the user.
    pub policy: PasswordPolicy,
    passphrase: Zeroizing<String>,
}

impl GenerateInput {
    /// Replaces the passphrase with a freshly generated one and returns it so
    /// the user can store it.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidLength`] for an invalid policy.
    pub fn regenerate(&mut self) -> Result<&str, ValidationError> {
        self.passphrase = generate_password(&self.policy)?;
        Ok(self.passphrase.as_str())
    }

    /// Returns the current passphrase (empty until generated).
    pub fn passphrase(&self) -> &str {
        self.passphrase.as_str()
    }
}

/// Input owned by the import sub-mode.
#[derive(Clone, Default)]
pub struct ImportInput {
    /// Armored private key text.
    pub private_key: Zeroizing<String>,
    /// Optional passphrase of the key.
    pub passphrase: Zeroizing<String>,
}

/// Setup screen state. Each sub-mode keeps its own input.
#[derive(Clone, Default)]
pub struct SetupForm {
    mode: SetupMode,
    /// Generate sub-mode input.
    pub generate: GenerateInput,
    /// Import sub-mode input.
    pub import: ImportInput,
    error: Option<String>,
}

impl SetupForm {
    /// Creates an empty form in generate mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches sub-mode without touching either sub-mode's input.
    pub fn select_mode(&mut self, mode: SetupMode) {
        self.mode = mode;
    }

    /// Returns the selected sub-mode.
    pub fn mode(&self) -> SetupMode {
        self.mode
    }

    /// Returns the last submission error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl fmt::Debug for SetupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupForm")
            .field("mode", &self.mode)
            .field("policy", &self.generate.policy)
            .field("has_passphrase", &!self.generate.passphrase.is_empty())
            .field("has_private_key", &!self.import.private_key.is_empty())
            .field("error", &self.error)
            .finish()
    }
}

/// Login screen state.
#[derive(Clone, Default)]
pub struct LoginForm {
    /// Candidate master key.
    pub key: Zeroizing<String>,
    error: Option<String>,
}

impl LoginForm {
    /// Creates an empty login form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last submission error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("has_key", &!self.key.is_empty())
            .field("error", &self.error)
            .finish()
    }
}

/// Facts recorded when entering the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    /// How the session was authenticated.
    pub method: AuthMethod,
}

/// State entered on each load.
#[derive(Debug, Clone)]
pub enum LifecycleState {
    /// First-run setup.
    Setup(SetupForm),
    /// Waiting for the master key.
    AwaitingLogin(LoginForm),
    /// Authenticated.
    Active(ActiveSession),
    /// Status could not be fetched; retried on next load.
    Unknown {
        /// Transport failure description.
        reason: String,
    },
}

impl LifecycleState {
    /// Returns the session mode, or `None` for [`LifecycleState::Unknown`].
    pub fn mode(&self) -> Option<SessionMode> {
        match self {
            Self::Setup(_) => Some(SessionMode::Uninitialized),
            Self::AwaitingLogin(_) => Some(SessionMode::AwaitingLogin),
            Self::Active(_) => Some(SessionMode::Active),
            Self::Unknown { .. } => None,
        }
    }
}

/// Request to re-derive all state from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reload {
    /// Delay before reloading.
    pub after: Duration,
}

/// Outcome of a submission.
#[derive(Debug, Clone)]
pub enum Transition<S> {
    /// Server truth changed; reload.
    Reload(Reload),
    /// Nothing changed; the form comes back with its error set.
    Stay(S),
}

/// Drives setup, login and logout against an [`AuthBackend`].
#[derive(Clone)]
pub struct AuthLifecycle {
    backend: Arc<dyn AuthBackend>,
    reload_delay: Duration,
}

impl AuthLifecycle {
    /// Creates a lifecycle controller.
    pub fn new(backend: Arc<dyn AuthBackend>, reload_delay: Duration) -> Self {
        Self {
            backend,
            reload_delay,
        }
    }

    /// Queries status and returns the state to enter for this load.
    pub async fn start(&self) -> LifecycleState {
        let status = match self.backend.auth_status().await {
            Ok(status) => status,
            Err(error) => {
                warn!(%error, "auth status unavailable");
                return LifecycleState::Unknown {
                    reason: error.to_string(),
                };
            }
        };

        let mode = classify_status(&status);
        info!(?mode, "auth status resolved");
        match mode {
            SessionMode::Uninitialized => LifecycleState::Setup(SetupForm::new()),
            SessionMode::AwaitingLogin => LifecycleState::AwaitingLogin(LoginForm::new()),
            SessionMode::Active => LifecycleState::Active(ActiveSession {
                method: status.auth_method.unwrap_or(AuthMethod::MasterKey),
            }),
        }
    }

    /// Submits the setup form in its selected sub-mode.
    ///
    /// Generate mode sends the passphrase the user was shown, so it requires
    /// a prior [`GenerateInput::regenerate`]. Import mode requires a private
    /// key.
    pub async fn submit_setup(&self, mut form: SetupForm) -> Transition<SetupForm> {
        let result = match form.mode {
            SetupMode::Generate => {
                if form.generate.passphrase.is_empty() {
                    form.error = Some(ValidationError::EmptyInput("master passphrase").to_string());
                    return Transition::Stay(form);
                }
                let request = KeyRequest::new(form.generate.passphrase());
                self.backend.initialize(&request).await
            }
            SetupMode::Import => {
                if form.import.private_key.trim().is_empty() {
                    form.error = Some(ValidationError::EmptyInput("private key").to_string());
                    return Transition::Stay(form);
                }
                let request = ImportRequest {
                    key: form.import.private_key.to_string(),
                    passphrase: form.import.passphrase.to_string(),
                };
                self.backend.import_key(&request).await
            }
        };

        match result {
            Ok(()) => {
                info!(mode = ?form.mode, "setup accepted; reloading");
                Transition::Reload(Reload {
                    after: self.reload_delay,
                })
            }
            Err(error) => {
                warn!(mode = ?form.mode, %error, "setup rejected");
                let action = match form.mode {
                    SetupMode::Generate => "INITIALIZATION FAILED",
                    SetupMode::Import => "IMPORT FAILED",
                };
                form.error = Some(format!("{action}: {}", error.user_message()));
                Transition::Stay(form)
            }
        }
    }

    /// Submits the login form. On failure the key input is cleared.
    pub async fn submit_login(&self, mut form: LoginForm) -> Transition<LoginForm> {
        if form.key.is_empty() {
            form.error = Some(ValidationError::EmptyInput("master key").to_string());
            return Transition::Stay(form);
        }

        let request = KeyRequest::new(form.key.as_str());
        match self.backend.login(&request).await {
            Ok(()) => {
                info!("login accepted; reloading");
                Transition::Reload(Reload {
                    after: Duration::ZERO,
                })
            }
            Err(error) => {
                warn!(%error, "login rejected");
                form.key = Zeroizing::default();
                form.error = Some(format!("{ACCESS_DENIED}: {}", error.user_message()));
                Transition::Stay(form)
            }
        }
    }

    /// Ends the session. Failures are ignored; the caller always reloads.
    pub async fn logout(&self) -> Reload {
        if let Err(error) = self.backend.logout().await {
            warn!(%error, "logout request failed; reloading anyway");
        }
        Reload {
            after: Duration::ZERO,
        }
    }

    /// Returns the backend handle, for wiring the session expiry callback.
    pub fn backend(&self) -> Arc<dyn AuthBackend> {
        Arc::clone(&self.backend)
    }
}
