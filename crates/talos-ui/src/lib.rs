#![warn(missing_docs)]
//! # talos-ui
//!
//! ## Purpose
//! Defines the UI-facing state model for `talos-client`.
//!
//! ## Responsibilities
//! - Project lifecycle, health and session countdown into display state.
//! - Render decrypted records as masked views.
//! - Own the record edit form and turn it into a save request.
//! - Expose the gate for whether sensitive actions may be offered.
//!
//! ## Data flow
//! App orchestration events mutate [`UiState`], which the shell renders.
//! Decrypted records become [`RecordView`] or [`EditForm`] values and are
//! dropped when the view closes.
//!
//! ## Ownership and lifetimes
//! `UiState` owns all strings so reducers never borrow across awaits.
//!
//! ## Error model
//! State projection is infallible. Only [`EditForm::to_save_request`] returns
//! a [`talos_core::ValidationError`].
//!
//! ## Security and privacy notes
//! `UiState` never holds a password. The edit form holds one in a buffer
//! wiped on drop.

use talos_auth::{LifecycleState, SessionMode, SessionState};
use talos_contract::{AuthMethod, TreeNode};
use talos_health::FreezeState;

mod editor;
mod view;

pub use editor::{EditForm, HIDDEN_PASSWORD_PLACEHOLDER};
pub use view::{EMPTY_DESCRIPTION, PASSWORD_MASK, RecordView};

/// Most notifications kept; older ones are discarded.
pub const MAX_NOTIFICATIONS: usize = 5;

/// Header text while no record is open.
pub const IDLE_HEADER: &str = "IDLE_SYSTEM";

/// Screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Waiting for the first status reply.
    Loading,
    /// First-run setup.
    Setup,
    /// Login prompt.
    Login,
    /// Vault browser.
    Vault,
    /// Server unreachable.
    Unreachable,
}

/// Badge naming how the session was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBadge {
    /// Master-key session.
    MasterKey,
    /// Certificate session.
    Diplomatic,
}

impl AuthBadge {
    /// Badge text.
    pub fn label(self) -> &'static str {
        match self {
            Self::MasterKey => "MASTER KEY",
            Self::Diplomatic => "DIPLOMATIC",
        }
    }
}

impl From<AuthMethod> for AuthBadge {
    fn from(method: AuthMethod) -> Self {
        match method {
            AuthMethod::MasterKey => Self::MasterKey,
            AuthMethod::MutualTls => Self::Diplomatic,
        }
    }
}

/// Status LED of one backend subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemStatus {
    /// Not probed yet.
    Unknown,
    /// Reachable.
    Online,
    /// Unreachable or sealed.
    Offline,
}

impl SubsystemStatus {
    fn from_flag(flag: bool) -> Self {
        if flag { Self::Online } else { Self::Offline }
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Neutral.
    Info,
    /// Completed action.
    Success,
    /// Failed action.
    Error,
}

/// Transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Display text.
    pub message: String,
}

/// Aggregate UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// Client version string sourced from root `VERSION`.
    pub version: String,
    /// Current screen.
    pub screen: Screen,
    /// Auth badge while in the vault.
    pub badge: Option<AuthBadge>,
    /// Storage LED.
    pub storage: SubsystemStatus,
    /// Bunker LED.
    pub bunker: SubsystemStatus,
    /// `true` while sensitive actions are blocked.
    pub frozen: bool,
    /// Idle seconds left in the vault.
    pub session_remaining: Option<i64>,
    /// Status line above the viewer.
    pub header: String,
    /// Record tree.
    pub tree: Vec<TreeNode>,
    /// Record shown in the viewer.
    pub viewer: Option<RecordView>,
    /// Recent notifications, oldest first.
    pub notifications: Vec<Notification>,
    /// Why the server is unreachable, on [`Screen::Unreachable`].
    pub unreachable_reason: Option<String>,
}

impl UiState {
    /// Creates the initial state.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            screen: Screen::Loading,
            badge: None,
            storage: SubsystemStatus::Unknown,
            bunker: SubsystemStatus::Unknown,
            frozen: true,
            session_remaining: None,
            header: IDLE_HEADER.to_string(),
            tree: Vec::new(),
            viewer: None,
            notifications: Vec::new(),
            unreachable_reason: None,
        }
    }

    /// Enters the screen for a freshly loaded lifecycle state.
    ///
    /// Everything tied to the previous session is cleared.
    pub fn enter(&mut self, state: &LifecycleState) {
        self.badge = None;
        self.session_remaining = None;
        self.tree.clear();
        self.close_viewer();
        self.unreachable_reason = None;

        self.screen = match state {
            LifecycleState::Setup(_) => Screen::Setup,
            LifecycleState::AwaitingLogin(_) => Screen::Login,
            LifecycleState::Active(session) => {
                self.badge = Some(AuthBadge::from(session.method));
                Screen::Vault
            }
            LifecycleState::Unknown { reason } => {
                self.unreachable_reason = Some(reason.clone());
                Screen::Unreachable
            }
        };
    }

    /// Applies a health indicator update.
    pub fn apply_health(&mut self, state: &FreezeState) {
        self.storage = SubsystemStatus::from_flag(state.report.storage);
        self.bunker = SubsystemStatus::from_flag(state.report.bunker);
        self.frozen = state.frozen;
    }

    /// Applies a session countdown update.
    pub fn apply_session(&mut self, state: &SessionState) {
        self.session_remaining =
            (state.mode == SessionMode::Active).then_some(state.remaining_seconds);
    }

    /// Countdown as `MM:SS`.
    pub fn countdown_label(&self) -> Option<String> {
        self.session_remaining.map(|remaining| {
            let remaining = remaining.max(0);
            format!("{:02}:{:02}", remaining / 60, remaining % 60)
        })
    }

    /// Shows `view` in the viewer.
    pub fn show_record(&mut self, view: RecordView) {
        self.header = format!("OPEN: {}", view.path);
        self.viewer = Some(view);
    }

    /// Empties the viewer.
    pub fn close_viewer(&mut self) {
        self.viewer = None;
        self.header = IDLE_HEADER.to_string();
    }

    /// Adds a notification, dropping the oldest past [`MAX_NOTIFICATIONS`].
    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
        if self.notifications.len() > MAX_NOTIFICATIONS {
            let excess = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
    }

    /// Returns the newest notification.
    pub fn last_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// Returns `true` when sensitive vault actions may be offered.
    pub fn can_run_sensitive_actions(&self) -> bool {
        self.screen == Screen::Vault && !self.frozen
    }
}
