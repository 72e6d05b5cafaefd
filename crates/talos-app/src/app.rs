//! Application controller wiring lifecycle, health gate, timer and UI state.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use talos_api::{ApiClient, ApiTransport};
use talos_auth::{
    AuthLifecycle, DEFAULT_RELOAD_DELAY, LifecycleState, LoginForm, Reload, SessionTimer,
    SetupForm, Transition,
};
use talos_contract::{FailureClass, TreeNode};
use talos_core::{Password, decode, validate_category_path, validate_record_path};
use talos_health::HealthGate;
use talos_ui::{EditForm, NotificationLevel, RecordView, UiState};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::ClientConfig;
use crate::inflight::{InFlight, Slot};
use crate::{AppError, app_version, redact_sensitive};

/// Result of one user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    /// Action ran and produced a value.
    Completed(T),
    /// Health gate was closed; nothing ran.
    Frozen,
    /// Action failed; the message was also posted as a notification.
    Failed(String),
    /// A newer request for the same target finished the race; result dropped.
    Stale,
}

impl<T> ActionOutcome<T> {
    /// Returns the completed value.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Result of a setup or login submission.
#[derive(Debug)]
pub enum Submitted<S> {
    /// Server state changed and was reloaded.
    Reloaded(LifecycleState),
    /// Rejected; the form carries the error.
    Rejected(S),
}

struct AppInner {
    api: ApiClient,
    lifecycle: AuthLifecycle,
    gate: HealthGate,
    ui: watch::Sender<UiState>,
    tickets: InFlight,
    idle_timeout: std::time::Duration,
    timer: Mutex<Option<SessionTimer>>,
}

/// Client application. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Wires the controller over `transport`.
    ///
    /// # Errors
    /// Returns [`AppError::Transport`] when the configured URL is rejected.
    pub fn new(config: &ClientConfig, transport: Arc<dyn ApiTransport>) -> Result<Self, AppError> {
        let api = ApiClient::new(config.server_url.as_str(), transport)?;
        let lifecycle = AuthLifecycle::new(Arc::new(api.clone()), DEFAULT_RELOAD_DELAY);
        let gate = HealthGate::new(Arc::new(api.clone()));
        let (ui, _) = watch::channel(UiState::new(app_version()));

        Ok(Self {
            inner: Arc::new(AppInner {
                api,
                lifecycle,
                gate,
                ui,
                tickets: InFlight::default(),
                idle_timeout: config.idle_timeout,
                timer: Mutex::new(None),
            }),
        })
    }

    /// Subscribes to UI state updates.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.inner.ui.subscribe()
    }

    /// Returns a snapshot of the UI state.
    pub fn ui(&self) -> UiState {
        self.inner.ui.borrow().clone()
    }

    /// Returns the API client.
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Derives all state from the server. Used on boot and after every
    /// server-side transition.
    pub async fn load(&self) -> LifecycleState {
        let state = self.inner.lifecycle.start().await;
        self.inner.ui.send_modify(|ui| ui.enter(&state));

        if matches!(state, LifecycleState::Active(_)) {
            self.start_session_timer();
            self.reconnect().await;
        } else {
            self.stop_session_timer();
        }
        state
    }

    /// Submits first-run setup.
    pub async fn submit_setup(&self, form: SetupForm) -> Submitted<SetupForm> {
        match self.inner.lifecycle.submit_setup(form).await {
            Transition::Reload(reload) => Submitted::Reloaded(self.reload_after(reload).await),
            Transition::Stay(form) => {
                if let Some(message) = form.error() {
                    self.notify(NotificationLevel::Error, message);
                }
                Submitted::Rejected(form)
            }
        }
    }

    /// Submits the master key.
    pub async fn submit_login(&self, form: LoginForm) -> Submitted<LoginForm> {
        match self.inner.lifecycle.submit_login(form).await {
            Transition::Reload(reload) => Submitted::Reloaded(self.reload_after(reload).await),
            Transition::Stay(form) => {
                if let Some(message) = form.error() {
                    self.notify(NotificationLevel::Error, message);
                }
                Submitted::Rejected(form)
            }
        }
    }

    /// Logs out and reloads.
    pub async fn logout(&self) -> LifecycleState {
        self.stop_session_timer();
        let reload = self.inner.lifecycle.logout().await;
        self.reload_after(reload).await
    }

    /// Resets the idle countdown.
    pub fn record_activity(&self) {
        if let Some(timer) = self.lock_timer().as_ref() {
            timer.record_activity();
        }
    }

    /// Re-probes health, publishes the indicator and loads the tree when the
    /// backend is up and the tree is still empty. Returns `true` when healthy.
    pub async fn reconnect(&self) -> bool {
        let healthy = self.inner.gate.check().await;
        self.publish_health();
        let tree_missing = self.inner.ui.borrow().tree.is_empty();
        if healthy && tree_missing {
            self.load_tree().await;
        }
        healthy
    }

    /// Fetches the record tree into the UI.
    pub async fn load_tree(&self) -> ActionOutcome<Vec<TreeNode>> {
        match self.inner.api.tree().await {
            Ok(tree) => {
                self.inner.ui.send_modify(|ui| ui.tree = tree.clone());
                ActionOutcome::Completed(tree)
            }
            Err(error) => self.fail("ERROR LOADING TREE", AppError::from(error)),
        }
    }

    /// Opens a record in the viewer without fetching its secret.
    pub async fn open_record(&self, path: &str) -> ActionOutcome<RecordView> {
        if let Err(error) = validate_record_path(path) {
            return self.fail("ERROR", error.into());
        }
        let ticket = self.inner.tickets.issue(Slot::Viewer);

        let fetched = self.gated(|| self.inner.api.decrypt(path, false)).await;
        let Some(result) = fetched else {
            return ActionOutcome::Frozen;
        };
        if !self.inner.tickets.is_current(ticket) {
            debug!(path, "discarding stale viewer response");
            return ActionOutcome::Stale;
        }

        match result {
            Ok(blob) => {
                let view = RecordView::from_record(path, &decode(&blob));
                self.inner.ui.send_modify(|ui| ui.show_record(view.clone()));
                ActionOutcome::Completed(view)
            }
            Err(error) => {
                self.inner.ui.send_modify(|ui| ui.header = "ERROR".to_string());
                self.fail("ERROR", error.into())
            }
        }
    }

    /// Fetches the literal password of a record, e.g. for the clipboard.
    pub async fn reveal_password(&self, path: &str) -> ActionOutcome<Zeroizing<String>> {
        const CONTEXT: &str = "Failed to copy password";
        if let Err(error) = validate_record_path(path) {
            return self.fail(CONTEXT, error.into());
        }
        let ticket = self.inner.tickets.issue(Slot::Reveal);

        let fetched = self.gated(|| self.inner.api.decrypt(path, true)).await;
        let Some(result) = fetched else {
            return ActionOutcome::Frozen;
        };
        if !self.inner.tickets.is_current(ticket) {
            return ActionOutcome::Stale;
        }

        let blob = match result {
            Ok(blob) => blob,
            Err(error) => return self.fail(CONTEXT, error.into()),
        };
        let record = decode(&blob);
        match &record.password {
            Password::Literal(secret) if !secret.is_empty() => {
                info!(path, "password revealed");
                ActionOutcome::Completed(Zeroizing::new(secret.clone()))
            }
            Password::Literal(_) => self.fail(CONTEXT, AppError::EmptySecret),
            Password::Hidden => self.fail(CONTEXT, AppError::SecretWithheld),
        }
    }

    /// Loads a record into an edit form. The secret is not fetched.
    pub async fn edit_record(&self, path: &str) -> ActionOutcome<EditForm> {
        if let Err(error) = validate_record_path(path) {
            return self.fail("ERROR", error.into());
        }
        let ticket = self.inner.tickets.issue(Slot::Editor);

        let fetched = self.gated(|| self.inner.api.decrypt(path, false)).await;
        let Some(result) = fetched else {
            return ActionOutcome::Frozen;
        };
        if !self.inner.tickets.is_current(ticket) {
            return ActionOutcome::Stale;
        }

        match result {
            Ok(blob) => ActionOutcome::Completed(EditForm::from_record(path, &decode(&blob))),
            Err(error) => self.fail("ERROR", error.into()),
        }
    }

    /// Empty form for a new record, optionally inside `category`.
    pub fn new_record(&self, category: Option<&str>) -> EditForm {
        EditForm::for_new(category)
    }

    /// Saves the form. Input is validated before the health probe.
    pub async fn save(&self, form: &EditForm) -> ActionOutcome<()> {
        const CONTEXT: &str = "ERROR SAVING";
        let request = match form.to_save_request() {
            Ok(request) => request,
            Err(error) => return self.fail(CONTEXT, error.into()),
        };

        let Some(result) = self.gated(|| self.inner.api.save(&request)).await else {
            return ActionOutcome::Frozen;
        };
        match result {
            Ok(()) => {
                let renamed = request
                    .original_path
                    .as_deref()
                    .is_some_and(|original| original != request.path);
                info!(path = %request.path, renamed, "record saved");
                self.notify(NotificationLevel::Success, format!("SAVED: {}", request.path));
                self.load_tree().await;
                ActionOutcome::Completed(())
            }
            Err(error) => self.fail(CONTEXT, error.into()),
        }
    }

    /// Deletes a record or an empty category.
    pub async fn delete(&self, path: &str) -> ActionOutcome<()> {
        const CONTEXT: &str = "ERROR DELETING";
        let target = match validate_category_path(path) {
            Ok(target) => target,
            Err(error) => return self.fail(CONTEXT, error.into()),
        };

        let Some(result) = self.gated(|| self.inner.api.delete(target)).await else {
            return ActionOutcome::Frozen;
        };
        match result {
            Ok(()) => {
                info!(path = target, "path deleted");
                self.inner.ui.send_modify(|ui| {
                    if ui.viewer.as_ref().is_some_and(|view| {
                        view.path == target || view.path.starts_with(&format!("{target}/"))
                    }) {
                        ui.close_viewer();
                    }
                });
                self.load_tree().await;
                ActionOutcome::Completed(())
            }
            Err(error) => self.fail(CONTEXT, error.into()),
        }
    }

    /// Creates a category.
    pub async fn create_category(&self, path: &str) -> ActionOutcome<()> {
        const CONTEXT: &str = "ERROR CREATING CATEGORY";
        let target = match validate_category_path(path) {
            Ok(target) => target,
            Err(error) => return self.fail(CONTEXT, error.into()),
        };

        let Some(result) = self.gated(|| self.inner.api.create_category(target)).await else {
            return ActionOutcome::Frozen;
        };
        match result {
            Ok(()) => {
                info!(path = target, "category created");
                self.load_tree().await;
                ActionOutcome::Completed(())
            }
            Err(error) => self.fail(CONTEXT, error.into()),
        }
    }

    async fn gated<F, Fut, T>(&self, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let outcome = self.inner.gate.guard(action).await;
        self.publish_health();
        if outcome.is_none() {
            debug!("action skipped; backend frozen");
        }
        outcome
    }

    async fn reload_after(&self, reload: Reload) -> LifecycleState {
        if !reload.after.is_zero() {
            tokio::time::sleep(reload.after).await;
        }
        self.load().await
    }

    async fn expire_session(&self) {
        info!("session idle budget exhausted; logging out");
        let reload = self.inner.lifecycle.logout().await;
        self.reload_after(reload).await;
    }

    fn start_session_timer(&self) {
        let weak: Weak<AppInner> = Arc::downgrade(&self.inner);
        let timer = SessionTimer::start(self.inner.idle_timeout, move || async move {
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(async move { App { inner }.expire_session().await });
            }
        });

        let mut updates = timer.subscribe();
        let ui = self.inner.ui.clone();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = *updates.borrow_and_update();
                ui.send_modify(|ui| ui.apply_session(&state));
            }
        });

        let snapshot = timer.snapshot();
        self.inner.ui.send_modify(|ui| ui.apply_session(&snapshot));
        *self.lock_timer() = Some(timer);
    }

    fn stop_session_timer(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.stop();
        }
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<SessionTimer>> {
        self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_health(&self) {
        let state = self.inner.gate.current();
        self.inner.ui.send_modify(|ui| ui.apply_health(&state));
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        self.inner.ui.send_modify(|ui| ui.notify(level, message));
    }

    fn fail<T>(&self, context: &str, error: AppError) -> ActionOutcome<T> {
        let message = format!("{context}: {}", error.user_message());
        let detail = redact_sensitive(&error.to_string());
        match error.failure_class() {
            FailureClass::Availability => warn!(error = %detail, context, "backend unavailable"),
            FailureClass::Domain => info!(error = %detail, context, "server rejected action"),
            FailureClass::Validation => debug!(error = %detail, context, "input rejected"),
        }
        self.notify(NotificationLevel::Error, message.clone());
        ActionOutcome::Failed(message)
    }
}
