//! Integration tests for runtime status projection.

use talos_app::project_runtime_status;
use talos_auth::{ActiveSession, LifecycleState, LoginForm, SessionMode, SessionState};
use talos_contract::{AuthMethod, HealthReport};
use talos_health::FreezeState;
use talos_ui::UiState;

#[test]
fn runtime_status_projection_tests_reflects_active_vault() {
    let mut state = UiState::new("v0.1.0");
    state.enter(&LifecycleState::Active(ActiveSession {
        method: AuthMethod::MutualTls,
    }));
    state.apply_health(&FreezeState {
        frozen: false,
        report: HealthReport {
            storage: true,
            bunker: true,
        },
    });
    state.apply_session(&SessionState {
        mode: SessionMode::Active,
        remaining_seconds: 125,
    });

    let snapshot = project_runtime_status(&state);
    assert_eq!(snapshot.screen, "Vault");
    assert_eq!(snapshot.badge, "DIPLOMATIC");
    assert_eq!(snapshot.storage, "ONLINE");
    assert_eq!(snapshot.bunker, "ONLINE");
    assert_eq!(snapshot.session, "02:05");
    assert!(snapshot.actions_allowed);
}

#[test]
fn runtime_status_projection_tests_blocks_actions_when_frozen() {
    let mut state = UiState::new("v0.1.0");
    state.enter(&LifecycleState::Active(ActiveSession {
        method: AuthMethod::MasterKey,
    }));
    state.apply_health(&FreezeState {
        frozen: true,
        report: HealthReport {
            storage: true,
            bunker: false,
        },
    });

    let snapshot = project_runtime_status(&state);
    assert_eq!(snapshot.bunker, "OFFLINE");
    assert!(!snapshot.actions_allowed);
}

#[test]
fn runtime_status_projection_tests_hides_session_outside_vault() {
    let mut state = UiState::new("v0.1.0");
    state.enter(&LifecycleState::AwaitingLogin(LoginForm::new()));

    let snapshot = project_runtime_status(&state);
    assert_eq!(snapshot.screen, "Login");
    assert!(snapshot.badge.is_empty());
    assert!(snapshot.session.is_empty());
    assert_eq!(snapshot.storage, "UNKNOWN");
    assert!(!snapshot.actions_allowed);
}
