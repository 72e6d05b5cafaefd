#![warn(missing_docs)]
//! # talos-health
//!
//! ## Purpose
//! Gates sensitive client actions on backend liveness.
//!
//! ## Responsibilities
//! - Probe storage and bunker liveness through an injectable [`HealthProbe`].
//! - Publish a frozen/unfrozen indicator to subscribers.
//! - Run a gated action only when both subsystems report healthy.
//!
//! ## Data flow
//! Action request -> [`HealthGate::guard`] -> probe -> indicator update ->
//! action runs (healthy) or is skipped (frozen).
//!
//! ## Ownership and lifetimes
//! The gate owns the indicator sender; subscribers hold cheap
//! `watch::Receiver` clones. No probe result is cached between calls.
//!
//! ## Error model
//! Probe failures are folded into [`HealthReport::offline`]; callers never see
//! a probe error, only a frozen gate.
//!
//! ## Security and privacy notes
//! Health payloads carry no secrets.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use talos_contract::{ApiError, HealthReport};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Source of liveness reports.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Queries subsystem liveness.
    async fn probe(&self) -> Result<HealthReport, ApiError>;
}

/// Indicator published after every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeState {
    /// `true` while sensitive actions are blocked.
    pub frozen: bool,
    /// Report that produced this state.
    pub report: HealthReport,
}

impl FreezeState {
    fn from_report(report: HealthReport) -> Self {
        Self {
            frozen: !report.is_healthy(),
            report,
        }
    }
}

impl Default for FreezeState {
    fn default() -> Self {
        Self::from_report(HealthReport::offline())
    }
}

/// Fail-closed liveness gate.
#[derive(Clone)]
pub struct HealthGate {
    probe: Arc<dyn HealthProbe>,
    indicator: Arc<watch::Sender<FreezeState>>,
}

impl HealthGate {
    /// Creates a gate. The indicator starts frozen until the first probe.
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            probe,
            indicator: Arc::new(watch::Sender::new(FreezeState::default())),
        }
    }

    /// Queries liveness. Any probe failure yields an all-false report.
    pub async fn probe(&self) -> HealthReport {
        match self.probe.probe().await {
            Ok(report) => report,
            Err(error) => {
                warn!(%error, "health probe failed; treating backend as offline");
                HealthReport::offline()
            }
        }
    }

    /// Probes, publishes the indicator and returns `true` when healthy.
    pub async fn check(&self) -> bool {
        let state = FreezeState::from_report(self.probe().await);
        if self.indicator.borrow().frozen != state.frozen {
            debug!(frozen = state.frozen, ?state.report, "freeze indicator changed");
        }
        self.indicator.send_replace(state);
        !state.frozen
    }

    /// Runs `action` only when a fresh probe reports both subsystems healthy.
    ///
    /// Returns `None` without running the action when frozen.
    pub async fn guard<F, Fut, T>(&self, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.check().await {
            return None;
        }
        Some(action().await)
    }

    /// Returns the latest published indicator.
    pub fn current(&self) -> FreezeState {
        *self.indicator.borrow()
    }

    /// Subscribes to indicator updates.
    pub fn subscribe(&self) -> watch::Receiver<FreezeState> {
        self.indicator.subscribe()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for indicator derivation.

    use super::*;

    #[test]
    fn indicator_is_frozen_unless_both_subsystems_are_up() {
        let report = |storage, bunker| HealthReport { storage, bunker };

        assert!(FreezeState::from_report(report(true, false)).frozen);
        assert!(FreezeState::from_report(report(false, true)).frozen);
        assert!(!FreezeState::from_report(report(true, true)).frozen);
        assert!(FreezeState::default().frozen);
    }
}
