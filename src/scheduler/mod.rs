//! Orchestration: concurrent status fan-out and the scheduled keep-alive
//! sweep that wakes idle spaces and escalates to restart when a wake fails.

use crate::config::{AppConfig, SpaceTarget};
use crate::probe::{ProbeResult, Prober};
use crate::reactivate::{Reactivator, RestartResult, WakeResult};
use crate::state::Classification;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

/// One space's static config merged with its latest probe result.
#[derive(Debug, Clone, Serialize)]
pub struct SpaceStatus {
    #[serde(flatten)]
    pub target: SpaceTarget,
    #[serde(flatten)]
    pub probe: ProbeResult,
}

/// Snapshot of every tracked space, consistent as of `generated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub spaces: BTreeMap<String, SpaceStatus>,
}

/// What one keep-alive sweep did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: usize,
    pub woken: u32,
    pub escalated: u32,
    pub failed: u32,
}

/// Reactivation actions the sweep drives. Split out so the sweep decision
/// logic is testable against a stub that never touches the network.
pub trait Reactivate {
    fn wake(&self, target: &SpaceTarget) -> impl Future<Output = WakeResult> + Send;
    fn restart(&self, target: &SpaceTarget) -> impl Future<Output = RestartResult> + Send;
}

impl Reactivate for Reactivator {
    async fn wake(&self, target: &SpaceTarget) -> WakeResult {
        Reactivator::wake(self, target).await
    }

    async fn restart(&self, target: &SpaceTarget) -> RestartResult {
        Reactivator::restart(self, target).await
    }
}

/// The main orchestrator: fans probes out across all spaces and runs the
/// periodic keep-alive sweep.
#[derive(Clone)]
pub struct Scheduler {
    config: Arc<AppConfig>,
    prober: Arc<Prober>,
    reactivator: Arc<Reactivator>,
}

impl Scheduler {
    pub fn new(config: Arc<AppConfig>, prober: Arc<Prober>, reactivator: Arc<Reactivator>) -> Self {
        Self {
            config,
            prober,
            reactivator,
        }
    }

    /// Probe every configured space concurrently and merge each result with
    /// its static config. The snapshot timestamp is recorded once per call.
    pub async fn all_status(&self) -> StatusReport {
        let generated_at = Utc::now();
        let mut set = JoinSet::new();

        for target in self.config.targets.clone() {
            let prober = self.prober.clone();
            set.spawn(async move {
                let probe = prober.probe(&target).await;
                SpaceStatus { target, probe }
            });
        }

        let mut spaces = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(status) => {
                    spaces.insert(status.target.space.clone(), status);
                }
                Err(e) => tracing::error!("Status probe task failed: {}", e),
            }
        }

        StatusReport {
            generated_at,
            spaces,
        }
    }

    /// One keep-alive pass: probe everything, wake what has been idle long
    /// enough, escalate to restart when a wake fails and a token is present.
    pub async fn run_keep_alive_sweep(&self) {
        let report = self.all_status().await;
        let summary = drive_wakes(
            &report,
            self.reactivator.as_ref(),
            self.config.wake_threshold,
            self.config.api_token.is_some(),
        )
        .await;

        tracing::info!(
            "Sweep done: {} spaces checked, {} woken, {} escalated, {} failed",
            summary.checked,
            summary.woken,
            summary.escalated,
            summary.failed
        );
    }

    /// Start the periodic sweep loop. The first tick fires immediately and
    /// doubles as the startup probe.
    pub fn start(&self) {
        let scheduler = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                scheduler.run_keep_alive_sweep().await;
            }
        });

        tracing::info!(
            "Keep-alive sweep scheduled every {:?} for {} spaces",
            self.config.sweep_interval,
            self.config.targets.len()
        );
    }
}

/// Wake every space whose latest classification is idle with enough
/// consecutive idle observations, escalating to restart when the wake fails
/// and restart is available. One space's outcome never aborts the rest.
pub(crate) async fn drive_wakes<R: Reactivate>(
    report: &StatusReport,
    reactivator: &R,
    wake_threshold: u32,
    can_restart: bool,
) -> SweepSummary {
    let mut summary = SweepSummary {
        checked: report.spaces.len(),
        ..SweepSummary::default()
    };

    for status in report.spaces.values() {
        if status.probe.classification != Classification::Idle
            || status.probe.consecutive_idle < wake_threshold
        {
            continue;
        }

        tracing::info!(
            "[{}] idle for {} consecutive checks, waking",
            status.target.space,
            status.probe.consecutive_idle
        );

        let wake = reactivator.wake(&status.target).await;
        if wake.success {
            summary.woken += 1;
            continue;
        }

        tracing::warn!("[{}] wake failed: {}", status.target.space, wake.message);

        if can_restart {
            let restart = reactivator.restart(&status.target).await;
            if restart.success {
                summary.escalated += 1;
            } else {
                summary.failed += 1;
                tracing::error!("[{}] restart failed: {}", status.target.space, restart.message);
            }
        } else {
            summary.failed += 1;
        }
    }

    summary
}
