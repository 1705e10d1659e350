//! Status probe: queries a space's reported lifecycle stage, classifies it
//! and applies the state transition under the space's lock.
//!
//! Every failure mode comes back as a well-formed [`ProbeResult`]; nothing
//! escapes this boundary as an error.

mod api;

pub use api::*;

use crate::config::{AppConfig, SpaceTarget};
use crate::format::format_duration;
use crate::state::{Classification, StateStore, NEVER};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Probe error types. Internal to the probe; callers only ever see a
/// [`ProbeResult`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed status response: {0}")]
    Malformed(String),
}

/// Bounded retry policy for status probes: up to `max_attempts` requests
/// with a fixed delay between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from the configured number of extra attempts.
    pub fn with_retries(retry_count: u32) -> Self {
        Self {
            max_attempts: retry_count.saturating_add(1).max(1),
            backoff: Duration::from_secs(1),
        }
    }

    /// Delay to wait before the given 0-indexed attempt. The first attempt
    /// runs immediately.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            None
        } else {
            Some(self.backoff)
        }
    }

    /// Whether another attempt remains after `attempt` failed.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Result of one probe. Always well-formed, whatever happened on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub classification: Classification,
    /// Short human description of the classification.
    pub status_desc: &'static str,
    /// Raw stage string as reported by the API, when one was parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// HTTP status of the API response; 0 when no response was received.
    pub http_status: u16,
    /// Time to the API response, or the cumulative elapsed time across all
    /// attempts when the probe failed.
    pub latency_ms: u64,
    pub observed_at: DateTime<Utc>,
    /// Formatted uptime while running, otherwise one of the sentinels
    /// `asleep`, `starting`, `unavailable`.
    pub uptime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<i64>,
    /// Epoch ms of the last transition into running; [`NEVER`] if unset.
    /// The dashboard ticker advances the uptime display from this value.
    pub active_since_ms: i64,
    pub consecutive_idle: u32,
    /// Failure detail, when the probe exhausted its retry budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Uptime cell for a classification: a formatted duration while running,
/// a sentinel otherwise.
fn uptime_label(classification: Classification, uptime_ms: Option<i64>) -> String {
    match classification {
        Classification::Running => format_duration(uptime_ms.unwrap_or(0)),
        Classification::Idle => "asleep".to_string(),
        Classification::Transitioning => "starting".to_string(),
        Classification::Unknown => "unavailable".to_string(),
    }
}

/// Probes the status API and owns the classification side of the state
/// machine.
pub struct Prober {
    client: reqwest::Client,
    store: Arc<StateStore>,
    retry: RetryPolicy,
    api_token: Option<String>,
}

impl Prober {
    pub fn new(client: reqwest::Client, store: Arc<StateStore>, cfg: &AppConfig) -> Self {
        Self {
            client,
            store,
            retry: RetryPolicy::with_retries(cfg.retry_count),
            api_token: cfg.api_token.clone(),
        }
    }

    /// Probe one space and apply the state transition.
    ///
    /// The space's lock is held for the whole call, so concurrent probes or
    /// a wake racing this probe serialize their updates. Transport failures
    /// are retried per the policy and, once the budget is spent, reported
    /// without touching the space's state.
    pub async fn probe(&self, target: &SpaceTarget) -> ProbeResult {
        let handle = match self.store.state(&target.space) {
            Some(h) => h,
            None => return Self::untracked_result(target),
        };
        let mut st = handle.lock().await;

        // Jitter so a fan-out over many spaces does not stampede the API
        let jitter = rand::random::<u64>() % 100;
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let started = Instant::now();
        let mut attempt = 0;

        loop {
            if let Some(delay) = self.retry.delay_before(attempt) {
                tokio::time::sleep(delay).await;
            }

            match self.fetch_stage(target).await {
                Ok((http_status, info, latency_ms)) => {
                    let now = Utc::now();
                    let now_ms = now.timestamp_millis();
                    let stage = info.stage().map(str::to_string);
                    let classification = classify(stage.as_deref());

                    if classification == Classification::Running
                        && st.last_classification != Classification::Running
                    {
                        tracing::info!("[{}] became running at {}", target.space, now);
                    }

                    let uptime_ms = st.observe(classification, now_ms);

                    return ProbeResult {
                        classification,
                        status_desc: classification.describe(),
                        stage,
                        http_status,
                        latency_ms,
                        observed_at: now,
                        uptime: uptime_label(classification, uptime_ms),
                        uptime_ms,
                        active_since_ms: st.active_since_ms,
                        consecutive_idle: st.consecutive_idle,
                        detail: None,
                    };
                }
                Err(e) => {
                    if self.retry.has_next(attempt) {
                        tracing::warn!("[{}] probe attempt {} failed: {}", target.space, attempt + 1, e);
                        attempt += 1;
                        continue;
                    }

                    tracing::error!("[{}] probe failed after {} attempts: {}", target.space, attempt + 1, e);

                    // Retry budget spent: report with cumulative elapsed time
                    // and leave the space's state exactly as it was.
                    return ProbeResult {
                        classification: Classification::Unknown,
                        status_desc: Classification::Unknown.describe(),
                        stage: None,
                        http_status: 0,
                        latency_ms: started.elapsed().as_millis() as u64,
                        observed_at: Utc::now(),
                        uptime: "unavailable".to_string(),
                        uptime_ms: None,
                        active_since_ms: st.active_since_ms,
                        consecutive_idle: st.consecutive_idle,
                        detail: Some(e.to_string()),
                    };
                }
            }
        }
    }

    async fn fetch_stage(&self, target: &SpaceTarget) -> Result<(u16, SpaceInfo, u64), ProbeError> {
        let url = status_url(&target.space);
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, API_USER_AGENT);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let started = Instant::now();
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let http_status = resp.status().as_u16();
        let info = resp
            .json::<SpaceInfo>()
            .await
            .map_err(|e| ProbeError::Malformed(e.to_string()))?;

        Ok((http_status, info, latency_ms))
    }

    fn untracked_result(target: &SpaceTarget) -> ProbeResult {
        ProbeResult {
            classification: Classification::Unknown,
            status_desc: Classification::Unknown.describe(),
            stage: None,
            http_status: 0,
            latency_ms: 0,
            observed_at: Utc::now(),
            uptime: "unavailable".to_string(),
            uptime_ms: None,
            active_since_ms: NEVER,
            consecutive_idle: 0,
            detail: Some(format!("space {} is not tracked", target.space)),
        }
    }
}
