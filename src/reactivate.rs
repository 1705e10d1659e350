//! Reactivation actions: the best-effort wake and the privileged restart.
//!
//! Wake is an unauthenticated, browser-like GET against the space's public
//! URL; restart is an authenticated POST against the platform API. Both
//! report their outcome as data and never propagate errors to the caller.

use crate::config::{AppConfig, SpaceTarget};
use crate::format::format_duration;
use crate::probe::{restart_url, API_USER_AGENT};
use crate::state::StateStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// User agent for wake requests. Free-tier spaces only count page loads from
/// something that looks like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Outcome of a wake attempt. A debounce refusal is a defined outcome, not
/// an error: `success` is false and `message` says why.
#[derive(Debug, Clone, Serialize)]
pub struct WakeResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a restart attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RestartResult {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Issues wake and restart requests and records their effect on the space's
/// state.
pub struct Reactivator {
    client: reqwest::Client,
    store: Arc<StateStore>,
    debounce: Duration,
    api_token: Option<String>,
}

impl Reactivator {
    pub fn new(client: reqwest::Client, store: Arc<StateStore>, cfg: &AppConfig) -> Self {
        Self {
            client,
            store,
            debounce: cfg.wake_debounce,
            api_token: cfg.api_token.clone(),
        }
    }

    /// Wake a space with a best-effort page load.
    ///
    /// Refused inside the debounce window without touching any state or the
    /// network. Only a 2xx response arms the debounce timer; a failed wake
    /// leaves it unarmed so a legitimate retry is not blocked.
    pub async fn wake(&self, target: &SpaceTarget) -> WakeResult {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let handle = match self.store.state(&target.space) {
            Some(h) => h,
            None => {
                return WakeResult {
                    success: false,
                    message: format!("space {} is not tracked", target.space),
                    http_status: None,
                    timestamp: now,
                }
            }
        };
        let mut st = handle.lock().await;

        let window_ms = self.debounce.as_millis() as i64;
        if let Some(remaining) = st.wake_blocked_for(now_ms, window_ms) {
            return WakeResult {
                success: false,
                message: format!(
                    "already woken within the last {}, retry in {}",
                    format_duration(window_ms),
                    format_duration(remaining)
                ),
                http_status: None,
                timestamp: now,
            };
        }

        let sent = self
            .client
            .get(&target.url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await;

        match sent {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    st.record_wake(now_ms);
                    tracing::info!("[{}] wake request sent ({})", target.space, status.as_u16());
                    WakeResult {
                        success: true,
                        message: "wake request sent".to_string(),
                        http_status: Some(status.as_u16()),
                        timestamp: now,
                    }
                } else {
                    WakeResult {
                        success: false,
                        message: format!("wake failed ({})", status.as_u16()),
                        http_status: Some(status.as_u16()),
                        timestamp: now,
                    }
                }
            }
            Err(e) => WakeResult {
                success: false,
                message: format!("wake error: {}", e),
                http_status: None,
                timestamp: now,
            },
        }
    }

    /// Restart a space through the platform API.
    ///
    /// Fails fast without a network call when no API token is configured.
    /// A successful restart resets the running-since timestamp but leaves
    /// the wake debounce alone; the two actions are gated independently.
    /// Never retried here.
    pub async fn restart(&self, target: &SpaceTarget) -> RestartResult {
        let now = Utc::now();

        let token = match &self.api_token {
            Some(t) => t,
            None => {
                return RestartResult {
                    success: false,
                    message: "HF_API_TOKEN is not configured".to_string(),
                    timestamp: now,
                }
            }
        };

        let handle = match self.store.state(&target.space) {
            Some(h) => h,
            None => {
                return RestartResult {
                    success: false,
                    message: format!("space {} is not tracked", target.space),
                    timestamp: now,
                }
            }
        };
        let mut st = handle.lock().await;

        let sent = self
            .client
            .post(restart_url(&target.space))
            .header(reqwest::header::USER_AGENT, API_USER_AGENT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .send()
            .await;

        match sent {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    st.record_restart(Utc::now().timestamp_millis());
                    tracing::info!("[{}] restart request sent", target.space);
                    RestartResult {
                        success: true,
                        message: "restart request sent".to_string(),
                        timestamp: now,
                    }
                } else {
                    RestartResult {
                        success: false,
                        message: format!("restart failed ({})", status.as_u16()),
                        timestamp: now,
                    }
                }
            }
            Err(e) => RestartResult {
                success: false,
                message: format!("restart error: {}", e),
                timestamp: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NEVER;

    fn fixture() -> (Reactivator, Arc<StateStore>, SpaceTarget) {
        let cfg = AppConfig::default();
        let target = cfg.targets[0].clone();
        let store = Arc::new(StateStore::new(&cfg.targets));
        let client = reqwest::Client::new();
        let reactivator = Reactivator::new(client, store.clone(), &cfg);
        (reactivator, store, target)
    }

    #[tokio::test]
    async fn test_wake_refused_inside_debounce_window() {
        let (reactivator, store, target) = fixture();

        // Arm the debounce as if a wake just succeeded
        let now_ms = Utc::now().timestamp_millis();
        {
            let handle = store.state(&target.space).unwrap();
            handle.lock().await.record_wake(now_ms);
        }

        // Refused before any network I/O, with the reason spelled out
        let result = reactivator.wake(&target).await;
        assert!(!result.success);
        assert!(result.message.contains("already woken"), "{}", result.message);
        assert!(result.http_status.is_none());

        // The refusal must not move the debounce timestamp
        let handle = store.state(&target.space).unwrap();
        assert_eq!(handle.lock().await.last_wake_ms, now_ms);
    }

    #[tokio::test]
    async fn test_restart_without_token_fails_fast() {
        let (reactivator, store, target) = fixture();

        let result = reactivator.restart(&target).await;
        assert!(!result.success);
        assert!(result.message.contains("HF_API_TOKEN"), "{}", result.message);

        // No state was touched
        let handle = store.state(&target.space).unwrap();
        let st = handle.lock().await;
        assert_eq!(st.active_since_ms, NEVER);
        assert_eq!(st.last_wake_ms, NEVER);
    }

    #[tokio::test]
    async fn test_wake_on_unknown_space_reports_failure() {
        let (reactivator, _store, mut target) = fixture();
        target.space = "acme/ghost".to_string();

        let result = reactivator.wake(&target).await;
        assert!(!result.success);
        assert!(result.message.contains("not tracked"));
    }
}
