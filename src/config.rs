//! Configuration module for SpaceKeeper.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The target list may come from a JSON file; without one, a baked-in sample
//! target is used so a fresh deployment has something to watch.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// One remotely hosted space being kept alive. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceTarget {
    /// Display name shown on the dashboard.
    pub name: String,
    /// Region label, informational only.
    #[serde(default)]
    pub region: String,
    /// Public URL used for best-effort wake requests.
    pub url: String,
    /// Remote API identifier, e.g. `owner/space`.
    pub space: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Spaces to keep alive.
    pub targets: Vec<SpaceTarget>,
    /// Timeout for a single status or wake request (default: 30s)
    pub probe_timeout: Duration,
    /// Extra probe attempts after the first failure (default: 1)
    pub retry_count: u32,
    /// Minimum time between successful wakes of the same space (default: 10m)
    pub wake_debounce: Duration,
    /// Consecutive idle observations before the sweep wakes a space (default: 1)
    pub wake_threshold: u32,
    /// Interval between keep-alive sweeps (default: 15m)
    pub sweep_interval: Duration,
    /// API token enabling the privileged restart escalation. An absent token
    /// disables restart, not wake.
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            targets: sample_targets(),
            probe_timeout: Duration::from_secs(30),
            retry_count: 1,
            wake_debounce: Duration::from_secs(10 * 60),
            wake_threshold: 1,
            sweep_interval: Duration::from_secs(15 * 60),
            api_token: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SPACEKEEPER_HTTP_PORT`: HTTP port (default: 8080)
    /// - `SPACEKEEPER_TARGETS`: path to a JSON array of targets
    /// - `SPACEKEEPER_TIMEOUT_MS`: per-request timeout in milliseconds
    /// - `SPACEKEEPER_RETRY_COUNT`: extra probe attempts after a failure
    /// - `SPACEKEEPER_DEBOUNCE_MS`: wake debounce window in milliseconds
    /// - `SPACEKEEPER_WAKE_THRESHOLD`: idle observations before auto-wake
    /// - `SPACEKEEPER_SWEEP_INTERVAL_SECS`: seconds between keep-alive sweeps
    /// - `HF_API_TOKEN`: API token for privileged restarts (optional)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("SPACEKEEPER_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(path) = env::var("SPACEKEEPER_TARGETS") {
            match load_targets(&path) {
                Ok(targets) if !targets.is_empty() => cfg.targets = targets,
                Ok(_) => tracing::warn!("Target file {} is empty, using sample target", path),
                Err(e) => tracing::warn!("Failed to load targets from {}: {}", path, e),
            }
        }

        if let Some(ms) = env_u64("SPACEKEEPER_TIMEOUT_MS") {
            cfg.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("SPACEKEEPER_RETRY_COUNT") {
            cfg.retry_count = n as u32;
        }
        if let Some(ms) = env_u64("SPACEKEEPER_DEBOUNCE_MS") {
            cfg.wake_debounce = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("SPACEKEEPER_WAKE_THRESHOLD") {
            cfg.wake_threshold = n as u32;
        }
        if let Some(secs) = env_u64("SPACEKEEPER_SWEEP_INTERVAL_SECS") {
            cfg.sweep_interval = Duration::from_secs(secs);
        }

        if let Ok(token) = env::var("HF_API_TOKEN") {
            if !token.is_empty() {
                cfg.api_token = Some(token);
            }
        }

        cfg
    }

    /// Look up a target by its remote API identifier.
    pub fn target(&self, space: &str) -> Option<&SpaceTarget> {
        self.targets.iter().find(|t| t.space == space)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn load_targets(path: &str) -> Result<Vec<SpaceTarget>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let targets = serde_json::from_str(&raw)?;
    Ok(targets)
}

fn sample_targets() -> Vec<SpaceTarget> {
    vec![SpaceTarget {
        name: "Space".to_string(),
        region: "Global".to_string(),
        url: "https://ic6-h2.hf.space".to_string(),
        space: "ic6/h2".to_string(),
        description: "Primary application space (free CPU tier)".to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.probe_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retry_count, 1);
        assert_eq!(cfg.wake_debounce, Duration::from_secs(600));
        assert_eq!(cfg.wake_threshold, 1);
        assert_eq!(cfg.sweep_interval, Duration::from_secs(900));
        assert!(cfg.api_token.is_none());
        assert_eq!(cfg.targets.len(), 1);
    }

    #[test]
    fn test_parse_target_list() {
        let raw = r#"[
            {"name": "Demo", "region": "EU", "url": "https://demo.example",
             "space": "acme/demo", "description": "demo app"},
            {"name": "Minimal", "url": "https://min.example", "space": "acme/min"}
        ]"#;
        let targets: Vec<SpaceTarget> = serde_json::from_str(raw).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].space, "acme/demo");
        // Optional fields default to empty strings
        assert_eq!(targets[1].region, "");
        assert_eq!(targets[1].description, "");
    }

    #[test]
    fn test_target_lookup() {
        let cfg = AppConfig::default();
        assert!(cfg.target("ic6/h2").is_some());
        assert!(cfg.target("nobody/nothing").is_none());
    }
}
