//! Remote status API: request URLs, response shape, stage classification.

use crate::state::Classification;

use serde::Deserialize;

/// Base URL of the hosting platform's public API.
pub const API_BASE: &str = "https://huggingface.co";

/// User agent sent on status and restart requests.
pub const API_USER_AGENT: &str = "spacekeeper/0.1";

/// Status endpoint for a space; the API accepts the raw `owner/name` form.
pub fn status_url(space: &str) -> String {
    format!("{}/api/spaces/{}", API_BASE, space)
}

/// Privileged restart endpoint for a space.
pub fn restart_url(space: &str) -> String {
    format!("{}/api/spaces/{}/restart", API_BASE, space)
}

/// Status response body. Everything except the runtime stage is ignored.
#[derive(Debug, Deserialize)]
pub struct SpaceInfo {
    #[serde(default)]
    pub runtime: Option<SpaceRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct SpaceRuntime {
    #[serde(default)]
    pub stage: Option<String>,
}

impl SpaceInfo {
    pub fn stage(&self) -> Option<&str> {
        self.runtime.as_ref().and_then(|r| r.stage.as_deref())
    }
}

/// Map a reported lifecycle stage onto the fixed classification set.
///
/// Anything unexpected, including a missing or malformed stage field, lands
/// in the `Unknown` arm rather than being guessed at.
pub fn classify(stage: Option<&str>) -> Classification {
    match stage {
        Some("RUNNING") => Classification::Running,
        Some("SLEEPING") => Classification::Idle,
        Some("BUILDING") | Some("STARTING") => Classification::Transitioning,
        _ => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_stages() {
        assert_eq!(classify(Some("RUNNING")), Classification::Running);
        assert_eq!(classify(Some("SLEEPING")), Classification::Idle);
        assert_eq!(classify(Some("BUILDING")), Classification::Transitioning);
        assert_eq!(classify(Some("STARTING")), Classification::Transitioning);
    }

    #[test]
    fn test_classify_defaults_to_unknown() {
        assert_eq!(classify(Some("PAUSED")), Classification::Unknown);
        assert_eq!(classify(Some("running")), Classification::Unknown);
        assert_eq!(classify(Some("")), Classification::Unknown);
        assert_eq!(classify(None), Classification::Unknown);
    }

    #[test]
    fn test_parse_status_body() {
        let body = r#"{"id":"acme/demo","runtime":{"stage":"RUNNING","hardware":"cpu-basic"}}"#;
        let info: SpaceInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.stage(), Some("RUNNING"));
    }

    #[test]
    fn test_parse_status_body_without_runtime() {
        let info: SpaceInfo = serde_json::from_str(r#"{"id":"acme/demo"}"#).unwrap();
        assert_eq!(info.stage(), None);
        assert_eq!(classify(info.stage()), Classification::Unknown);

        let info: SpaceInfo = serde_json::from_str(r#"{"runtime":{}}"#).unwrap();
        assert_eq!(info.stage(), None);
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            status_url("acme/demo"),
            "https://huggingface.co/api/spaces/acme/demo"
        );
        assert_eq!(
            restart_url("acme/demo"),
            "https://huggingface.co/api/spaces/acme/demo/restart"
        );
    }
}
