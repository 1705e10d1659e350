//! HTTP request handlers.

use super::AppState;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

// ============================================================================
// Templates (simple string replacement over embedded files)
// ============================================================================

const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");
const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.scheduler.all_status().await;
    let report_json = serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string());

    let sweep_minutes = state.config.sweep_interval.as_secs() / 60;
    let content = DASHBOARD_TEMPLATE
        .replace("{{report_json}}", &report_json)
        .replace("{{sweep_minutes}}", &sweep_minutes.to_string())
        .replace("{{space_count}}", &state.config.targets.len().to_string());

    let page = LAYOUT_TEMPLATE
        .replace("{{title}}", "SpaceKeeper")
        .replace("{{content}}", &content);

    Html(page)
}

// ============================================================================
// JSON API
// ============================================================================

pub async fn handle_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.all_status().await)
}

/// Query for the manual wake/restart actions. `space` is the canonical
/// parameter; `target` is accepted as an alias.
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl ActionQuery {
    fn space_id(self) -> Option<String> {
        self.space.or(self.target)
    }
}

pub async fn handle_wake(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> impl IntoResponse {
    let id = match query.space_id() {
        Some(id) => id,
        None => return missing_space_param(),
    };

    match state.config.target(&id) {
        Some(target) => Json(state.reactivator.wake(target).await).into_response(),
        None => unknown_space(&id),
    }
}

pub async fn handle_restart(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
) -> impl IntoResponse {
    let id = match query.space_id() {
        Some(id) => id,
        None => return missing_space_param(),
    };

    match state.config.target(&id) {
        Some(target) => Json(state.reactivator.restart(target).await).into_response(),
        None => unknown_space(&id),
    }
}

fn missing_space_param() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "message": "missing space parameter" })),
    )
        .into_response()
}

fn unknown_space(id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": format!("unknown space: {}", id) })),
    )
        .into_response()
}

// ============================================================================
// Static Assets
// ============================================================================

pub async fn handle_favicon() -> impl IntoResponse {
    // Return a simple SVG favicon
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <circle cx="50" cy="50" r="45" fill="#667eea"/>
        <path d="M30 62 Q50 28 70 62" stroke="white" stroke-width="6" fill="none"/>
        <circle cx="50" cy="44" r="6" fill="white"/>
    </svg>"##;

    ([(axum::http::header::CONTENT_TYPE, "image/svg+xml")], svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_query_prefers_space_over_alias() {
        let q = ActionQuery {
            space: Some("acme/a".into()),
            target: Some("acme/b".into()),
        };
        assert_eq!(q.space_id().as_deref(), Some("acme/a"));

        let q = ActionQuery {
            space: None,
            target: Some("acme/b".into()),
        };
        assert_eq!(q.space_id().as_deref(), Some("acme/b"));

        let q = ActionQuery {
            space: None,
            target: None,
        };
        assert!(q.space_id().is_none());
    }
}
