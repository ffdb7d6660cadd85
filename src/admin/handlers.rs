//! Admin endpoint handlers.
//!
//! Every response is a JSON envelope: `{"ok": true, ...}` on success,
//! `{"ok": false, "error": "..."}` otherwise.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::http::server::AppState;
use crate::scheduler::Summary;
use crate::state::ControlError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ControlError::InvalidRequest(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub ok: bool,
    pub version: &'static str,
    pub running: bool,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub summary: Summary,
}

/// Lenient JSON body: an empty body reads as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        running: state.scheduler.is_running(),
    })
}

pub async fn get_profiles(State(state): State<AppState>) -> Json<Value> {
    let profiles = state.scheduler.profiles().await;
    Json(json!({ "ok": true, "count": profiles.len(), "profiles": profiles }))
}

pub async fn get_logs(State(state): State<AppState>) -> Json<Value> {
    let logs: Vec<String> = state.scheduler.activity().iter().map(|e| e.render()).collect();
    Json(json!({ "ok": true, "logs": logs }))
}

pub async fn start_refresh(State(state): State<AppState>) -> Json<Value> {
    let started = state.scheduler.start_scheduler();
    let message = if started { "scheduler started" } else { "scheduler already running" };
    Json(json!({ "ok": true, "started": started, "message": message }))
}

pub async fn stop_refresh(State(state): State<AppState>) -> Json<Value> {
    let stopped = state.scheduler.stop_scheduler().await;
    let message = if stopped { "scheduler stopped" } else { "scheduler was not running" };
    Json(json!({ "ok": true, "stopped": stopped, "message": message }))
}

pub async fn safe_refresh(State(state): State<AppState>) -> Json<Value> {
    let report = state.scheduler.run_on_demand_pass().await;
    Json(json!({ "ok": true, "refreshed": report.refreshed, "report": report }))
}

pub async fn get_quarantine(State(state): State<AppState>) -> Json<Value> {
    let quarantined = state.scheduler.list_quarantined();
    Json(json!({ "ok": true, "count": quarantined.len(), "quarantined": quarantined }))
}

pub async fn reset_quarantine(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_body(&body)?;
    let profile = body
        .get("profile")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'profile'".to_string()))?;

    state.scheduler.reset_quarantine(profile)?;
    Ok(Json(json!({ "ok": true, "message": format!("Quarantine reset for {profile}") })))
}

pub async fn set_proxies(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_body(&body)?;
    let proxies = match body.get("proxies") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(id, descriptor)| match descriptor.as_str() {
                Some(d) => Ok((id.clone(), d.to_string())),
                None => Err(ApiError::BadRequest(format!("proxy for {id} must be a string"))),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?,
        Some(_) => return Err(ApiError::BadRequest("'proxies' must be an object".to_string())),
    };

    if proxies.is_empty() {
        return Ok(Json(json!({ "ok": true, "applied": 0, "message": "no proxies applied" })));
    }
    let applied = state.scheduler.set_proxies(&proxies)?;
    Ok(Json(json!({ "ok": true, "applied": applied })))
}

pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        ok: true,
        summary: state.scheduler.summary().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_errors_map_to_status() {
        let not_found: ApiError = ControlError::NotFound("Profile 9".to_string()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = ControlError::InvalidRequest("empty".to_string()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_body_accepts_empty() {
        assert_eq!(parse_body(&Bytes::from_static(b"  ")).unwrap(), json!({}));
        assert!(parse_body(&Bytes::from_static(b"{nope")).is_err());
    }
}
