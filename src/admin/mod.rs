//! Authenticated admin API.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/admin/status` | version and running flag |
//! | GET | `/admin/profiles` | discovered profiles |
//! | GET | `/admin/logs` | activity journal |
//! | POST | `/admin/refresh/start` | start the rotation loop |
//! | POST | `/admin/refresh/stop` | stop the rotation loop |
//! | POST | `/admin/refresh/safe` | one manual pass |
//! | GET | `/admin/quarantine` | quarantined profiles |
//! | POST | `/admin/quarantine/reset` | clear one quarantine |
//! | POST | `/admin/proxies` | assign proxy descriptors |
//! | GET | `/admin/summary` | fleet overview |

pub mod auth;
pub mod handlers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/profiles", get(get_profiles))
        .route("/admin/logs", get(get_logs))
        .route("/admin/refresh/start", post(start_refresh))
        .route("/admin/refresh/stop", post(stop_refresh))
        .route("/admin/refresh/safe", post(safe_refresh))
        .route("/admin/quarantine", get(get_quarantine))
        .route("/admin/quarantine/reset", post(reset_quarantine))
        .route("/admin/proxies", post(set_proxies))
        .route("/admin/summary", get(get_summary))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
