//! API key check for admin routes.
//!
//! Accepts `Authorization: Bearer <key>` or `X-Auth-Token: <key>`.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::admin::handlers::ApiError;
use crate::http::server::AppState;

pub const X_AUTH_TOKEN: &str = "x-auth-token";

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer.or_else(|| headers.get(X_AUTH_TOKEN).and_then(|h| h.to_str().ok()))
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = presented_key(request.headers()).map(|key| key.trim() == &*state.api_key);
    match authorized {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with wrong API key");
            Err(ApiError::Unauthorized)
        }
        None => Err(ApiError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_key_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(X_AUTH_TOKEN, HeaderValue::from_static("token-key"));
        assert_eq!(presented_key(&headers), Some("token-key"));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer bearer-key"));
        assert_eq!(presented_key(&headers), Some("bearer-key"));
    }
}
