//! Google Docs endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `POST /api/googledocs/removeContent` - Remove a node's Google Docs content

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::api::{AppState, HttpError};
use crate::models::{Identity, RemovalResult};
use crate::services::RemovalError;

/// Header naming the user a request runs as
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3001/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Remove the Google Docs copy of a checked-out node
///
/// The body is read as raw bytes; a body that is not UTF-8 is reported like
/// any other unparseable JSON, with the (lossily decoded) raw content.
///
/// ```bash
/// curl -X POST http://localhost:3001/api/googledocs/removeContent \
///   -H 'X-Remote-User: alice' \
///   -d '{"nodeRef": "workspace://SpacesStore/123", "force": true}'
/// ```
async fn remove_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RemovalResult>, HttpError> {
    let body = std::str::from_utf8(&body).map_err(|_| {
        RemovalError::invalid_request(format!(
            "Unable to parse JSON: {}",
            String::from_utf8_lossy(&body)
        ))
    })?;

    let identity = requesting_identity(&headers, &state.config.default_user);
    let result = state.handler.handle(identity, body).await?;
    Ok(Json(result))
}

/// User from the `X-Remote-User` header, else `default_user`
fn requesting_identity(headers: &HeaderMap, default_user: &str) -> Identity {
    headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(Identity::user)
        .unwrap_or_else(|| Identity::user(default_user))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/googledocs/removeContent", post(remove_content))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(requesting_identity(&headers, "guest"), Identity::user("alice"));
    }

    #[test]
    fn test_identity_falls_back_to_default_user() {
        assert_eq!(requesting_identity(&HeaderMap::new(), "guest"), Identity::user("guest"));

        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("   "));
        assert_eq!(requesting_identity(&headers, "guest"), Identity::user("guest"));
    }
}
