//! Bearer token middleware.
//!
//! # Responsibility
//! - Resolve `Authorization: Bearer <token>` to the calling user once per
//!   request and expose it to handlers as an `AuthUser` extension.
//!
//! # Invariants
//! - Every route except `/api/health` requires a valid token.
//! - Rejected requests never reach a handler, so they never touch storage
//!   beyond the token lookup.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use log::warn;
use reminme_core::auth::resolve_token;
use reminme_core::UserId;
use std::sync::Arc;

/// Paths served without a token.
const PUBLIC_PATHS: &[&str] = &["/api/health"];

/// Authenticated caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

pub async fn auth_middleware_with_state(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(token) = bearer_token(request.headers()) else {
        return Err(ApiError::Unauthorized);
    };
    let user_id = state
        .with_conn(|conn| resolve_token(conn, token).map_err(ApiError::from))
        .inspect_err(|err| {
            if matches!(err, ApiError::Unauthorized) {
                warn!(
                    "event=auth_rejected module=server status=error path={}",
                    request.uri().path()
                );
            }
        })?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::bearer_token;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers
            .insert("authorization", HeaderValue::from_str(value)
            .expect("header value should be valid"));
        headers
    }

    #[test]
    fn bearer_token_accepts_any_scheme_case() {
        assert_eq!(bearer_token(&headers("Bearer rm_abc")), Some("rm_abc"));
        assert_eq!(bearer_token(&headers("bearer  rm_abc ")), Some("rm_abc"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
