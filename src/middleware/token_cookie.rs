//! Token transport adapter: cookie → Authorization header.
//!
//! Browser clients cannot always set the Authorization header (e.g. plain
//! `<img>`/navigation requests), so a configured cookie may carry the bearer
//! token instead. This middleware promotes it to the canonical carrier before
//! the auth guard runs. Pure request rewrite; it never rejects.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::state::AppState;

/// Apply strictly outside (before) the auth guard layer.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, token_cookie_middleware))
}

async fn token_cookie_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if bearer_token(req.headers()).is_none()
        && let Some(token) = cookie_value(req.headers(), &state.auth.token_cookie)
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
    {
        req.headers_mut().insert(header::AUTHORIZATION, value);
    }

    next.run(req).await
}

/// Bearer token from the Authorization header, or `None` when absent/empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// Cookie header parsing: just enough for `name=value` pairs. Values are
// taken verbatim (tokens are base64url, so no decoding is needed).
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        let Ok(raw) = header_value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.trim().split_once('=')
                && k == name
                && !v.is_empty()
            {
                return Some(v.to_string());
            }
        }
    }
    None
}
