// ABOUTME: Bearer token middleware guarding the deploy endpoint.
// ABOUTME: Compares tokens in constant time; rejects with 401 "Not Authorized".

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use super::AppState;
use super::error::ApiError;

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The token must be a single non-empty word with no surrounding text.
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty() && !token.chars().any(char::is_whitespace))
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, a dummy comparison keeps timing independent of where
/// the mismatch is.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Reject requests that lack the configured bearer token.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| token_matches(token, state.secret_key.expose()));

    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejected request with missing or invalid bearer token");
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}
