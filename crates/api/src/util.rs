use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::ApiError;

/// Pull the bearer credential out of an authorization header value.
///
/// The scheme token matches case-insensitively, with or without a following
/// space ("Bearer x", "bearer x", "Bearerx" all yield "x"), and the token is
/// trimmed. Mirrors what the mobile clients actually send.
fn parse_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let scheme = value.get(..6)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = value[6..].trim();
    if token.is_empty() {
        return None;
    }

    Some(token)
}

/// Soft extraction for the connection handshake: absent or malformed
/// credentials yield None and the caller proceeds unauthenticated.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(parse_bearer)
        .map(str::to_string)
}

/// Hard extraction for REST operations that require a principal.
pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    parse_bearer(value)
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        for value in ["Bearer TOKEN123", "bearer TOKEN123", "BEARER TOKEN123"] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
            let token = require_bearer(&headers).expect("token should be extracted");
            assert_eq!(token, "TOKEN123");
        }
    }

    #[test]
    fn require_bearer_accepts_missing_space() {
        let token = require_bearer(&headers_with("BearerTOKEN123")).unwrap();
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_trims_padding() {
        let token = require_bearer(&headers_with("  Bearer   TOKEN123  ")).unwrap();
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token() {
        let error = require_bearer(&headers_with("Bearer")).expect_err("should reject");
        assert_eq!(error.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn require_bearer_rejects_foreign_scheme() {
        let error = require_bearer(&headers_with("Basic dXNlcjpwdw==")).expect_err("should reject");
        assert_eq!(error.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_is_soft() {
        assert!(bearer_token(&HeaderMap::new()).is_none());
        assert!(bearer_token(&headers_with("Basic zzz")).is_none());
        assert_eq!(
            bearer_token(&headers_with("bearer abc")).as_deref(),
            Some("abc")
        );
    }
}
