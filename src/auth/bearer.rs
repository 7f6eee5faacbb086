//! Bearer credential parsing.

use axum::http::{HeaderMap, header};

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns None when the header is
/// missing, is not valid ASCII, uses another scheme, or carries an empty token.
pub fn get_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_get_bearer_simple() {
        assert_eq!(get_bearer(&headers_with("Bearer abc123")), Some("abc123"));
    }

    #[test]
    fn test_get_bearer_case_insensitive_scheme() {
        assert_eq!(get_bearer(&headers_with("bearer abc123")), Some("abc123"));
        assert_eq!(get_bearer(&headers_with("BEARER abc123")), Some("abc123"));
    }

    #[test]
    fn test_get_bearer_with_spaces() {
        assert_eq!(get_bearer(&headers_with("  Bearer   abc123  ")), Some("abc123"));
    }

    #[test]
    fn test_get_bearer_empty_token() {
        assert_eq!(get_bearer(&headers_with("Bearer ")), None);
        assert_eq!(get_bearer(&headers_with("Bearer")), None);
    }

    #[test]
    fn test_get_bearer_other_scheme() {
        assert_eq!(get_bearer(&headers_with("Basic dXNlcjpwYXNz")), None);
    }

    #[test]
    fn test_get_bearer_no_header() {
        assert_eq!(get_bearer(&HeaderMap::new()), None);
    }
}
