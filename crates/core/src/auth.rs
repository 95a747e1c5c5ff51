//! Pre-shared key admission check.

use crate::types::QueryParams;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const BASIC_PREFIX: &str = "Basic ";

/// Decides whether a request may proceed.
///
/// An empty `key` admits everything. Otherwise the request needs either
/// `?key=<key>` or HTTP Basic credentials with an empty user and `key` as the
/// password.
///
/// # Examples
///
/// ```
/// use axum::http::HeaderMap;
/// use yaml2json_core::auth::is_authorized;
/// use yaml2json_core::types::QueryParams;
///
/// let headers = HeaderMap::new();
/// assert!(is_authorized(&QueryParams::parse(None), &headers, ""));
/// assert!(is_authorized(&QueryParams::parse(Some("key=s3")), &headers, "s3"));
/// assert!(!is_authorized(&QueryParams::parse(Some("key=nope")), &headers, "s3"));
/// ```
pub fn is_authorized(query: &QueryParams, headers: &HeaderMap, key: &str) -> bool {
    if key.is_empty() {
        return true;
    }
    query.get("key") == key || basic_auth_matches(headers, key)
}

fn basic_auth_matches(headers: &HeaderMap, key: &str) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = value.strip_prefix(BASIC_PREFIX) else {
        return false;
    };
    match STANDARD.decode(encoded) {
        Ok(payload) => {
            payload.len() == key.len() + 1
                && payload.first() == Some(&b':')
                && &payload[1..] == key.as_bytes()
        }
        Err(_) => false,
    }
}
