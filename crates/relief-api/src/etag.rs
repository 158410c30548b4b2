//! ETag computation for request resources.
//!
//! An ETag is a SHA-256 over the request id, its store version and its last
//! update time. Every successful write bumps the version, so any change to a
//! request yields a new ETag.

use axum::http::{HeaderMap, HeaderValue, header};
use relief_core::Request;
use sha2::{Digest, Sha256};

/// Compute the quoted ETag for `request`.
pub fn compute_etag(request: &Request) -> String {
  let mut hasher = Sha256::new();
  hasher.update(request.id.as_bytes());
  hasher.update(request.version.to_le_bytes());
  hasher.update(request.updated_at.timestamp_micros().to_le_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// `ETag` header for `request`.
pub fn etag_header(request: &Request) -> (header::HeaderName, HeaderValue) {
  // Quoted lowercase hex is always a valid header value.
  let value = HeaderValue::from_str(&compute_etag(request))
    .unwrap_or_else(|_| HeaderValue::from_static("\"\""));
  (header::ETAG, value)
}

/// `true` if the request carries no `If-Match`, or one that matches
/// `current`. Accepts `*`, comma-separated lists, weak tags and tags sent
/// without the surrounding quotes.
pub fn if_match_satisfied(headers: &HeaderMap, current: &str) -> bool {
  let Some(value) = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) else {
    return headers.get(header::IF_MATCH).is_none();
  };
  value.split(',').map(str::trim).any(|candidate| {
    candidate == "*" || strip_etag(candidate) == strip_etag(current)
  })
}

fn strip_etag(s: &str) -> &str { s.trim_start_matches("W/").trim_matches('"') }
