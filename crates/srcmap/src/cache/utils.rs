//! # Cache Utilities
//!
//! Common utility functions for cache operations.

use reqwest::header::{ETAG, HeaderMap};

/// Extract the ETag validator from response headers.
///
/// Header values that are not visible ASCII or are empty are treated as absent.
pub fn extract_etag(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
