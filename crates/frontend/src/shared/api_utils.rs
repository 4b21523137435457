//! API utilities for frontend-backend communication
//!
//! Provides helper functions for constructing API URLs.

/// Build a full API URL from the configured base and a path
///
/// A trailing slash on the base is tolerated.
///
/// # Example
/// ```rust
/// use frontend::shared::api_utils::api_url;
/// assert_eq!(api_url("http://localhost:8000/", "/chat/"), "http://localhost:8000/chat/");
/// ```
pub fn api_url(api_base: &str, path: &str) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), path)
}

/// Build an API URL with a single url-encoded query parameter
pub fn api_url_with_query(api_base: &str, path: &str, key: &str, value: &str) -> String {
    format!(
        "{}?{}={}",
        api_url(api_base, path),
        key,
        urlencoding::encode(value)
    )
}
