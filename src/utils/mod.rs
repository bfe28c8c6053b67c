//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Append query parameters to a base URL.
pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<String> {
    let url = Url::parse_with_params(base, params)
        .map_err(|e| AppError::config(format!("Invalid source URL {base}: {e}")))?;
    Ok(url.to_string())
}

/// Extract the host from a URL string, for logging.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
