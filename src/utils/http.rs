// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Accept header for HTML history pages.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept header for JSON APIs.
pub const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Strip markup leftovers from a table cell's text.
pub fn clean_cell_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .replace("&nbsp;", " ")
        .replace(',', "")
        .trim()
        .to_string()
}
