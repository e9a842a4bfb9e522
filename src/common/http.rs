//! Shared outbound HTTP client
//!
//! `reqwest::Client` is reference counted and immutable once built, so a
//! single instance is cloned into every component making outbound calls.

use crate::{Error, Result};
use std::time::Duration;

/// User agent sent on every outbound request
pub const USER_AGENT: &str = concat!("vpn-resolver/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client with the given request timeout
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    if timeout.is_zero() {
        return Err(Error::config("HTTP timeout cannot be zero"));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Strip credential query parameters from a URL before it goes into
/// an error message or a log line
pub fn redact_url(url: &url::Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" || k == "key" {
                "[redacted]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    if pairs.is_empty() {
        redacted.set_query(None);
    } else {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}
