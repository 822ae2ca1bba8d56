//! Blocking HTTP helpers shared by the network-backed sources.

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;

use crate::traits::SourceError;

pub const USER_AGENT: &str = concat!("raya/", env!("CARGO_PKG_VERSION"));

/// Build a blocking client with a per-request timeout.
pub fn client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request and return the body of a 2xx response.
pub fn send_text(request: RequestBuilder) -> Result<String, SourceError> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SourceError::Http(status.as_u16(), snippet(&body)));
    }
    Ok(response.text()?)
}

/// Send a request and parse a 2xx response body as JSON.
pub fn send_json(request: RequestBuilder) -> Result<serde_json::Value, SourceError> {
    let body = send_text(request)?;
    serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
