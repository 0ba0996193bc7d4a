use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};

use crate::error::EtlError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Blocking client. `timeout: None` disables reqwest's default 30s limit.
pub fn client(timeout: Option<Duration>) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url`, treating any non-2xx status as an error.
pub fn get(client: &Client, url: &str) -> Result<Response> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("GET {}", url))?;
    let status = response.status();
    if !status.is_success() {
        return Err(EtlError::Status {
            url: url.to_string(),
            status,
        }
        .into());
    }
    Ok(response)
}
