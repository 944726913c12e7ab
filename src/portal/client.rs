//! HTTP transport for the portal, using wreq for TLS fingerprint emulation.

use crate::config::PortalConfig;
use crate::error::HarvestError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// HTTP statuses worth retrying: rate limiting and transient server faults.
const RETRY_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Transport contract the navigator works against - enables mocking for tests.
#[async_trait]
pub trait PortalHttp: Send + Sync {
    /// Fetches a page, retrying transient failures with backoff.
    async fn get(&self, url: &str) -> Result<String, HarvestError>;

    /// Submits a postback. Exactly one attempt: a repeated POST can advance
    /// the server-side form state twice, so a failure here surfaces at once
    /// and the caller abandons the combination instead of retrying
    /// mid-sequence.
    async fn post_form(&self, url: &str, fields: &[(String, String)])
        -> Result<String, HarvestError>;
}

/// Portal HTTP client with browser impersonation and bounded retry.
///
/// Cookies are kept across calls so the portal's session survives the
/// whole postback sequence. Certificate verification is always on.
pub struct PortalClient {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl PortalClient {
    /// Builds the client from portal configuration.
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// One GET attempt, classified for the retry loop.
    async fn try_get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if RETRY_STATUS.contains(&status.as_u16()) {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Permanent(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| FetchError::Transient(format!("body read failed: {e}")))
    }

    /// Backoff before retry `attempt`: base, 2x base, 4x base, ...
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt.saturating_sub(1))
    }
}

#[async_trait]
impl PortalHttp for PortalClient {
    async fn get(&self, url: &str) -> Result<String, HarvestError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_get(url).await {
                Ok(body) => return Ok(body),
                Err(FetchError::Transient(reason)) if attempt <= self.max_retries => {
                    let wait = self.backoff(attempt);
                    warn!(
                        url,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "transient failure ({reason}), retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(FetchError::Transient(reason)) => {
                    return Err(HarvestError::Network(format!(
                        "{reason} (gave up after {attempt} attempts)"
                    )));
                }
                Err(FetchError::Permanent(reason)) => {
                    return Err(HarvestError::Network(reason));
                }
            }
        }
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, HarvestError> {
        let body = encode_form(fields);
        debug!(url, fields = fields.len(), "POST postback");

        let response = self
            .client
            .post(url)
            .emulation(Emulation::Chrome131)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .body(body)
            .send()
            .await
            .map_err(|e| HarvestError::Network(format!("postback failed: {e}")))?;

        let status = response.status();
        debug!("POST {} -> {}", url, status);

        if !status.is_success() {
            return Err(HarvestError::Network(format!("postback returned HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| HarvestError::Network(format!("body read failed: {e}")))
    }
}

/// Internal classification of a single fetch attempt.
enum FetchError {
    /// Worth retrying: connect failures, timeouts, and `RETRY_STATUS` codes.
    Transient(String),
    /// Not worth retrying, e.g. a 404.
    Permanent(String),
}

/// Percent-encodes a postback payload.
fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
