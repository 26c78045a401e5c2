use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::bulk_response::BulkResponse;
use super::index_lifecycle::IndexSetupConfig;
use super::retry::{ExponentialBackoff, RetryConfig};

// -- 📡 ElasticsearchSinkConfig lives next to the client that reads it.
// -- Auth is tri-modal: api_key, username+password, or "I hope anonymous works".
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchSinkConfig {
    /// 📡 Base URL of the cluster. Trailing slashes are forgiven.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 Password. "password123" is not a password. It is a confession.
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key. When set it wins over basic auth. This is not a democracy.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 📦 Target index for every document.
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub index_setup: IndexSetupConfig,
}

fn default_index() -> String {
    "address".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ElasticsearchSinkConfig {
    /// 🧪 A config pointed at `url` with every other knob at its default.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            api_key: None,
            index: default_index(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
            index_setup: IndexSetupConfig::default(),
        }
    }
}

/// 📡 The HTTP muscle behind every Elasticsearch call gcx makes.
///
/// Cheap to clone: the `reqwest::Client` pools connections internally and the config
/// sits behind an `Arc`. Every bulk worker gets its own clone.
///
/// Every request goes through [`perform`](Self::perform), which applies auth and the
/// transport retry policy. Nobody calls `send()` directly. Nobody.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    config: Arc<ElasticsearchSinkConfig>,
}

impl ElasticsearchClient {
    /// 🚀 Builds the HTTP client with the configured timeouts. No network calls yet.
    pub fn new(config: ElasticsearchSinkConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            // -- 💀 reqwest::Client::builder() enters, full of promise. It calls .build().
            // -- The TLS stack hesitates. The operating system shrugs.
            .context("💀 The HTTP client refused to be born. The TLS stack wept. We tried to build a reqwest::Client and the universe said 'no'. Probably a missing TLS cert or a cursed system OpenSSL. Either way: tragic.")?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ElasticsearchSinkConfig {
        &self.config
    }

    /// 📡 `https://host:9200/` → `https://host:9200/{path}`. One slash, never two.
    pub(crate) fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// 📡 GET the cluster root. "Hello? Is this thing on?"
    ///
    /// Fails loudly here rather than quietly 50,000 documents later.
    pub async fn ping(&self) -> Result<()> {
        let root = self.url_for("");
        let response = self
            .perform(|http| http.get(&root))
            .await
            .context("💀 Knocked on the cluster's front door. Nobody answered. Check the URL, check the network, check that the cluster is actually running and not just a rumor.")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 The cluster at '{}' answered the ping with '{}'. Body: '{}'. Credentials, maybe? It's usually credentials.",
                self.config.url,
                status,
                body
            );
        }
        debug!("✅ cluster at '{}' is home and answering the door", self.config.url);
        Ok(())
    }

    /// 📡 POST one NDJSON payload to `/_bulk` and parse the per-item verdicts.
    ///
    /// A non-2xx response after retries is an error for the whole request. A 2xx response
    /// can still carry per-item rejections; those come back inside the [`BulkResponse`].
    pub async fn bulk(&self, body: String) -> Result<BulkResponse> {
        let bulk_url = self.url_for("_bulk");
        let payload_bytes = body.len();
        debug!("📡 sending {} bytes to /_bulk", payload_bytes);

        let response = self
            .perform(|http| {
                http.post(&bulk_url)
                    // ⚠️ application/x-ndjson, not application/json. Elasticsearch cares. A lot.
                    .header("Content-Type", "application/x-ndjson")
                    .body(body.clone())
            })
            .await
            .context("💀 The bulk request never made it to Elasticsearch. We launched the payload into the network and the network responded with what can only be described as 'not vibing with it.' Check connectivity, check timeouts, and check your feelings.")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("💀 Elasticsearch answered the bulk request but the body fell apart on the way back.")?;
        if !status.is_success() {
            anyhow::bail!(
                "💀 The bulk request arrived, but Elasticsearch looked at our documents and said '{}'. The body of the response read: '{}'. We have no one to blame but ourselves, and possibly whoever wrote the mapping.",
                status,
                text
            );
        }

        let parsed: BulkResponse = serde_json::from_str(&text).context(
            "💀 The bulk response was a 2xx but not the JSON we were promised. Elasticsearch speaks many dialects; this was not one of them.",
        )?;
        trace!(
            "🚀 bulk request landed: {} bytes out, {} item verdicts back, errors={}",
            payload_bytes,
            parsed.items.len(),
            parsed.errors
        );
        Ok(parsed)
    }

    /// 🔄 Send a request, retrying per the configured policy.
    ///
    /// `build` is called once per attempt because a `RequestBuilder` is single-use.
    /// Retries happen on a configured status, on connection failures, and on timeouts
    /// when `retry_on_timeout` is set. The last response (or error) wins when attempts run
    /// out or the backoff's elapsed budget is spent.
    pub(crate) async fn perform<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut backoff = ExponentialBackoff::new(retry);
        let mut attempt: u32 = 1;

        loop {
            let outcome = self.authorize(build(&self.http)).send().await;

            let retry_reason = match &outcome {
                Ok(response) if retry.is_retryable_status(response.status().as_u16()) => {
                    Some(format!("status {}", response.status()))
                }
                Ok(_) => None,
                Err(err) if err.is_connect() => Some(format!("connection failure: {err}")),
                Err(err) if err.is_timeout() && retry.retry_on_timeout => {
                    Some(format!("timeout: {err}"))
                }
                Err(_) => None,
            };

            let Some(reason) = retry_reason else {
                return outcome.context("💀 The request went out and did not come back in one piece.");
            };
            if attempt >= max_attempts {
                warn!(
                    "💀 giving up after {} attempts, last one ended with {}",
                    attempt, reason
                );
                return outcome.context("💀 The request went out and did not come back in one piece.");
            }

            if attempt == 1 {
                backoff.reset();
            }
            let Some(delay) = backoff.next_backoff() else {
                warn!(
                    "⌛ retry budget spent after {} attempts, last one ended with {}",
                    attempt, reason
                );
                return outcome.context("💀 The request went out and did not come back in one piece.");
            };

            warn!(
                "🔄 attempt {}/{} ended with {} — retrying in {:?}",
                attempt, max_attempts, reason, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// 🧪 Millisecond retries so tests don't spend their lives sleeping.
    #[cfg(test)]
    pub(crate) fn impatient(url: String) -> Self {
        let mut config = ElasticsearchSinkConfig::for_url(url);
        config.retry.initial_interval_ms = 1;
        config.retry.max_interval_ms = 5;
        config.retry.randomization_factor = 0.0;
        Self::new(config).expect("client builds")
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // -- 🔒 api_key beats basic auth in this club.
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }
}
