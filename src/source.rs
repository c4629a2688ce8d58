// src/source.rs
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::retry::RetryPolicy;

/// Where raw page bytes come from. Fetch failures are transient and
/// retryable; the caller aborts its cycle without touching stored state.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
    fn name(&self) -> &'static str;
}

/// Production source: GET over HTTP(S) with bounded retry.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("pagewatch/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            url: url.into(),
            client,
            retry,
        }
    }
}

#[async_trait::async_trait]
impl ContentSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let client = self.client.clone();
        let url = self.url.clone();
        self.retry
            .run("fetch page", move || {
                let client = client.clone();
                let url = url.clone();
                async move {
                    let resp = client
                        .get(&url)
                        .send()
                        .await
                        .with_context(|| format!("GET {url}"))?
                        .error_for_status()
                        .context("non-success status")?;
                    let bytes = resp.bytes().await.context("read body")?;
                    Ok(bytes.to_vec())
                }
            })
            .await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Scripted source for tests/local runs: serves whatever body was set
/// last, or fails when none is queued.
#[derive(Default)]
pub struct FixtureSource {
    body: Mutex<Option<Vec<u8>>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: impl Into<Vec<u8>>) -> Self {
        let s = Self::default();
        s.set_body(body);
        s
    }

    pub fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.lock().expect("fixture mutex poisoned") = Some(body.into());
    }

    /// Next fetch fails, simulating an unreachable source.
    pub fn clear(&self) {
        *self.body.lock().expect("fixture mutex poisoned") = None;
    }
}

#[async_trait::async_trait]
impl ContentSource for FixtureSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        self.body
            .lock()
            .expect("fixture mutex poisoned")
            .clone()
            .ok_or_else(|| anyhow::anyhow!("fixture source has no body"))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
