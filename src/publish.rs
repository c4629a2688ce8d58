// src/publish.rs
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Receipt returned by the publishing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub post_id: String,
}

/// The sole mutating external call, gated by human confirmation.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishReceipt>;
    fn name(&self) -> &'static str;
}

// --- tolerant variants of the publish endpoint response ---

#[derive(Debug, Deserialize)]
struct PublishRespFlat {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PublishAny {
    Flat(PublishRespFlat),
    Wrapped { data: PublishRespFlat },
}

impl PublishAny {
    fn into_id(self) -> String {
        match self {
            PublishAny::Flat(f) => f.id,
            PublishAny::Wrapped { data } => data.id,
        }
    }
}

/// Posts approved text to a configured endpoint. Authentication is a
/// bearer token when `PUBLISH_TOKEN` is set; the endpoint's own scheme
/// is its business.
pub struct HttpPublisher {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("pagewatch/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            endpoint: endpoint.into(),
            token,
            client,
        }
    }

    pub fn from_env() -> Self {
        let endpoint = std::env::var("PUBLISH_ENDPOINT").unwrap_or_default();
        let token = std::env::var("PUBLISH_TOKEN").ok();
        Self::new(endpoint, token)
    }
}

#[async_trait::async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, text: &str) -> Result<PublishReceipt> {
        if self.endpoint.is_empty() {
            anyhow::bail!("PUBLISH_ENDPOINT not configured");
        }
        let body = serde_json::json!({ "text": text });
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .context("publish post")?
            .error_for_status()
            .context("publish non-2xx")?;
        let any: PublishAny = resp.json().await.context("parse publish response")?;
        Ok(PublishReceipt {
            post_id: any.into_id(),
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Test double: counts invocations, optionally fails, optionally holds
/// the call open to widen race windows.
#[derive(Default)]
pub struct MockPublisher {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay_ms: u64,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_ms(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, _text: &str) -> Result<PublishReceipt> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mock publisher down");
        }
        Ok(PublishReceipt {
            post_id: format!("post-{n}"),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerant_response_parsing_accepts_both_shapes() {
        let flat: PublishAny = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
        assert_eq!(flat.into_id(), "42");
        let wrapped: PublishAny = serde_json::from_str(r#"{"data":{"id":"43"}}"#).unwrap();
        assert_eq!(wrapped.into_id(), "43");
    }
}
