use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NotificationEvent, Notifier};
use crate::retry::RetryPolicy;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let title = format!("Update pending approval: {}", ev.source_reference);
        let description = format!(
            "**Summary:** {}\n**Confirm:** {}\n**Time (UTC):** {}",
            ev.summary_text,
            ev.confirm_url,
            ev.ts.to_rfc3339()
        );
        let payload = DiscordWebhookPayload::embed(&title, &description);

        let client = self.client.clone();
        let webhook = self.webhook.clone();
        let timeout = self.timeout;
        self.retry
            .run("discord webhook", move || {
                let client = client.clone();
                let webhook = webhook.clone();
                let payload = payload.clone();
                async move {
                    client
                        .post(&webhook)
                        .timeout(timeout)
                        .json(&payload)
                        .send()
                        .await
                        .context("discord post")?
                        .error_for_status()
                        .context("discord non-2xx")?;
                    Ok(())
                }
            })
            .await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Clone, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
}

#[derive(Clone, Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                description: description.to_string(),
            }],
        }
    }
}
