// src/notify/mod.rs
pub mod discord;
pub mod email;
pub mod slack;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

/// Alert sent to a human when a draft is waiting for confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub draft_id: String,
    pub source_reference: String,
    pub summary_text: String,
    /// One-click confirmation link; duplicate clicks are tolerated downstream.
    pub confirm_url: String,
    pub ts: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &NotificationEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one event out to every configured channel. Delivery is
/// best-effort: a failing channel is logged and counted, never fatal to
/// the calling cycle.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if std::env::var("SLACK_WEBHOOK_URL").is_ok() {
            channels.push(Box::new(slack::SlackNotifier::from_env()));
        }
        if let Ok(webhook) = std::env::var("DISCORD_WEBHOOK_URL") {
            channels.push(Box::new(discord::DiscordNotifier::new(webhook)));
        }
        if std::env::var("SMTP_HOST").is_ok() {
            match email::EmailNotifier::from_env() {
                Ok(n) => channels.push(Box::new(n)),
                Err(e) => tracing::warn!(error = ?e, "email channel misconfigured; skipping"),
            }
        }

        Self { channels }
    }

    /// Empty mux for tests and single-binary demos.
    pub fn none() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub async fn notify(&self, ev: &NotificationEvent) {
        if self.channels.is_empty() {
            tracing::info!(
                draft = %ev.draft_id,
                confirm = %ev.confirm_url,
                "no notification channels configured; draft awaiting confirmation"
            );
            return;
        }
        for ch in &self.channels {
            if let Err(e) = ch.send(ev).await {
                counter!("notify_errors_total").increment(1);
                tracing::warn!(error = ?e, channel = ch.name(), "notification failed");
            }
        }
    }
}
