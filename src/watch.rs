// src/watch.rs
//
// One scheduled tick: detect → summarize → create draft → notify.
// Scheduled ticks and inbound confirmations race freely; the draft
// store is the only serialization point between them. A cycle that
// fails mid-way (fetch or summarizer) leaves no partial draft behind.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::detector::{ChangeDetector, DetectOutcome};
use crate::draft::DraftLifecycle;
use crate::notify::{NotificationEvent, NotifierMux};
use crate::summarize::DynSummarizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    NoChange,
    SummarizerDeclined,
    DraftCreated { draft_id: String },
}

pub struct WatchCycle {
    detector: ChangeDetector,
    summarizer: DynSummarizer,
    lifecycle: Arc<DraftLifecycle>,
    notifier: Arc<NotifierMux>,
    confirm_base_url: String,
    source_reference: String,
}

impl WatchCycle {
    pub fn new(
        detector: ChangeDetector,
        summarizer: DynSummarizer,
        lifecycle: Arc<DraftLifecycle>,
        notifier: Arc<NotifierMux>,
        confirm_base_url: impl Into<String>,
        source_reference: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            summarizer,
            lifecycle,
            notifier,
            confirm_base_url: confirm_base_url.into().trim_end_matches('/').to_string(),
            source_reference: source_reference.into(),
        }
    }

    pub async fn run_once(&self) -> Result<CycleOutcome> {
        counter!("watch_checks_total").increment(1);
        gauge!("watch_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        let diff_text = match self.detector.run().await? {
            DetectOutcome::NoChange => return Ok(CycleOutcome::NoChange),
            DetectOutcome::ChangeDetected(diff) => diff,
        };
        counter!("watch_changes_total").increment(1);

        let Some(summary) = self.summarizer.summarize(&diff_text).await else {
            counter!("watch_summarizer_declines_total").increment(1);
            tracing::info!(
                provider = self.summarizer.provider_name(),
                "summarizer declined; no draft created"
            );
            return Ok(CycleOutcome::SummarizerDeclined);
        };

        let draft_id =
            self.lifecycle
                .create_draft(summary.clone(), diff_text, self.source_reference.clone());
        counter!("watch_drafts_created_total").increment(1);
        tracing::info!(draft = %draft_id, "draft created, awaiting confirmation");

        let ev = NotificationEvent {
            draft_id: draft_id.clone(),
            source_reference: self.source_reference.clone(),
            summary_text: summary,
            confirm_url: format!("{}/confirm/{}", self.confirm_base_url, draft_id),
            ts: Utc::now(),
        };
        self.notifier.notify(&ev).await;

        Ok(CycleOutcome::DraftCreated { draft_id })
    }
}

/// Spawn the periodic watch loop. Tick failures are logged and the loop
/// keeps going; the next tick retries from clean state.
pub fn spawn_watch_loop(cycle: Arc<WatchCycle>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match cycle.run_once().await {
                Ok(CycleOutcome::NoChange) => tracing::debug!("watch tick: no change"),
                Ok(outcome) => tracing::info!(?outcome, "watch tick"),
                Err(e) => tracing::warn!("watch tick failed: {e:#}"),
            }
        }
    })
}
