// src/detector.rs
//
// One detection cycle: fetch → normalize → compare against the stored
// baseline → classify. The baseline advances only past a confirmed
// substantive change (and on first observation); syntactic drift that
// the line diff reports as equal leaves the old baseline in place so it
// cannot silently reset the comparison point.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::diff::{self, DiffResult};
use crate::normalize;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::source::ContentSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectOutcome {
    NoChange,
    /// Substantive change; payload is the rendered line diff.
    ChangeDetected(String),
}

pub struct ChangeDetector {
    source_key: String,
    source: Arc<dyn ContentSource>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl ChangeDetector {
    pub fn new(
        source_key: impl Into<String>,
        source: Arc<dyn ContentSource>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            source,
            snapshots,
        }
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// A fetch failure aborts the cycle before any store access; it is
    /// safe to retry on the next scheduled invocation.
    pub async fn run(&self) -> Result<DetectOutcome> {
        let raw = self
            .source
            .fetch()
            .await
            .with_context(|| format!("fetch {} via {}", self.source_key, self.source.name()))?;
        let text = normalize::to_normalized_text(&raw);

        let Some(prior) = self.snapshots.get(&self.source_key).await else {
            // First observation bootstraps the baseline; never a draft.
            self.snapshots
                .put(Snapshot::new(&self.source_key, text))
                .await
                .context("store bootstrap snapshot")?;
            tracing::info!(source = %self.source_key, "first observation; baseline stored");
            return Ok(DetectOutcome::NoChange);
        };

        if prior.content == text {
            return Ok(DetectOutcome::NoChange);
        }

        match diff::compare(&prior.content, &text) {
            DiffResult::Unchanged => {
                tracing::debug!(source = %self.source_key, "content drifted but not substantively");
                Ok(DetectOutcome::NoChange)
            }
            DiffResult::Changed(rendered) => {
                self.snapshots
                    .put(Snapshot::new(&self.source_key, text))
                    .await
                    .context("advance snapshot")?;
                Ok(DetectOutcome::ChangeDetected(rendered))
            }
        }
    }
}
