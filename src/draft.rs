// src/draft.rs
//
// Draft records and their confirmation lifecycle. A draft is created
// PENDING when a substantive change has been summarized, and moves
// through exactly one of:
//
//   PENDING ──claim──▶ PUBLISHING ──▶ PUBLISHED        (terminal)
//                          │
//                          └────────▶ PUBLISH_FAILED ──claim──▶ PUBLISHING …
//
// PUBLISHING is the transient in-flight claim held by exactly one
// confirmation call; any other caller observing it gets NotPending.
// A failed publish may be retried by a fresh confirmation on the same
// draft. Expired drafts are removed on access and reported NotFound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::publish::Publisher;
use crate::retry::RetryPolicy;

pub const DEFAULT_DRAFT_TTL_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftState {
    Pending,
    Publishing,
    Published,
    PublishFailed,
}

/// A candidate external post awaiting human approval. Owned exclusively
/// by the lifecycle; nothing else mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub summary_text: String,
    pub diff_text: String,
    pub source_reference: String,
    pub created_at: DateTime<Utc>,
    pub state: DraftState,
}

/// Result of an atomic claim attempt on a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    Claimed(Draft),
    NotFound,
    AlreadyPublished,
    NotPending,
}

/// Keyed in-memory store with a bounded record lifetime. The single
/// mutex is the per-id serialization point: claim and resolve each take
/// it once, and it is never held across an await.
pub struct DraftStore {
    inner: Mutex<HashMap<String, Draft>>,
    ttl: ChronoDuration,
}

impl DraftStore {
    /// `ttl_secs` < 0 is treated as 0 (records expire immediately).
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl: ChronoDuration::seconds(ttl_secs.max(0)),
        }
    }

    fn is_expired(&self, draft: &Draft, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(draft.created_at) >= self.ttl
    }

    pub fn insert(&self, draft: Draft) {
        let mut map = self.inner.lock().expect("draft mutex poisoned");
        map.insert(draft.id.clone(), draft);
    }

    /// Expiry-checked read; an expired record is removed and reported absent.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<Draft> {
        let mut map = self.inner.lock().expect("draft mutex poisoned");
        match map.get(id) {
            Some(d) if self.is_expired(d, now) => {
                map.remove(id);
                None
            }
            Some(d) => Some(d.clone()),
            None => None,
        }
    }

    /// Compare-and-set entry into PUBLISHING. Exactly one caller can win
    /// the claim for a given draft; everyone else sees the in-flight
    /// transition or its result.
    pub fn claim_for_publish(&self, id: &str, now: DateTime<Utc>) -> Claim {
        let mut map = self.inner.lock().expect("draft mutex poisoned");
        let Some(draft) = map.get_mut(id) else {
            return Claim::NotFound;
        };
        if now.signed_duration_since(draft.created_at) >= self.ttl {
            map.remove(id);
            return Claim::NotFound;
        }
        match draft.state {
            DraftState::Pending | DraftState::PublishFailed => {
                draft.state = DraftState::Publishing;
                Claim::Claimed(draft.clone())
            }
            DraftState::Publishing => Claim::NotPending,
            DraftState::Published => Claim::AlreadyPublished,
        }
    }

    /// Settle an in-flight claim. Only the claimant calls this, so the
    /// record is expected to still be PUBLISHING.
    pub fn resolve_publish(&self, id: &str, ok: bool) {
        let mut map = self.inner.lock().expect("draft mutex poisoned");
        match map.get_mut(id) {
            Some(d) if d.state == DraftState::Publishing => {
                d.state = if ok {
                    DraftState::Published
                } else {
                    DraftState::PublishFailed
                };
            }
            Some(d) => {
                tracing::warn!(id, state = ?d.state, "resolve on a draft that was not in flight");
            }
            None => {
                tracing::warn!(id, "resolve on a missing draft (expired mid-publish?)");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("draft mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a confirmation request. Every exit path resolves to one
/// of these; duplicate deliveries are idempotent no-ops, never errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    Published { post_id: String },
    AlreadyPublished,
    NotPending,
    NotFound,
    PublishFailed { reason: String },
}

/// Creates drafts and governs their legal state transitions through
/// confirmation and publish.
pub struct DraftLifecycle {
    store: DraftStore,
    publisher: Arc<dyn Publisher>,
    retry: RetryPolicy,
}

impl DraftLifecycle {
    pub fn new(publisher: Arc<dyn Publisher>, ttl_secs: i64, retry: RetryPolicy) -> Self {
        Self {
            store: DraftStore::new(ttl_secs),
            publisher,
            retry,
        }
    }

    /// Allocate a fresh id and persist a PENDING draft. Ids are UUID v4,
    /// assigned once and never reused.
    pub fn create_draft(
        &self,
        summary_text: impl Into<String>,
        diff_text: impl Into<String>,
        source_reference: impl Into<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let draft = Draft {
            id: id.clone(),
            summary_text: summary_text.into(),
            diff_text: diff_text.into(),
            source_reference: source_reference.into(),
            created_at: Utc::now(),
            state: DraftState::Pending,
        };
        self.store.insert(draft);
        id
    }

    /// Claim → publish → resolve. At most one concurrent caller per id
    /// reaches the publisher; the claim is taken and settled in separate
    /// lock acquisitions so no lock spans the external call.
    pub async fn confirm(&self, id: &str) -> ConfirmOutcome {
        let draft = match self.store.claim_for_publish(id, Utc::now()) {
            Claim::Claimed(d) => d,
            Claim::NotFound => return ConfirmOutcome::NotFound,
            Claim::AlreadyPublished => return ConfirmOutcome::AlreadyPublished,
            Claim::NotPending => return ConfirmOutcome::NotPending,
        };

        let publisher = Arc::clone(&self.publisher);
        let text = draft.summary_text.clone();
        let result = self
            .retry
            .run("publish", move || {
                let publisher = Arc::clone(&publisher);
                let text = text.clone();
                async move { publisher.publish(&text).await }
            })
            .await;

        match result {
            Ok(receipt) => {
                self.store.resolve_publish(id, true);
                counter!("publish_success_total").increment(1);
                tracing::info!(id, post_id = %receipt.post_id, "draft published");
                ConfirmOutcome::Published {
                    post_id: receipt.post_id,
                }
            }
            Err(e) => {
                self.store.resolve_publish(id, false);
                counter!("publish_failure_total").increment(1);
                tracing::warn!(id, error = ?e, "publish failed; draft kept for retry");
                ConfirmOutcome::PublishFailed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    /// Read-only view for the inspection endpoint.
    pub fn peek(&self, id: &str) -> Option<Draft> {
        self.store.get(id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, created_at: DateTime<Utc>) -> Draft {
        Draft {
            id: id.into(),
            summary_text: "summary".into(),
            diff_text: "+line".into(),
            source_reference: "https://example.com".into(),
            created_at,
            state: DraftState::Pending,
        }
    }

    #[test]
    fn claim_wins_once_until_resolved() {
        let store = DraftStore::new(DEFAULT_DRAFT_TTL_SECS);
        let now = Utc::now();
        store.insert(draft("d1", now));

        let first = store.claim_for_publish("d1", now);
        assert!(matches!(first, Claim::Claimed(_)));
        // Second claim while in flight
        assert_eq!(store.claim_for_publish("d1", now), Claim::NotPending);

        store.resolve_publish("d1", true);
        assert_eq!(store.claim_for_publish("d1", now), Claim::AlreadyPublished);
    }

    #[test]
    fn failed_publish_can_be_reclaimed() {
        let store = DraftStore::new(DEFAULT_DRAFT_TTL_SECS);
        let now = Utc::now();
        store.insert(draft("d1", now));

        assert!(matches!(store.claim_for_publish("d1", now), Claim::Claimed(_)));
        store.resolve_publish("d1", false);
        // Fresh confirmation attempts the publish again.
        assert!(matches!(store.claim_for_publish("d1", now), Claim::Claimed(_)));
    }

    #[test]
    fn expired_draft_is_absent_for_all_purposes() {
        let store = DraftStore::new(60);
        let created = Utc::now() - ChronoDuration::seconds(120);
        store.insert(draft("d1", created));

        let now = Utc::now();
        assert_eq!(store.claim_for_publish("d1", now), Claim::NotFound);
        assert!(store.get("d1", now).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = DraftStore::new(DEFAULT_DRAFT_TTL_SECS);
        assert_eq!(store.claim_for_publish("nope", Utc::now()), Claim::NotFound);
    }

    #[test]
    fn created_drafts_get_unique_ids() {
        let lifecycle = DraftLifecycle::new(
            Arc::new(crate::publish::MockPublisher::new()),
            DEFAULT_DRAFT_TTL_SECS,
            RetryPolicy::once(),
        );
        let a = lifecycle.create_draft("s", "d", "src");
        let b = lifecycle.create_draft("s", "d", "src");
        assert_ne!(a, b);
        assert_eq!(lifecycle.peek(&a).unwrap().state, DraftState::Pending);
    }
}
