// src/retry.rs
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Bounded exponential backoff shared by every outbound call
/// (fetch, summarize, notify, publish).
/// - Attempt `n` sleeps `base_delay_ms * multiplier^(n-1)`, capped at `cap_ms`.
/// - After `max_attempts` failures the last error is returned; no unbounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: u64,
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2,
            cap_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping. Useful for tests and for calls that
    /// must not be repeated.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1,
            cap_ms: 0,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let ms = self
            .base_delay_ms
            .saturating_mul(self.multiplier.saturating_pow(exp))
            .min(self.cap_ms);
        Duration::from_millis(ms)
    }

    /// Run `op` until it succeeds or `max_attempts` is exhausted.
    /// `what` labels the operation in logs and in the final error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < max => {
                    tracing::warn!(error = ?e, attempt, "{what} failed, retrying");
                    tokio::time::sleep(self.delay_for(attempt)).await;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("{what}: giving up after {attempt} attempts"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_and_caps() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            multiplier: 10,
            cap_ms: 2_000,
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2_000)); // capped
        assert_eq!(p.delay_for(10), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            multiplier: 1,
            cap_ms: 1,
        };
        let calls = AtomicU32::new(0);
        let out: u32 = p
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(anyhow!("transient"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            multiplier: 1,
            cap_ms: 1,
        };
        let calls = AtomicU32::new(0);
        let err = p
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(anyhow!("down")) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(format!("{err:#}").contains("giving up after 2 attempts"));
    }
}
