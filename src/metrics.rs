use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_checks_total", "Detection cycles started.");
        describe_counter!(
            "watch_changes_total",
            "Cycles that found a substantive change."
        );
        describe_counter!("watch_drafts_created_total", "Drafts created and persisted.");
        describe_counter!(
            "watch_summarizer_declines_total",
            "Changes dropped because the summarizer declined."
        );
        describe_counter!("confirm_requests_total", "Inbound confirmation requests.");
        describe_counter!("publish_success_total", "Drafts published externally.");
        describe_counter!("publish_failure_total", "Publish attempts that failed.");
        describe_counter!(
            "notify_errors_total",
            "Notification channel delivery failures."
        );
        describe_gauge!("watch_last_run_ts", "Unix ts when the watch loop last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register all series.
    pub fn init() -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
