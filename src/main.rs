//! pagewatch — Binary Entrypoint
//! Boots the Axum HTTP server and the background watch loop, wiring
//! stores, collaborators, and middleware.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pagewatch::config::{self, WatchConfig};
use pagewatch::detector::ChangeDetector;
use pagewatch::draft::DraftLifecycle;
use pagewatch::metrics::Metrics;
use pagewatch::notify::NotifierMux;
use pagewatch::publish::{HttpPublisher, Publisher};
use pagewatch::snapshot::{FileSnapshotStore, SnapshotStore};
use pagewatch::source::{ContentSource, HttpSource};
use pagewatch::summarize;
use pagewatch::watch::{self, WatchCycle};
use pagewatch::{api, router};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PAGEWATCH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PAGEWATCH_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagewatch=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg: WatchConfig = config::load_config_default().expect("failed to load watch config");
    if cfg.source_url.is_empty() {
        tracing::warn!("no source_url configured; set WATCH_URL or a config file");
    }

    let metrics = Metrics::init();

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(&cfg.state_dir));
    let source: Arc<dyn ContentSource> =
        Arc::new(HttpSource::new(cfg.source_url.clone(), cfg.retry));
    let publisher: Arc<dyn Publisher> = Arc::new(HttpPublisher::from_env());

    let detector = ChangeDetector::new(cfg.source_key.clone(), source, snapshots);
    let summarizer = summarize::build_summarizer();
    let lifecycle = Arc::new(DraftLifecycle::new(
        publisher,
        cfg.draft_ttl_secs,
        cfg.retry,
    ));
    let notifier = Arc::new(NotifierMux::from_env());

    let cycle = Arc::new(WatchCycle::new(
        detector,
        summarizer,
        lifecycle.clone(),
        notifier,
        cfg.confirm_base_url.clone(),
        cfg.source_url.clone(),
    ));

    watch::spawn_watch_loop(cycle.clone(), cfg.interval_secs);

    let state = api::AppState {
        watch: cycle,
        lifecycle,
    };
    let router = router(state).merge(metrics.router());

    Ok(router.into())
}
