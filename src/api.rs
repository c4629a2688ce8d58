use std::sync::Arc;

use metrics::counter;
use shuttle_axum::axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::draft::{ConfirmOutcome, Draft, DraftLifecycle};
use crate::watch::WatchCycle;

#[derive(Clone)]
pub struct AppState {
    pub watch: Arc<WatchCycle>,
    pub lifecycle: Arc<DraftLifecycle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/check", post(run_check))
        .route("/confirm/{draft_id}", get(confirm_draft))
        .route("/drafts/{draft_id}", get(get_draft))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Manual trigger; same path a scheduled tick takes.
async fn run_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.watch.run_once().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::to_value(&outcome).unwrap_or_default()),
        ),
        Err(e) => {
            tracing::warn!("manual check failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("{e:#}") })),
            )
        }
    }
}

/// The human confirmation link. Safe under duplicate delivery: repeats
/// resolve to AlreadyPublished/NotPending, never a second publish.
async fn confirm_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> (StatusCode, Json<ConfirmOutcome>) {
    counter!("confirm_requests_total").increment(1);
    let outcome = state.lifecycle.confirm(&draft_id).await;
    let code = match &outcome {
        ConfirmOutcome::Published { .. } | ConfirmOutcome::AlreadyPublished => StatusCode::OK,
        ConfirmOutcome::NotPending => StatusCode::CONFLICT,
        ConfirmOutcome::NotFound => StatusCode::NOT_FOUND,
        ConfirmOutcome::PublishFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    (code, Json(outcome))
}

async fn get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<Json<Draft>, StatusCode> {
    state
        .lifecycle
        .peek(&draft_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
