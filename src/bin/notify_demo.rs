//! Demo that pushes a fake pending-draft alert through the multiplexer
//! (stdout/log only when channels are disabled).

use chrono::Utc;
use pagewatch::{NotificationEvent, NotifierMux};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let mux = NotifierMux::from_env();

    let ev = NotificationEvent {
        draft_id: "00000000-0000-4000-8000-000000000000".into(),
        source_reference: "https://example.com/status".into(),
        summary_text: "The status page added a maintenance window for Saturday.".into(),
        confirm_url: "http://127.0.0.1:8000/confirm/00000000-0000-4000-8000-000000000000".into(),
        ts: Utc::now(),
    };
    mux.notify(&ev).await;

    println!("notify-demo done ({} channels)", mux.channel_count());
}
