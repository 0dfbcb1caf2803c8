//! Telemetry loop (§4.6): periodically logs current settings/status.
//! Carries no user-visible semantics — no store writes, no broadcast —
//! but still takes the mission lock for a consistent read (§5).

use super::runtime::MissionRuntime;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// The source's ticker fired every 500 *microseconds* — almost certainly a
/// typo for 500 milliseconds (open question resolved in SPEC_FULL.md §9).
const TELEMETRY_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run(runtime: Arc<MissionRuntime>) {
    let cancel = runtime.cancel_token();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + TELEMETRY_INTERVAL, TELEMETRY_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(mission_id = runtime.mission_id, "telemetry loop stopped");
                return;
            }
            _ = ticker.tick() => {
                let state = runtime.state().lock().await;
                let setting = state.setting;
                let status = state.status;
                drop(state);
                trace!(mission_id = runtime.mission_id, ?setting, ?status, "telemetry");
            }
        }
    }
}
