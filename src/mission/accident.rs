//! Accident injector (§4.7): every `ACCIDENT_WINDOW`, draws a probabilistic
//! accident keyed off the current stabilizer setting and, on a hit, feeds
//! it into the scripted-program executor as if it were a `CustomAdd`.

use super::program;
use super::runtime::MissionRuntime;
use crate::types::EventKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Accident-check period (§4.7).
pub const ACCIDENT_WINDOW: Duration = Duration::from_secs(5 * 60);

pub async fn run(runtime: Arc<MissionRuntime>) {
    let cancel = runtime.cancel_token();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + ACCIDENT_WINDOW, ACCIDENT_WINDOW);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(mission_id = runtime.mission_id, "accident loop stopped");
                return;
            }
            _ = ticker.tick() => tick(&runtime).await,
        }
    }
}

async fn tick(runtime: &Arc<MissionRuntime>) {
    let success_rate = {
        let state = runtime.state().lock().await;
        state.setting.stabilizer
    };

    if !should_accident(success_rate) {
        return;
    }

    info!(mission_id = runtime.mission_id, "accident occurred");
    let steps = match runtime.store().get_random_accident().await {
        Ok(steps) => steps,
        Err(err) => {
            warn!(mission_id = runtime.mission_id, %err, "failed to load random accident");
            return;
        }
    };

    let parent = match runtime
        .store()
        .add_event(runtime.mission_id, EventKind::CustomAdd, "accident", "system")
        .await
    {
        Ok(event) => event,
        Err(err) => {
            warn!(mission_id = runtime.mission_id, %err, "failed to persist accident parent event");
            return;
        }
    };

    let runtime = runtime.clone();
    tokio::spawn(async move { program::run_with_steps(runtime, parent, steps).await });
}

/// `P = 1 - exp(-(1 - p))`, where `p` is `settings.stabilizer` interpreted
/// as a success probability. Outside `[0, 1]`, never accidents (§4.7,
/// ported from `original_source`'s `shouldAccident`).
fn should_accident(success_rate: f64) -> bool {
    if !(0.0..=1.0).contains(&success_rate) {
        return false;
    }
    let failure_rate = 1.0 - success_rate;
    let probability = 1.0 - (-failure_rate).exp();
    rand::random::<f64>() < probability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_success_rate_never_triggers() {
        assert!(!should_accident(1.0));
    }

    #[test]
    fn out_of_range_never_triggers() {
        assert!(!should_accident(1.5));
        assert!(!should_accident(-0.1));
    }

    #[test]
    fn probability_is_monotonic_as_success_rate_falls() {
        let p_high = 1.0 - (-(1.0 - 0.99_f64)).exp();
        let p_low = 1.0 - (-(1.0 - 0.50_f64)).exp();
        let p_zero = 1.0 - (-(1.0 - 0.0_f64)).exp();
        assert!(p_high < p_low);
        assert!(p_low < p_zero);
    }
}
