//! Physics ticker (§4.5): evolves rocket status once per second from the
//! current settings, then checks for edge-triggered threshold crossings.

use super::diagnostic;
use super::runtime::MissionRuntime;
use crate::types::{EventKind, Message, RocketStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(runtime: Arc<MissionRuntime>) {
    let cancel = runtime.cancel_token();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + TICK_INTERVAL, TICK_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(mission_id = runtime.mission_id, "physics ticker stopped");
                return;
            }
            _ = ticker.tick() => tick(&runtime).await,
        }
    }
}

async fn tick(runtime: &Arc<MissionRuntime>) {
    let (old_status, new_status) = {
        let mut state = runtime.state().lock().await;
        let old_status = state.status;

        state.status.hull_level -= 0.05;
        state.status.fuel_level -= 0.10 + 0.20 * state.setting.thrust / 100.0;
        state.status.oxygen_level -=
            0.05 + if state.setting.life { 0.05 } else { 0.0 } + 0.10 * state.setting.thrust / 100.0;
        state.status.temperature_level += 0.05 * state.setting.thrust + 0.03 * state.setting.power_level - 0.10;
        state.status.pressure_level += 0.05 * state.setting.altitude - 0.03 * state.setting.fuel;
        state.status.clamp_levels();

        (old_status, state.status)
    };

    if let Err(err) = runtime.store().update_system_status(runtime.mission_id, new_status).await {
        tracing::warn!(mission_id = runtime.mission_id, %err, "failed to persist tick status");
    }

    broadcast_changes(runtime, &new_status).await;
    check_thresholds(runtime, &old_status, &new_status);
}

async fn broadcast_changes(runtime: &Arc<MissionRuntime>, status: &RocketStatus) {
    let changes = [
        (EventKind::HullChange, status.hull_level),
        (EventKind::FuelChange, status.fuel_level),
        (EventKind::OxygenChange, status.oxygen_level),
        (EventKind::TemperatureChange, status.temperature_level),
        (EventKind::PressureChange, status.pressure_level),
    ];

    for (kind, value) in changes {
        let event = crate::types::Event::new(runtime.mission_id, kind, format!("{value:.2}"), "system");
        let msg = Message::from_event(&event, "tick");
        runtime.broadcast(&msg).await;
    }
}

/// Fire a diagnostic exactly once per crossing (§4.5). Each threshold is
/// independent so one tick can trigger more than one diagnostic.
fn check_thresholds(runtime: &Arc<MissionRuntime>, old: &RocketStatus, new: &RocketStatus) {
    let crossings = [
        crossed_below(old.hull_level, new.hull_level, 20.0),
        crossed_below(old.fuel_level, new.fuel_level, 10.0),
        crossed_below(old.oxygen_level, new.oxygen_level, 10.0),
        crossed_below(old.pressure_level, new.pressure_level, 15.0),
        crossed_above(old.pressure_level, new.pressure_level, 95.0),
        crossed_above(old.temperature_level, new.temperature_level, 90.0),
    ];

    if crossings.iter().any(|&c| c) {
        let runtime = runtime.clone();
        let status = *new;
        tokio::spawn(async move { diagnostic::trigger(&runtime, status).await });
    }
}

fn crossed_below(old: f64, new: f64, bound: f64) -> bool {
    old >= bound && new < bound
}

fn crossed_above(old: f64, new: f64, bound: f64) -> bool {
    old <= bound && new > bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_below_is_edge_triggered() {
        assert!(crossed_below(20.04, 19.9, 20.0));
        assert!(!crossed_below(19.9, 19.8, 20.0));
    }

    #[test]
    fn crossing_above_is_edge_triggered() {
        assert!(crossed_above(94.9, 95.1, 95.0));
        assert!(!crossed_above(95.1, 95.2, 95.0));
    }
}
