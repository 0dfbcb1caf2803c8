//! Normal event handlers (§4.3): everything dispatched from the pipeline
//! except `CustomAdd`, `CustomCancel`, and `Launch`.

use super::runtime::MissionRuntime;
use crate::types::{Event, EventKind, EventStatus, Message, RocketSetting, RocketStatus};
use std::sync::Arc;

pub async fn handle_normal(runtime: &Arc<MissionRuntime>, mut event: Event) {
    let note = match event.kind {
        EventKind::Join | EventKind::Leave => {
            event.status = EventStatus::Completed;
            "membership change recorded".to_string()
        }

        EventKind::Abort
        | EventKind::Land
        | EventKind::Test
        | EventKind::Diagnose
        | EventKind::DiagnoseResult
        | EventKind::ClearDiagnose
        | EventKind::CustomCancel
        | EventKind::Error
        | EventKind::Accident => {
            event.status = EventStatus::Completed;
            "accepted, no state change".to_string()
        }

        // Reached only if dispatch() ever routes these here by mistake;
        // both are handled before `handle_normal` is called.
        EventKind::CustomAdd | EventKind::Launch => {
            event.status = EventStatus::Completed;
            "no-op".to_string()
        }

        kind => match apply_step(runtime, kind, &event.value).await {
            Ok(()) => {
                event.status = EventStatus::Completed;
                "setting updated".to_string()
            }
            Err(reason) => {
                event.status = EventStatus::Failed;
                reason
            }
        },
    };

    runtime.persist_event_status(event.id, event.status).await;
    let msg = Message::from_event(&event, &note);
    runtime.broadcast(&msg).await;
}

/// Apply one command's effect to settings or status (§4.3, and reused by
/// the scripted-program executor for each step's effect — §4.4c). Holds
/// the mission lock across the read-modify-write and the store persist.
/// Returns the failure reason on parse or store error.
pub async fn apply_step(runtime: &Arc<MissionRuntime>, kind: EventKind, value: &str) -> Result<(), String> {
    match kind {
        EventKind::Thrust => apply_setting(runtime, value, |s, v| s.thrust = v).await,
        EventKind::Altitude => apply_setting(runtime, value, |s, v| s.altitude = v).await,
        EventKind::Fuel => apply_setting(runtime, value, |s, v| s.fuel = v).await,
        EventKind::Speed => apply_setting(runtime, value, |s, v| s.speed = v).await,
        EventKind::Temperature => apply_setting(runtime, value, |s, v| s.temperature = v).await,
        EventKind::Stabilizer => apply_setting(runtime, value, |s, v| s.stabilizer = v).await,
        EventKind::Oxygen => apply_setting(runtime, value, |s, v| s.oxygen = v).await,
        EventKind::Orbit => apply_setting(runtime, value, |s, v| s.orbit = v).await,
        EventKind::PowerLevel => apply_setting(runtime, value, |s, v| s.power_level = v).await,
        EventKind::Pressure => apply_setting(runtime, value, |s, v| s.pressure = v).await,

        EventKind::Power => apply_flag(runtime, value, |s, v| s.power = v).await,
        EventKind::Comms => apply_flag(runtime, value, |s, v| s.comms = v).await,
        EventKind::Nav => apply_flag(runtime, value, |s, v| s.nav = v).await,
        EventKind::Life => apply_flag(runtime, value, |s, v| s.life = v).await,

        EventKind::HullChange => apply_status(runtime, value, |s, v| s.hull_level = v).await,
        EventKind::FuelChange => apply_status(runtime, value, |s, v| s.fuel_level = v).await,
        EventKind::OxygenChange => apply_status(runtime, value, |s, v| s.oxygen_level = v).await,
        EventKind::TemperatureChange => apply_status(runtime, value, |s, v| s.temperature_level = v).await,
        EventKind::PressureChange => apply_status(runtime, value, |s, v| s.pressure_level = v).await,

        other => Err(format!("{other:?} has no settable effect")),
    }
}

/// Parse `value` as `f64` and assign it via `set`, holding the mission
/// lock across the store persist (§5).
async fn apply_setting(runtime: &Arc<MissionRuntime>, value: &str, set: impl FnOnce(&mut RocketSetting, f64)) -> Result<(), String> {
    let value: f64 = value.parse().map_err(|_| format!("invalid decimal value {value:?}"))?;

    let mut state = runtime.state().lock().await;
    set(&mut state.setting, value);
    let setting = state.setting;
    drop(state);

    runtime
        .store()
        .update_system_setting(runtime.mission_id, setting)
        .await
        .map_err(|err| format!("failed to persist setting: {err}"))
}

/// Parse `value` as `bool` and assign it via `set`.
async fn apply_flag(runtime: &Arc<MissionRuntime>, value: &str, set: impl FnOnce(&mut RocketSetting, bool)) -> Result<(), String> {
    let value: bool = value.parse().map_err(|_| format!("invalid boolean value {value:?}"))?;

    let mut state = runtime.state().lock().await;
    set(&mut state.setting, value);
    let setting = state.setting;
    drop(state);

    runtime
        .store()
        .update_system_setting(runtime.mission_id, setting)
        .await
        .map_err(|err| format!("failed to persist setting: {err}"))
}

/// Parse `value` as `f64` and assign it to a status field directly (a
/// `*Change` event sets the level rather than applying a delta).
async fn apply_status(runtime: &Arc<MissionRuntime>, value: &str, set: impl FnOnce(&mut RocketStatus, f64)) -> Result<(), String> {
    let value: f64 = value.parse().map_err(|_| format!("invalid decimal value {value:?}"))?;

    let mut state = runtime.state().lock().await;
    set(&mut state.status, value);
    state.status.clamp_levels();
    let status = state.status;
    drop(state);

    runtime
        .store()
        .update_system_status(runtime.mission_id, status)
        .await
        .map_err(|err| format!("failed to persist status: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc as StdArc;

    async fn test_runtime() -> (StdArc<MissionRuntime>, u64) {
        let store: StdArc<dyn crate::store::Store> = StdArc::new(InMemoryStore::new());
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        let (setting, status) = store.get_system_state(mission.id).await.unwrap();
        let runtime = MissionRuntime::spawn(&mission, setting, status, store);
        runtime.shutdown();
        (runtime, mission.id)
    }

    #[tokio::test]
    async fn thrust_update_parses_and_persists() {
        let (runtime, mission_id) = test_runtime().await;
        let mut event = Event::new(mission_id, EventKind::Thrust, "55.5", "alice");
        event.id = Some(1);
        handle_normal(&runtime, event).await;

        let (setting, _) = runtime.store().get_system_state(mission_id).await.unwrap();
        assert_eq!(setting.thrust, 55.5);
    }

    #[tokio::test]
    async fn invalid_thrust_value_marks_failed_and_leaves_setting() {
        let (runtime, mission_id) = test_runtime().await;
        let mut event = Event::new(mission_id, EventKind::Thrust, "not-a-number", "bob");
        event.id = Some(2);
        handle_normal(&runtime, event).await;

        let (setting, _) = runtime.store().get_system_state(mission_id).await.unwrap();
        assert_eq!(setting.thrust, RocketSetting::default().thrust);
    }

    #[tokio::test]
    async fn life_flag_toggles() {
        let (runtime, mission_id) = test_runtime().await;
        let mut event = Event::new(mission_id, EventKind::Life, "true", "carol");
        event.id = Some(3);
        handle_normal(&runtime, event).await;

        let (setting, _) = runtime.store().get_system_state(mission_id).await.unwrap();
        assert!(setting.life);
    }
}
