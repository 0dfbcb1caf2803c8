//! Shared property tests run against both `Store` backends (`SPEC_FULL.md`
//! §8): a backend swap must never silently change event ordering or status
//! semantics, so the same assertions are exercised against `InMemoryStore`
//! and `SledStore` through the trait object alone.

use rocket_control::store::{InMemoryStore, SledStore, Store};
use rocket_control::types::{EventKind, EventStatus, ProgramStep};
use std::sync::Arc;

async fn in_memory() -> Arc<dyn Store> {
    Arc::new(InMemoryStore::new())
}

async fn sled(dir: &tempfile::TempDir) -> Arc<dyn Store> {
    Arc::new(SledStore::open(dir.path().join("db")).unwrap())
}

async fn exercises_mission_round_trip(store: Arc<dyn Store>) {
    let mission = store.add_mission("Apollo", "alice", 600, None).await.unwrap();
    assert_eq!(mission.success_rate, rocket_control::types::DEFAULT_SUCCESS_RATE);

    let fetched = store.get_mission(mission.id).await.unwrap();
    assert_eq!(fetched.name, "Apollo");
    assert_eq!(fetched.created_by, "alice");

    store.update_mission_status(mission.id, EventStatus::InProgress).await.unwrap();
    let updated = store.get_mission(mission.id).await.unwrap();
    assert_eq!(updated.status, EventStatus::InProgress);
}

async fn exercises_event_lifecycle(store: Arc<dyn Store>) {
    let mission = store.add_mission("Apollo", "alice", 600, None).await.unwrap();
    let event = store.add_event(mission.id, EventKind::CustomAdd, "1", "alice").await.unwrap();
    assert_eq!(event.status, EventStatus::Pending);
    let event_id = event.id.unwrap();

    let sub = store
        .add_sub_event(mission.id, event_id, EventKind::Thrust, "10", "alice")
        .await
        .unwrap();
    assert_eq!(sub.parent_id, Some(event_id));

    store.update_event_status(event_id, EventStatus::Completed).await.unwrap();
    store.update_event_status(sub.id.unwrap(), EventStatus::Completed).await.unwrap();
}

async fn exercises_system_state_round_trip(store: Arc<dyn Store>) {
    let mission = store.add_mission("Apollo", "alice", 600, None).await.unwrap();
    let (mut setting, status) = store.get_system_state(mission.id).await.unwrap();
    setting.thrust = 73.5;
    store.update_system_setting(mission.id, setting).await.unwrap();

    let (after, after_status) = store.get_system_state(mission.id).await.unwrap();
    assert_eq!(after.thrust, 73.5);
    assert_eq!(after_status, status);
}

async fn exercises_program_and_accident_lookup(store: Arc<dyn Store>) {
    let steps = vec![ProgramStep {
        kind: EventKind::Thrust,
        value: "50".to_string(),
        description: "bump thrust".to_string(),
        duration_ms: 100,
    }];
    let program_id = store.add_custom_program("bump", steps.clone()).await.unwrap();
    let fetched = store.get_custom_program(program_id).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].value, "50");

    assert!(store.get_random_accident().await.is_err());
    store.add_accident("hull-breach", steps).await.unwrap();
    let accident = store.get_random_accident().await.unwrap();
    assert_eq!(accident.len(), 1);
}

async fn exercises_diagnostic_round_trip(store: Arc<dyn Store>) {
    let mission = store.add_mission("Apollo", "alice", 600, None).await.unwrap();
    let diagnostic = rocket_control::store::Diagnostic {
        id: 0,
        mission_id: mission.id,
        description: "hull critical".to_string(),
        hull_level: 15.0,
        fuel_level: 50.0,
        oxygen_level: 50.0,
        temperature_level: 20.0,
        pressure_level: 50.0,
        created_at: chrono::Utc::now(),
    };
    let saved = store.add_diagnostic(diagnostic).await.unwrap();
    let fetched = store.get_diagnostic(saved.id).await.unwrap();
    assert_eq!(fetched.description, "hull critical");

    let list = store.list_diagnostics(mission.id).await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn in_memory_store_satisfies_the_contract() {
    exercises_mission_round_trip(in_memory().await).await;
    exercises_event_lifecycle(in_memory().await).await;
    exercises_system_state_round_trip(in_memory().await).await;
    exercises_program_and_accident_lookup(in_memory().await).await;
    exercises_diagnostic_round_trip(in_memory().await).await;
}

#[tokio::test]
async fn sled_store_satisfies_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    exercises_mission_round_trip(sled(&dir).await).await;
    let dir = tempfile::tempdir().unwrap();
    exercises_event_lifecycle(sled(&dir).await).await;
    let dir = tempfile::tempdir().unwrap();
    exercises_system_state_round_trip(sled(&dir).await).await;
    let dir = tempfile::tempdir().unwrap();
    exercises_program_and_accident_lookup(sled(&dir).await).await;
    let dir = tempfile::tempdir().unwrap();
    exercises_diagnostic_round_trip(sled(&dir).await).await;
}
