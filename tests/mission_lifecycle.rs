//! Integration tests driving the mission registry end to end, the way
//! the teacher's `tests/` directory exercises whole pipelines rather than
//! individual units.

use rocket_control::store::{InMemoryStore, Store};
use rocket_control::types::{Action, EventKind, EventStatus, ProgramStep};
use rocket_control::MissionRegistry;
use std::sync::Arc;
use std::time::Duration;

async fn registry_with_mission() -> (MissionRegistry, u64, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let mission = store.add_mission("Apollo", "alice", 600, None).await.unwrap();
    (MissionRegistry::new(store.clone()), mission.id, store)
}

fn submit(registry: &MissionRegistry, mission_id: u64, action: Action, user: &str) -> impl std::future::Future<Output = ()> + '_ {
    let user = user.to_string();
    async move {
        registry.submit(mission_id, action.kind, action.value, user).await.unwrap();
    }
}

#[tokio::test]
async fn join_then_leave_removes_the_mission_runtime() {
    let (registry, mission_id, _store) = registry_with_mission().await;

    let mut rx = registry.join(mission_id, "alice").await.unwrap();
    // The Join event itself is broadcast to the joiner.
    let joined = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(joined.action.kind, EventKind::Join);
    assert_eq!(joined.status, EventStatus::Completed);

    registry.leave(mission_id, "alice").await.unwrap();

    // A second join recreates a fresh runtime rather than reusing a
    // half-torn-down one.
    let _rx2 = registry.join(mission_id, "alice").await.unwrap();
}

#[tokio::test]
async fn validation_failure_is_reported_without_changing_settings() {
    let (registry, mission_id, store) = registry_with_mission().await;
    let mut rx = registry.join(mission_id, "bob").await.unwrap();
    let _join = rx.recv().await.unwrap();

    submit(
        &registry,
        mission_id,
        Action {
            kind: EventKind::Thrust,
            value: "not-a-number".to_string(),
        },
        "bob",
    )
    .await;

    let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(msg.action.kind, EventKind::Thrust);
    assert_eq!(msg.status, EventStatus::Failed);

    let (setting, _) = store.get_system_state(mission_id).await.unwrap();
    assert_eq!(setting.thrust, rocket_control::types::RocketSetting::default().thrust);
}

#[tokio::test]
async fn slow_subscriber_does_not_block_broadcast_to_others() {
    let (registry, mission_id, _store) = registry_with_mission().await;

    let mut dan_rx = registry.join(mission_id, "dan").await.unwrap();
    let _dan_join = dan_rx.recv().await.unwrap();
    let mut eve_rx = registry.join(mission_id, "eve").await.unwrap();
    // Eve's join, and Dan's observation of Eve's join, come through first.
    let _ = dan_rx.recv().await.unwrap();
    let _eve_join = eve_rx.recv().await.unwrap();

    // Starve Dan's channel without reading it, then confirm a broadcast
    // still reaches Eve promptly (non-blocking broadcast invariant).
    for i in 0..rocket_control::subscriber::SUBSCRIBER_BUFFER + 5 {
        submit(
            &registry,
            mission_id,
            Action {
                kind: EventKind::Speed,
                value: i.to_string(),
            },
            "eve",
        )
        .await;
    }

    let got = tokio::time::timeout(Duration::from_secs(2), eve_rx.recv()).await;
    assert!(got.is_ok(), "eve should keep receiving broadcasts even though dan's channel overflowed");
}

#[tokio::test]
async fn scripted_program_cancelled_midway_reports_cancelled_parent() {
    let (registry, mission_id, store) = registry_with_mission().await;
    let mut rx = registry.join(mission_id, "carol").await.unwrap();
    let _join = rx.recv().await.unwrap();

    let program_id = store
        .add_custom_program(
            "three-step",
            vec![
                ProgramStep {
                    kind: EventKind::Thrust,
                    value: "10".to_string(),
                    description: "step one".to_string(),
                    duration_ms: 500,
                },
                ProgramStep {
                    kind: EventKind::Thrust,
                    value: "20".to_string(),
                    description: "step two".to_string(),
                    duration_ms: 500,
                },
                ProgramStep {
                    kind: EventKind::Thrust,
                    value: "30".to_string(),
                    description: "step three".to_string(),
                    duration_ms: 500,
                },
            ],
        )
        .await
        .unwrap();

    // Carol's join is event 0; the parent `custom_add` she submits next is
    // event 1 — this store is fresh, so the id is deterministic.
    submit(
        &registry,
        mission_id,
        Action {
            kind: EventKind::CustomAdd,
            value: program_id.to_string(),
        },
        "carol",
    )
    .await;
    let parent_id = 1u64;

    tokio::time::sleep(Duration::from_millis(600)).await;
    submit(
        &registry,
        mission_id,
        Action {
            kind: EventKind::CustomCancel,
            value: parent_id.to_string(),
        },
        "carol",
    )
    .await;

    let mut saw_completed_step = false;
    let mut saw_cancelled_parent = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        let Ok(Some(msg)) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await else {
            break;
        };
        if msg.status == EventStatus::Completed && msg.msg == "step completed" {
            saw_completed_step = true;
        }
        if msg.action.kind == EventKind::CustomAdd && msg.status == EventStatus::Cancelled {
            saw_cancelled_parent = true;
            break;
        }
    }

    assert!(saw_completed_step, "expected at least the first step to complete before cancellation");
    assert!(saw_cancelled_parent, "expected the parent program to end Cancelled");
}

#[tokio::test]
async fn duplicate_join_is_rejected_and_unknown_mission_errors() {
    let (registry, mission_id, _store) = registry_with_mission().await;
    let _rx = registry.join(mission_id, "alice").await.unwrap();
    assert!(registry.join(mission_id, "alice").await.is_err());
    assert!(registry.join(9999, "ghost").await.is_err());
}
