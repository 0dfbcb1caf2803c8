//! Scripted-program executor (§4.4) and the asynchronous launch countdown
//! (§9's resolution of the "Launch blocks the pipeline" open issue).

use super::handlers::apply_step;
use super::runtime::MissionRuntime;
use crate::store::StoreError;
use crate::types::{Event, EventKind, EventStatus, Message, ProgramStep};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Countdown step count and per-step interval for `Launch` (§4.3).
const LAUNCH_COUNTDOWN_STEPS: u32 = 10;
const LAUNCH_STEP_INTERVAL: Duration = Duration::from_secs(1);

/// Entry point for a `CustomAdd` event: loads the program named by the
/// parent's `value` from the store and runs it.
pub async fn run(runtime: Arc<MissionRuntime>, parent: Event) {
    let steps = match parent.value.parse::<u64>() {
        Ok(program_id) => runtime.store().get_custom_program(program_id).await,
        Err(_) => Err(StoreError::NotFound),
    };
    execute(runtime, parent, steps).await;
}

/// Entry point for the accident injector (§4.7): steps are already known,
/// no store lookup by parent value is needed.
pub async fn run_with_steps(runtime: Arc<MissionRuntime>, parent: Event, steps: Vec<ProgramStep>) {
    execute(runtime, parent, Ok(steps)).await;
}

/// Cancel the program whose parent event id equals `event.value`. Logged
/// and ignored if no program is currently registered under that id.
pub async fn cancel(runtime: &Arc<MissionRuntime>, event: &Event) {
    let Ok(parent_id) = event.value.parse::<u64>() else {
        info!(value = %event.value, "custom_cancel value is not a valid event id");
        return;
    };
    let token = runtime.program_tokens().lock().unwrap_or_else(|e| e.into_inner()).get(&parent_id).cloned();
    match token {
        Some(token) => token.cancel(),
        None => info!(parent_id, "no running program registered for cancellation"),
    }
}

fn register_token(runtime: &Arc<MissionRuntime>, parent_id: u64) -> CancellationToken {
    let token = CancellationToken::new();
    let mut tokens = runtime.program_tokens().lock().unwrap_or_else(|e| e.into_inner());
    tokens.insert(parent_id, token.clone());
    token
}

fn clear_token(runtime: &Arc<MissionRuntime>, parent_id: u64) {
    runtime.program_tokens().lock().unwrap_or_else(|e| e.into_inner()).remove(&parent_id);
}

async fn execute(runtime: Arc<MissionRuntime>, mut parent: Event, steps: Result<Vec<ProgramStep>, StoreError>) {
    let Some(parent_id) = parent.id else { return };
    let token = register_token(&runtime, parent_id);

    parent.status = EventStatus::InProgress;
    runtime.persist_event_status(parent.id, parent.status).await;
    runtime.broadcast(&Message::from_event(&parent, "program started")).await;

    let steps = match steps {
        Ok(steps) => steps,
        Err(err) => {
            finish_parent(&runtime, &mut parent, EventStatus::Failed, &format!("failed to load program: {err}")).await;
            clear_token(&runtime, parent_id);
            return;
        }
    };

    for step in steps {
        if token.is_cancelled() {
            finish_parent(&runtime, &mut parent, EventStatus::Cancelled, "program cancelled").await;
            clear_token(&runtime, parent_id);
            return;
        }

        let mut sub_event = match runtime
            .store()
            .add_sub_event(runtime.mission_id, parent_id, step.kind, &step.value, &parent.created_by)
            .await
        {
            Ok(sub_event) => sub_event,
            Err(err) => {
                finish_parent(&runtime, &mut parent, EventStatus::Failed, &format!("failed to record step: {err}")).await;
                clear_token(&runtime, parent_id);
                return;
            }
        };
        runtime.broadcast(&Message::from_event(&sub_event, &step.description)).await;

        sub_event.status = EventStatus::InProgress;
        runtime.persist_event_status(sub_event.id, sub_event.status).await;
        runtime.broadcast(&Message::from_event(&sub_event, "step started")).await;

        if let Err(reason) = apply_step(&runtime, step.kind, &step.value).await {
            sub_event.status = EventStatus::Failed;
            runtime.persist_event_status(sub_event.id, sub_event.status).await;
            runtime.broadcast(&Message::from_event(&sub_event, &reason)).await;

            finish_parent(&runtime, &mut parent, EventStatus::Failed, "a step failed").await;
            clear_token(&runtime, parent_id);
            return;
        }

        sub_event.status = EventStatus::Completed;
        runtime.persist_event_status(sub_event.id, sub_event.status).await;
        runtime.broadcast(&Message::from_event(&sub_event, "step completed")).await;

        tokio::select! {
            _ = token.cancelled() => {
                finish_parent(&runtime, &mut parent, EventStatus::Cancelled, "program cancelled").await;
                clear_token(&runtime, parent_id);
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(step.duration_ms)) => {}
        }
    }

    finish_parent(&runtime, &mut parent, EventStatus::Completed, "program completed").await;
    clear_token(&runtime, parent_id);
}

async fn finish_parent(runtime: &Arc<MissionRuntime>, parent: &mut Event, status: EventStatus, note: &str) {
    parent.status = status;
    runtime.persist_event_status(parent.id, status).await;
    runtime.broadcast(&Message::from_event(parent, note)).await;
}

/// Launch countdown (§4.3, §9): runs off the pipeline so other events keep
/// draining while it counts down. Broadcasts ten `InProgress` envelopes
/// with values `"10".."1"` one second apart, then flips
/// `status.launched = true` and marks the parent event `Completed`.
pub async fn run_launch(runtime: Arc<MissionRuntime>, mut parent: Event) {
    parent.status = EventStatus::InProgress;
    runtime.persist_event_status(parent.id, parent.status).await;

    for remaining in (1..=LAUNCH_COUNTDOWN_STEPS).rev() {
        let countdown = Event {
            value: remaining.to_string(),
            ..parent.clone()
        };
        runtime.broadcast(&Message::from_event(&countdown, "launch countdown")).await;
        if remaining > 1 {
            tokio::time::sleep(LAUNCH_STEP_INTERVAL).await;
        }
    }

    let mut state = runtime.state().lock().await;
    state.status.launched = true;
    let status = state.status;
    drop(state);

    if let Err(err) = runtime.store().update_system_status(runtime.mission_id, status).await {
        finish_parent(&runtime, &mut parent, EventStatus::Failed, &format!("failed to persist launch: {err}")).await;
        return;
    }

    finish_parent(&runtime, &mut parent, EventStatus::Completed, "launched").await;
}
