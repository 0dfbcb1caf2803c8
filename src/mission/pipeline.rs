//! Single-consumer event pipeline (§4.2).
//!
//! One dedicated task dequeues events in FIFO order and dispatches each by
//! kind. `CustomAdd`, `Launch`, and `CustomCancel` spawn their own tasks so
//! the consumer keeps draining the queue while a scripted program or a
//! launch countdown is in flight (§9's asynchronous-Launch resolution).

use super::runtime::MissionRuntime;
use super::{handlers, program};
use crate::types::{Event, EventKind, EventStatus, Message};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(runtime: Arc<MissionRuntime>, mut rx: mpsc::Receiver<Event>) {
    let cancel = runtime.cancel_token();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(mission_id = runtime.mission_id, "event pipeline stopped");
                return;
            }
            event = rx.recv() => {
                match event {
                    Some(event) => dispatch(runtime.clone(), event).await,
                    None => return,
                }
            }
        }
    }
}

async fn dispatch(runtime: Arc<MissionRuntime>, event: Event) {
    // A synthetic failure generated by `add_event` already carries a
    // terminal status; just broadcast it.
    if is_terminal(event.status) {
        let msg = Message::from_event(&event, "event could not be persisted");
        runtime.broadcast(&msg).await;
        return;
    }

    match event.kind {
        EventKind::CustomAdd => {
            tokio::spawn(program::run(runtime, event));
        }
        EventKind::CustomCancel => {
            program::cancel(&runtime, &event).await;
        }
        EventKind::Launch => {
            tokio::spawn(program::run_launch(runtime, event));
        }
        _ => handlers::handle_normal(&runtime, event).await,
    }
}

fn is_terminal(status: EventStatus) -> bool {
    matches!(status, EventStatus::Completed | EventStatus::Failed | EventStatus::Cancelled)
}
