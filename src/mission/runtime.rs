//! The live, in-memory runtime for one mission: owns the exclusive lock
//! over settings/status/subscribers, the inbound event queue, and the
//! cancellation token that all background loops share.

use super::error::MissionError;
use super::state::MissionState;
use super::{accident, physics, pipeline, telemetry};
use crate::store::Store;
use crate::types::{Event, EventKind, EventStatus, Message, Mission, RocketSetting, RocketStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Capacity of the per-mission inbound event queue (§4.2).
pub const EVENT_QUEUE_CAPACITY: usize = 1000;

pub struct MissionRuntime {
    pub mission_id: u64,
    store: Arc<dyn Store>,
    state: Mutex<MissionState>,
    event_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    /// Cancellation tokens for in-flight scripted programs, keyed by the
    /// parent `CustomAdd` event id.
    program_tokens: StdMutex<HashMap<u64, CancellationToken>>,
}

impl MissionRuntime {
    /// Create the runtime and start its four background loops (process,
    /// ticker, telemetry, accident — §8 property 5). Called once, when the
    /// first user joins a mission.
    pub fn spawn(mission: &Mission, setting: RocketSetting, status: RocketStatus, store: Arc<dyn Store>) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let runtime = Arc::new(Self {
            mission_id: mission.id,
            store,
            state: Mutex::new(MissionState::new(setting, status)),
            event_tx,
            cancel: CancellationToken::new(),
            program_tokens: StdMutex::new(HashMap::new()),
        });

        info!(mission_id = runtime.mission_id, "starting mission runtime");
        tokio::spawn(pipeline::run(runtime.clone(), event_rx));
        tokio::spawn(physics::run(runtime.clone()));
        tokio::spawn(telemetry::run(runtime.clone()));
        tokio::spawn(accident::run(runtime.clone()));

        runtime
    }

    /// Signal every background loop to exit after its current iteration.
    pub fn shutdown(&self) {
        info!(mission_id = self.mission_id, "stopping mission runtime");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn state(&self) -> &Mutex<MissionState> {
        &self.state
    }

    pub fn program_tokens(&self) -> &StdMutex<HashMap<u64, CancellationToken>> {
        &self.program_tokens
    }

    /// Register `user` with the subscriber registry and enqueue a `Join`
    /// event for it. Errors if `user` is already a member (§4.9).
    pub async fn join(self: &Arc<Self>, user: &str) -> Result<mpsc::Receiver<Message>, MissionError> {
        let rx = {
            let mut state = self.state.lock().await;
            state.subscribers.add(user).map_err(|_| MissionError::AlreadyJoined)?
        };

        let runtime = self.clone();
        let user = user.to_string();
        tokio::spawn(async move {
            runtime.add_event(EventKind::Join, user.clone(), user).await;
        });

        Ok(rx)
    }

    /// Remove `user` from the subscriber registry and enqueue a `Leave`
    /// event for it. Returns whether the mission now has no subscribers.
    pub async fn leave(self: &Arc<Self>, user: &str) -> Result<bool, MissionError> {
        let now_empty = {
            let mut state = self.state.lock().await;
            state.subscribers.remove(user).map_err(|_| MissionError::NotAMember)?;
            state.subscribers.is_empty()
        };

        let runtime = self.clone();
        let user = user.to_string();
        tokio::spawn(async move {
            runtime.add_event(EventKind::Leave, user.clone(), user).await;
        });

        Ok(now_empty)
    }

    /// Persist and enqueue an event (§4.2). On store failure, a synthetic
    /// `Failed` event (no id) is enqueued instead — the pipeline consumer
    /// broadcasts it without dispatching, since its status is already
    /// terminal.
    pub async fn add_event(self: &Arc<Self>, kind: EventKind, value: impl Into<String>, created_by: impl Into<String>) {
        let value = value.into();
        let created_by = created_by.into();

        match self.store.add_event(self.mission_id, kind, &value, &created_by).await {
            Ok(event) => {
                if self.event_tx.send(event).await.is_err() {
                    warn!(mission_id = self.mission_id, "event queue closed, dropping event");
                }
            }
            Err(err) => {
                warn!(mission_id = self.mission_id, %err, "failed to persist event");
                let failed = Event {
                    id: None,
                    mission_id: self.mission_id,
                    parent_id: None,
                    kind,
                    value,
                    created_by,
                    status: EventStatus::Failed,
                    created_at: chrono::Utc::now(),
                };
                if self.event_tx.send(failed).await.is_err() {
                    warn!(mission_id = self.mission_id, "event queue closed, dropping failed event");
                }
            }
        }
    }

    /// Deliver `msg` to every current subscriber without blocking (§4.1).
    pub async fn broadcast(&self, msg: &Message) {
        let state = self.state.lock().await;
        state.subscribers.broadcast(msg);
    }

    /// Best-effort persistence of an event's terminal status. Failure here
    /// is logged, not rolled back (§7: store errors are accepted
    /// inconsistency).
    pub async fn persist_event_status(&self, event_id: Option<u64>, status: EventStatus) {
        let Some(id) = event_id else { return };
        if let Err(err) = self.store.update_event_status(id, status).await {
            warn!(mission_id = self.mission_id, event_id = id, %err, "failed to persist event status");
        }
    }
}
