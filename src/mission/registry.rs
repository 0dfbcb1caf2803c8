//! Mission registry (§4.9): process-wide map from mission id to its
//! runtime, created on first join and torn down on last leave.

use super::error::MissionError;
use super::runtime::MissionRuntime;
use crate::store::Store;
use crate::types::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub struct MissionRegistry {
    store: Arc<dyn Store>,
    missions: Mutex<HashMap<u64, Arc<MissionRuntime>>>,
}

impl MissionRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            missions: Mutex::new(HashMap::new()),
        }
    }

    /// Join `user` to `mission_id`, creating the runtime if this is the
    /// first member. Returns the subscriber's outbound channel.
    pub async fn join(&self, mission_id: u64, user: &str) -> Result<mpsc::Receiver<Message>, MissionError> {
        let runtime = self.runtime_for(mission_id).await?;
        runtime.join(user).await
    }

    /// Submit an inbound action to the runtime already backing
    /// `mission_id` (the caller must have joined it first).
    pub async fn submit(
        &self,
        mission_id: u64,
        kind: crate::types::EventKind,
        value: String,
        created_by: String,
    ) -> Result<(), MissionError> {
        let runtime = {
            let missions = self.missions.lock().await;
            missions.get(&mission_id).cloned().ok_or(MissionError::MissionNotFound)?
        };
        runtime.add_event(kind, value, created_by).await;
        Ok(())
    }

    /// Remove `user` from `mission_id`. If the mission now has no members,
    /// its runtime is shut down and removed from the registry.
    pub async fn leave(&self, mission_id: u64, user: &str) -> Result<(), MissionError> {
        let runtime = {
            let missions = self.missions.lock().await;
            missions.get(&mission_id).cloned().ok_or(MissionError::MissionNotFound)?
        };

        let now_empty = runtime.leave(user).await?;

        if now_empty {
            let mut missions = self.missions.lock().await;
            // Re-check under the lock: another join may have landed between
            // `leave` reporting empty and us acquiring the registry lock.
            if missions.get(&mission_id).map(|r| Arc::ptr_eq(r, &runtime)).unwrap_or(false) {
                missions.remove(&mission_id);
                runtime.shutdown();
                info!(mission_id, "mission runtime removed from registry");
            }
        }

        Ok(())
    }

    async fn runtime_for(&self, mission_id: u64) -> Result<Arc<MissionRuntime>, MissionError> {
        let mut missions = self.missions.lock().await;
        if let Some(runtime) = missions.get(&mission_id) {
            return Ok(runtime.clone());
        }

        let mission = self
            .store
            .get_mission(mission_id)
            .await
            .map_err(|_| MissionError::MissionNotFound)?;
        let (setting, status) = self.store.get_system_state(mission_id).await?;

        let runtime = MissionRuntime::spawn(&mission, setting, status, self.store.clone());
        missions.insert(mission_id, runtime.clone());
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    async fn registry_with_mission() -> (MissionRegistry, u64) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        (MissionRegistry::new(store), mission.id)
    }

    #[tokio::test]
    async fn join_creates_runtime_lazily() {
        let (registry, mission_id) = registry_with_mission().await;
        let _rx = registry.join(mission_id, "alice").await.unwrap();
        assert_eq!(registry.missions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_join_is_rejected() {
        let (registry, mission_id) = registry_with_mission().await;
        let _rx = registry.join(mission_id, "alice").await.unwrap();
        let err = registry.join(mission_id, "alice").await.unwrap_err();
        assert!(matches!(err, MissionError::AlreadyJoined));
    }

    #[tokio::test]
    async fn join_unknown_mission_errors() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let registry = MissionRegistry::new(store);
        let err = registry.join(999, "alice").await.unwrap_err();
        assert!(matches!(err, MissionError::MissionNotFound));
    }

    #[tokio::test]
    async fn last_leave_removes_runtime() {
        let (registry, mission_id) = registry_with_mission().await;
        let _rx = registry.join(mission_id, "alice").await.unwrap();
        registry.leave(mission_id, "alice").await.unwrap();
        assert_eq!(registry.missions.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn leave_unknown_user_errors() {
        let (registry, mission_id) = registry_with_mission().await;
        let _rx = registry.join(mission_id, "alice").await.unwrap();
        let err = registry.leave(mission_id, "ghost").await.unwrap_err();
        assert!(matches!(err, MissionError::NotAMember));
    }
}
