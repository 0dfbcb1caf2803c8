//! Durable `Store` backend on top of `sled`.
//!
//! Grounded on the teacher's `storage::AnalysisStorage`: one `sled::Db`,
//! JSON-encoded values, a handful of trees keyed by monotonically
//! increasing `u64` ids, `db.flush()` after every write that must survive
//! a crash.

use super::{Diagnostic, Store, StoreError};
use crate::types::{Event, EventKind, EventStatus, Mission, ProgramStep, RocketSetting, RocketStatus};
use async_trait::async_trait;
use chrono::Utc;
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Durable, sled-backed implementation of the [`Store`] contract.
pub struct SledStore {
    db: Db,
    missions: sled::Tree,
    system_state: sled::Tree,
    events: sled::Tree,
    programs: sled::Tree,
    accidents: sled::Tree,
    diagnostics: sled::Tree,
    next_mission_id: AtomicU64,
    next_event_id: AtomicU64,
    next_program_id: AtomicU64,
    next_accident_id: AtomicU64,
    next_diagnostic_id: AtomicU64,
}

impl SledStore {
    /// Open (or create) a sled database at `path`, restoring id counters
    /// from the highest key already present in each tree.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let db = sled::open(path)?;
        let missions = db.open_tree("missions")?;
        let system_state = db.open_tree("system_state")?;
        let events = db.open_tree("events")?;
        let programs = db.open_tree("programs")?;
        let accidents = db.open_tree("accidents")?;
        let diagnostics = db.open_tree("diagnostics")?;

        let next_mission_id = AtomicU64::new(highest_key(&missions)? + 1);
        let next_event_id = AtomicU64::new(highest_key(&events)? + 1);
        let next_program_id = AtomicU64::new(highest_key(&programs)? + 1);
        let next_accident_id = AtomicU64::new(highest_key(&accidents)? + 1);
        let next_diagnostic_id = AtomicU64::new(highest_key(&diagnostics)? + 1);

        Ok(Self {
            db,
            missions,
            system_state,
            events,
            programs,
            accidents,
            diagnostics,
            next_mission_id,
            next_event_id,
            next_program_id,
            next_accident_id,
            next_diagnostic_id,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(tree: &sled::Tree, key: u64) -> Result<T, StoreError> {
        let bytes = tree
            .get(key.to_be_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn put_json<T: serde::Serialize>(&self, tree: &sled::Tree, key: u64, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        tree.insert(key.to_be_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.db.flush().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

fn highest_key(tree: &sled::Tree) -> anyhow::Result<u64> {
    match tree.last()? {
        Some((key, _)) => {
            let bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| anyhow::anyhow!("corrupt key in sled tree"))?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

#[async_trait]
impl Store for SledStore {
    async fn get_mission(&self, id: u64) -> Result<Mission, StoreError> {
        Self::get_json(&self.missions, id)
    }

    async fn add_mission(
        &self,
        name: &str,
        created_by: &str,
        duration: i64,
        success_rate: Option<f64>,
    ) -> Result<Mission, StoreError> {
        let id = self.next_mission_id.fetch_add(1, Ordering::SeqCst);
        let mission = Mission {
            id,
            name: name.to_string(),
            created_by: created_by.to_string(),
            duration,
            status: EventStatus::Pending,
            success_rate: success_rate.unwrap_or(crate::types::DEFAULT_SUCCESS_RATE),
            created_at: Utc::now(),
        };
        self.put_json(&self.missions, id, &mission)?;
        self.put_json(
            &self.system_state,
            id,
            &(RocketSetting::default(), RocketStatus::default()),
        )?;
        Ok(mission)
    }

    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let mut missions = Vec::new();
        for entry in self.missions.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let mission: Mission = serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
            missions.push(mission);
        }
        missions.sort_by_key(|m| m.id);
        Ok(missions)
    }

    async fn update_mission_status(&self, id: u64, status: EventStatus) -> Result<(), StoreError> {
        let mut mission: Mission = Self::get_json(&self.missions, id)?;
        mission.status = status;
        self.put_json(&self.missions, id, &mission)
    }

    async fn get_system_state(&self, mission_id: u64) -> Result<(RocketSetting, RocketStatus), StoreError> {
        Self::get_json(&self.system_state, mission_id)
    }

    async fn update_system_setting(&self, mission_id: u64, setting: RocketSetting) -> Result<(), StoreError> {
        let (_, status): (RocketSetting, RocketStatus) = Self::get_json(&self.system_state, mission_id)?;
        self.put_json(&self.system_state, mission_id, &(setting, status))
    }

    async fn update_system_status(&self, mission_id: u64, status: RocketStatus) -> Result<(), StoreError> {
        let (setting, _): (RocketSetting, RocketStatus) = Self::get_json(&self.system_state, mission_id)?;
        self.put_json(&self.system_state, mission_id, &(setting, status))
    }

    async fn add_event(
        &self,
        mission_id: u64,
        kind: EventKind,
        value: &str,
        created_by: &str,
    ) -> Result<Event, StoreError> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id: Some(id),
            mission_id,
            parent_id: None,
            kind,
            value: value.to_string(),
            created_by: created_by.to_string(),
            status: EventStatus::Pending,
            created_at: Utc::now(),
        };
        self.put_json(&self.events, id, &event)?;
        Ok(event)
    }

    async fn add_sub_event(
        &self,
        mission_id: u64,
        parent_id: u64,
        kind: EventKind,
        value: &str,
        created_by: &str,
    ) -> Result<Event, StoreError> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id: Some(id),
            mission_id,
            parent_id: Some(parent_id),
            kind,
            value: value.to_string(),
            created_by: created_by.to_string(),
            status: EventStatus::Pending,
            created_at: Utc::now(),
        };
        self.put_json(&self.events, id, &event)?;
        Ok(event)
    }

    async fn update_event_status(&self, event_id: u64, status: EventStatus) -> Result<(), StoreError> {
        let mut event: Event = Self::get_json(&self.events, event_id)?;
        event.status = status;
        self.put_json(&self.events, event_id, &event)
    }

    async fn get_custom_program(&self, id: u64) -> Result<Vec<ProgramStep>, StoreError> {
        Self::get_json(&self.programs, id)
    }

    async fn add_custom_program(&self, _name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError> {
        let id = self.next_program_id.fetch_add(1, Ordering::SeqCst);
        self.put_json(&self.programs, id, &steps)?;
        Ok(id)
    }

    async fn get_random_accident(&self) -> Result<Vec<ProgramStep>, StoreError> {
        let count = self.accidents.len();
        if count == 0 {
            return Err(StoreError::NotFound);
        }
        let skip = rand::random::<usize>() % count;
        let entry = self
            .accidents
            .iter()
            .nth(skip)
            .ok_or(StoreError::NotFound)?
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        serde_json::from_slice(&entry.1).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn add_accident(&self, _name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError> {
        let id = self.next_accident_id.fetch_add(1, Ordering::SeqCst);
        self.put_json(&self.accidents, id, &steps)?;
        Ok(id)
    }

    async fn add_diagnostic(&self, mut diagnostic: Diagnostic) -> Result<Diagnostic, StoreError> {
        let id = self.next_diagnostic_id.fetch_add(1, Ordering::SeqCst);
        diagnostic.id = id;
        self.put_json(&self.diagnostics, id, &diagnostic)?;
        Ok(diagnostic)
    }

    async fn get_diagnostic(&self, id: u64) -> Result<Diagnostic, StoreError> {
        Self::get_json(&self.diagnostics, id)
    }

    async fn list_diagnostics(&self, mission_id: u64) -> Result<Vec<Diagnostic>, StoreError> {
        let mut list = Vec::new();
        for entry in self.diagnostics.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let diagnostic: Diagnostic =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
            if diagnostic.mission_id == mission_id {
                list.push(diagnostic);
            }
        }
        list.sort_by_key(|d| d.id);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mission_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        let fetched = store.get_mission(mission.id).await.unwrap();
        assert_eq!(fetched.name, "Apollo");
    }

    #[tokio::test]
    async fn reopening_preserves_next_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let store = SledStore::open(&path).unwrap();
            store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        }
        let store = SledStore::open(&path).unwrap();
        let second = store.add_mission("Gemini", "bob", 60, None).await.unwrap();
        assert_eq!(second.id, 1);
    }

    #[tokio::test]
    async fn unknown_diagnostic_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        let err = store.get_diagnostic(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
