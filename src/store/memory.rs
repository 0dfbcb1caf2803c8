//! In-memory `Store` backend.
//!
//! Thread-safe via `std::sync::Mutex`. Not durable — data lost on restart.
//! This is the default backend for tests and for `--in-memory` CLI runs,
//! grounded on the teacher's `storage::persistence::InMemoryDAL`.

use super::{Diagnostic, Store, StoreError};
use crate::types::{
    Event, EventKind, EventStatus, Mission, ProgramStep, RocketSetting, RocketStatus, DEFAULT_SUCCESS_RATE,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    next_mission_id: u64,
    next_event_id: u64,
    next_program_id: u64,
    next_accident_id: u64,
    next_diagnostic_id: u64,
    missions: HashMap<u64, Mission>,
    system_state: HashMap<u64, (RocketSetting, RocketStatus)>,
    events: HashMap<u64, Event>,
    programs: HashMap<u64, Vec<ProgramStep>>,
    accidents: HashMap<u64, Vec<ProgramStep>>,
    diagnostics: HashMap<u64, Diagnostic>,
}

/// In-memory implementation of the [`Store`] contract.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a mission directly with known system state — convenient for
    /// tests that want deterministic starting settings.
    pub fn seed_mission(&self, mission: Mission, setting: RocketSetting, status: RocketStatus) {
        let mut tables = self.lock();
        tables.next_mission_id = tables.next_mission_id.max(mission.id + 1);
        tables.system_state.insert(mission.id, (setting, status));
        tables.missions.insert(mission.id, mission);
    }

    /// Seed a custom program or accident program for tests.
    pub fn seed_program(&self, id: u64, steps: Vec<ProgramStep>) {
        let mut tables = self.lock();
        tables.next_program_id = tables.next_program_id.max(id + 1);
        tables.programs.insert(id, steps);
    }

    pub fn seed_accident(&self, id: u64, steps: Vec<ProgramStep>) {
        let mut tables = self.lock();
        tables.next_accident_id = tables.next_accident_id.max(id + 1);
        tables.accidents.insert(id, steps);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_mission(&self, id: u64) -> Result<Mission, StoreError> {
        self.lock().missions.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn add_mission(
        &self,
        name: &str,
        created_by: &str,
        duration: i64,
        success_rate: Option<f64>,
    ) -> Result<Mission, StoreError> {
        let mut tables = self.lock();
        let id = tables.next_mission_id;
        tables.next_mission_id += 1;
        let mission = Mission {
            id,
            name: name.to_string(),
            created_by: created_by.to_string(),
            duration,
            status: EventStatus::Pending,
            success_rate: success_rate.unwrap_or(DEFAULT_SUCCESS_RATE),
            created_at: Utc::now(),
        };
        tables.missions.insert(id, mission.clone());
        tables
            .system_state
            .insert(id, (RocketSetting::default(), RocketStatus::default()));
        Ok(mission)
    }

    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let mut missions: Vec<Mission> = self.lock().missions.values().cloned().collect();
        missions.sort_by_key(|m| m.id);
        Ok(missions)
    }

    async fn update_mission_status(&self, id: u64, status: EventStatus) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let mission = tables.missions.get_mut(&id).ok_or(StoreError::NotFound)?;
        mission.status = status;
        Ok(())
    }

    async fn get_system_state(&self, mission_id: u64) -> Result<(RocketSetting, RocketStatus), StoreError> {
        self.lock()
            .system_state
            .get(&mission_id)
            .copied()
            .ok_or(StoreError::NotFound)
    }

    async fn update_system_setting(&self, mission_id: u64, setting: RocketSetting) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let entry = tables.system_state.get_mut(&mission_id).ok_or(StoreError::NotFound)?;
        entry.0 = setting;
        Ok(())
    }

    async fn update_system_status(&self, mission_id: u64, status: RocketStatus) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let entry = tables.system_state.get_mut(&mission_id).ok_or(StoreError::NotFound)?;
        entry.1 = status;
        Ok(())
    }

    async fn add_event(
        &self,
        mission_id: u64,
        kind: EventKind,
        value: &str,
        created_by: &str,
    ) -> Result<Event, StoreError> {
        let mut tables = self.lock();
        let id = tables.next_event_id;
        tables.next_event_id += 1;
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
        tables.events.insert(id, event.clone());
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
        let mut tables = self.lock();
        let id = tables.next_event_id;
        tables.next_event_id += 1;
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
        tables.events.insert(id, event.clone());
        Ok(event)
    }

    async fn update_event_status(&self, event_id: u64, status: EventStatus) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let event = tables.events.get_mut(&event_id).ok_or(StoreError::NotFound)?;
        event.status = status;
        Ok(())
    }

    async fn get_custom_program(&self, id: u64) -> Result<Vec<ProgramStep>, StoreError> {
        self.lock().programs.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn add_custom_program(&self, _name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let id = tables.next_program_id;
        tables.next_program_id += 1;
        tables.programs.insert(id, steps);
        Ok(id)
    }

    async fn get_random_accident(&self) -> Result<Vec<ProgramStep>, StoreError> {
        use rand::seq::IteratorRandom;
        let tables = self.lock();
        if tables.accidents.is_empty() {
            return Err(StoreError::NotFound);
        }
        let mut rng = rand::thread_rng();
        tables
            .accidents
            .values()
            .choose(&mut rng)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn add_accident(&self, _name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let id = tables.next_accident_id;
        tables.next_accident_id += 1;
        tables.accidents.insert(id, steps);
        Ok(id)
    }

    async fn add_diagnostic(&self, mut diagnostic: Diagnostic) -> Result<Diagnostic, StoreError> {
        let mut tables = self.lock();
        let id = tables.next_diagnostic_id;
        tables.next_diagnostic_id += 1;
        diagnostic.id = id;
        tables.diagnostics.insert(id, diagnostic.clone());
        Ok(diagnostic)
    }

    async fn get_diagnostic(&self, id: u64) -> Result<Diagnostic, StoreError> {
        self.lock().diagnostics.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_diagnostics(&self, mission_id: u64) -> Result<Vec<Diagnostic>, StoreError> {
        let mut list: Vec<Diagnostic> = self
            .lock()
            .diagnostics
            .values()
            .filter(|d| d.mission_id == mission_id)
            .cloned()
            .collect();
        list.sort_by_key(|d| d.id);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_get_mission_round_trips() {
        let store = InMemoryStore::new();
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        assert_eq!(mission.success_rate, DEFAULT_SUCCESS_RATE);

        let fetched = store.get_mission(mission.id).await.unwrap();
        assert_eq!(fetched.name, "Apollo");
    }

    #[tokio::test]
    async fn unknown_mission_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_mission(999).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn event_status_updates_are_visible() {
        let store = InMemoryStore::new();
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        let event = store
            .add_event(mission.id, EventKind::Launch, "", "alice")
            .await
            .unwrap();
        store
            .update_event_status(event.id.unwrap(), EventStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn system_setting_round_trips() {
        let store = InMemoryStore::new();
        let mission = store.add_mission("Apollo", "alice", 120, None).await.unwrap();
        let (mut setting, _) = store.get_system_state(mission.id).await.unwrap();
        setting.thrust = 55.0;
        store.update_system_setting(mission.id, setting).await.unwrap();
        let (after, _) = store.get_system_state(mission.id).await.unwrap();
        assert_eq!(after.thrust, 55.0);
    }
}
