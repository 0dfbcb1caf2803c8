//! Store contract — pure interface to persistence.
//!
//! The per-mission runtime never touches a concrete database; it only ever
//! calls through this trait, so the backend (in-memory for tests, sled for
//! durable runs) is swappable without touching mission logic.

pub mod memory;
pub mod sled_store;

pub use memory::InMemoryStore;
pub use sled_store::SledStore;

use crate::types::{Event, EventKind, EventStatus, Mission, ProgramStep, RocketSetting, RocketStatus};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A diagnostic record created by the diagnostic subsystem (§4.8).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub id: u64,
    pub mission_id: u64,
    pub description: String,
    pub hull_level: f64,
    pub fuel_level: f64,
    pub oxygen_level: f64,
    pub temperature_level: f64,
    pub pressure_level: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Abstract persistence contract (§6 of the specification).
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// across every mission runtime and background task.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_mission(&self, id: u64) -> Result<Mission, StoreError>;
    async fn add_mission(
        &self,
        name: &str,
        created_by: &str,
        duration: i64,
        success_rate: Option<f64>,
    ) -> Result<Mission, StoreError>;
    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError>;
    async fn update_mission_status(&self, id: u64, status: EventStatus) -> Result<(), StoreError>;

    async fn get_system_state(&self, mission_id: u64) -> Result<(RocketSetting, RocketStatus), StoreError>;
    async fn update_system_setting(&self, mission_id: u64, setting: RocketSetting) -> Result<(), StoreError>;
    async fn update_system_status(&self, mission_id: u64, status: RocketStatus) -> Result<(), StoreError>;

    async fn add_event(
        &self,
        mission_id: u64,
        kind: EventKind,
        value: &str,
        created_by: &str,
    ) -> Result<Event, StoreError>;
    async fn add_sub_event(
        &self,
        mission_id: u64,
        parent_id: u64,
        kind: EventKind,
        value: &str,
        created_by: &str,
    ) -> Result<Event, StoreError>;
    async fn update_event_status(&self, event_id: u64, status: EventStatus) -> Result<(), StoreError>;

    async fn get_custom_program(&self, id: u64) -> Result<Vec<ProgramStep>, StoreError>;
    async fn add_custom_program(&self, name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError>;
    async fn get_random_accident(&self) -> Result<Vec<ProgramStep>, StoreError>;
    async fn add_accident(&self, name: &str, steps: Vec<ProgramStep>) -> Result<u64, StoreError>;

    async fn add_diagnostic(&self, diagnostic: Diagnostic) -> Result<Diagnostic, StoreError>;
    async fn get_diagnostic(&self, id: u64) -> Result<Diagnostic, StoreError>;
    async fn list_diagnostics(&self, mission_id: u64) -> Result<Vec<Diagnostic>, StoreError>;
}
