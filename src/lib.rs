//! Realtime, multi-user rocket-mission simulation service.
//!
//! The core is the per-mission runtime (see [`mission`]): an in-memory
//! state machine that owns one mission's rocket settings and status,
//! serializes commands from every connected operator through an ordered
//! event pipeline, and drives several concurrent background loops (state
//! evolution, telemetry, accident injection, diagnostic triggering).
//!
//! Transport ([`api`]), persistence ([`store`]), and configuration
//! ([`config`]) are collaborators around that core.

pub mod api;
pub mod config;
pub mod mission;
pub mod store;
pub mod subscriber;
pub mod types;

pub use mission::{MissionError, MissionRegistry};
pub use store::{Store, StoreError};
pub use types::{Action, Event, EventKind, EventStatus, Message, Mission, ProgramStep, RocketSetting, RocketStatus};
