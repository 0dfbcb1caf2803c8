//! The per-mission runtime: the in-memory state machine that owns one
//! mission's rocket settings/status, serializes commands from all
//! connected operators through an ordered event pipeline, and drives the
//! background loops that evolve and broadcast state.

mod accident;
mod diagnostic;
mod error;
mod handlers;
mod physics;
mod pipeline;
mod program;
mod registry;
mod runtime;
mod state;
mod telemetry;

pub use error::MissionError;
pub use registry::MissionRegistry;
pub use runtime::{MissionRuntime, EVENT_QUEUE_CAPACITY};
