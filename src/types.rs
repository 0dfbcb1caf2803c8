//! Core data model: missions, rocket settings/status, events, programs.
//!
//! Field names and wire tags follow §3 and §6 of the runtime specification
//! exactly — they are part of the client/server protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mission's static header plus externally-driven status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: u64,
    pub name: String,
    pub created_by: String,
    pub duration: i64,
    pub status: MissionStatus,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
}

/// Shared by [`Mission`] and [`Event`] — both use the same pending/terminal
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EventStatus {
    Pending = 0,
    InProgress = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

/// Alias kept for readability at call sites that talk about mission
/// lifecycle rather than event lifecycle — same representation.
pub type MissionStatus = EventStatus;

pub const DEFAULT_SUCCESS_RATE: f64 = 98.0;

/// Operator-controlled inputs. All floats are finite; `stabilizer` is
/// interpreted as a success probability in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocketSetting {
    pub power: bool,
    pub comms: bool,
    pub nav: bool,
    pub life: bool,

    pub thrust: f64,
    pub altitude: f64,
    pub fuel: f64,
    pub speed: f64,
    pub temperature: f64,
    pub stabilizer: f64,
    pub oxygen: f64,
    pub orbit: f64,
    pub power_level: f64,
    pub pressure: f64,
}

impl Default for RocketSetting {
    fn default() -> Self {
        Self {
            power: false,
            comms: false,
            nav: false,
            life: false,
            thrust: 0.0,
            altitude: 0.0,
            fuel: 100.0,
            speed: 0.0,
            temperature: 20.0,
            stabilizer: 1.0,
            oxygen: 100.0,
            orbit: 0.0,
            power_level: 100.0,
            pressure: 50.0,
        }
    }
}

/// Derived rocket state. All levels are clamped to `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocketStatus {
    pub launched: bool,
    pub hull_level: f64,
    pub fuel_level: f64,
    pub oxygen_level: f64,
    pub temperature_level: f64,
    pub pressure_level: f64,
}

impl Default for RocketStatus {
    fn default() -> Self {
        Self {
            launched: false,
            hull_level: 100.0,
            fuel_level: 100.0,
            oxygen_level: 100.0,
            temperature_level: 20.0,
            pressure_level: 50.0,
        }
    }
}

impl RocketStatus {
    /// Clamp every level to `>= 0`, leaving `launched` untouched.
    pub fn clamp_levels(&mut self) {
        self.hull_level = self.hull_level.max(0.0);
        self.fuel_level = self.fuel_level.max(0.0);
        self.oxygen_level = self.oxygen_level.max(0.0);
        self.temperature_level = self.temperature_level.max(0.0);
        self.pressure_level = self.pressure_level.max(0.0);
    }
}

/// Wire tags for event/action kinds — part of the protocol, see §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Error,
    Join,
    Leave,
    Launch,
    Abort,
    Land,
    Test,
    Accident,
    Diagnose,
    DiagnoseResult,
    ClearDiagnose,
    CustomAdd,
    CustomCancel,

    Power,
    Comms,
    Nav,
    Life,

    Thrust,
    Altitude,
    Fuel,
    Speed,
    Temperature,
    Stabilizer,
    Oxygen,
    Orbit,
    PowerLevel,
    Pressure,

    HullChange,
    FuelChange,
    OxygenChange,
    TemperatureChange,
    PressureChange,
}

/// A persisted, append-only event. Status transitions are monotonic:
/// `Pending -> InProgress -> {Completed | Failed | Cancelled}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<u64>,
    pub mission_id: u64,
    pub parent_id: Option<u64>,
    pub kind: EventKind,
    pub value: String,
    pub created_by: String,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(mission_id: u64, kind: EventKind, value: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: None,
            mission_id,
            parent_id: None,
            kind,
            value: value.into(),
            created_by: created_by.into(),
            status: EventStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn sub_event(parent: &Event, kind: EventKind, value: impl Into<String>) -> Self {
        Self {
            id: None,
            mission_id: parent.mission_id,
            parent_id: parent.id,
            kind,
            value: value.into(),
            created_by: parent.created_by.clone(),
            status: EventStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// One step of a scripted program (custom program or accident).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramStep {
    pub kind: EventKind,
    pub value: String,
    pub description: String,
    pub duration_ms: u64,
}

/// Inbound action frame from a connected operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub value: String,
}

impl Action {
    pub fn to_event(&self, mission_id: u64, created_by: impl Into<String>) -> Event {
        Event::new(mission_id, self.kind, self.value.clone(), created_by)
    }
}

/// Outbound message frame delivered to a connected operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub action: Action,
    pub status: EventStatus,
    pub created_by: String,
    pub time: DateTime<Utc>,
    pub msg: String,
}

impl Message {
    pub fn from_event(event: &Event, msg: impl Into<String>) -> Self {
        Self {
            action: Action {
                kind: event.kind,
                value: event.value.clone(),
            },
            status: event.status,
            created_by: event.created_by.clone(),
            time: Utc::now(),
            msg: msg.into(),
        }
    }
}

// `serde_repr` isn't part of the dependency set; status is encoded as a
// plain integer via a hand-written impl instead.
mod status_repr {
    use super::EventStatus;
    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    impl Serialize for EventStatus {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_i32(*self as i32)
        }
    }

    struct StatusVisitor;

    impl<'de> Visitor<'de> for StatusVisitor {
        type Value = EventStatus;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer 0..=4 representing an event status")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(EventStatus::Pending),
                1 => Ok(EventStatus::InProgress),
                2 => Ok(EventStatus::Completed),
                3 => Ok(EventStatus::Failed),
                4 => Ok(EventStatus::Cancelled),
                other => Err(de::Error::custom(format!("invalid event status: {other}"))),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            self.visit_u64(v as u64)
        }
    }

    impl<'de> Deserialize<'de> for EventStatus {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_i32(StatusVisitor)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_status_round_trips_as_integer() {
        for status in [
            EventStatus::Pending,
            EventStatus::InProgress,
            EventStatus::Completed,
            EventStatus::Failed,
            EventStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: EventStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, back);
        }
    }

    #[test]
    fn rocket_status_clamps_negative_levels() {
        let mut status = RocketStatus {
            launched: true,
            hull_level: -5.0,
            fuel_level: 10.0,
            oxygen_level: -0.01,
            temperature_level: 50.0,
            pressure_level: -100.0,
        };
        status.clamp_levels();
        assert_eq!(status.hull_level, 0.0);
        assert_eq!(status.fuel_level, 10.0);
        assert_eq!(status.oxygen_level, 0.0);
        assert_eq!(status.pressure_level, 0.0);
        assert!(status.launched);
    }

    #[test]
    fn action_to_event_stamps_pending() {
        let action = Action {
            kind: EventKind::Thrust,
            value: "42.0".to_string(),
        };
        let event = action.to_event(7, "alice");
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.mission_id, 7);
        assert_eq!(event.created_by, "alice");
        assert!(event.parent_id.is_none());
    }
}
