//! Diagnostic subsystem (§4.8): stub surface triggered edge-triggered from
//! the physics ticker on a threshold crossing. Records a snapshot tied to
//! the mission; content beyond that snapshot is left to the `Store`
//! contract's extension point, as the specification leaves it.

use super::runtime::MissionRuntime;
use crate::store::Diagnostic;
use crate::types::RocketStatus;
use std::sync::Arc;
use tracing::warn;

pub async fn trigger(runtime: &Arc<MissionRuntime>, status: RocketStatus) {
    let diagnostic = Diagnostic {
        id: 0,
        mission_id: runtime.mission_id,
        description: describe(&status),
        hull_level: status.hull_level,
        fuel_level: status.fuel_level,
        oxygen_level: status.oxygen_level,
        temperature_level: status.temperature_level,
        pressure_level: status.pressure_level,
        created_at: chrono::Utc::now(),
    };

    if let Err(err) = runtime.store().add_diagnostic(diagnostic).await {
        warn!(mission_id = runtime.mission_id, %err, "failed to record diagnostic");
    }
}

fn describe(status: &RocketStatus) -> String {
    let mut flags = Vec::new();
    if status.hull_level < 20.0 {
        flags.push("hull critical");
    }
    if status.fuel_level < 10.0 {
        flags.push("fuel low");
    }
    if status.oxygen_level < 10.0 {
        flags.push("oxygen low");
    }
    if status.pressure_level < 15.0 {
        flags.push("pressure low");
    }
    if status.pressure_level > 95.0 {
        flags.push("pressure high");
    }
    if status.temperature_level > 90.0 {
        flags.push("temperature high");
    }
    if flags.is_empty() {
        "threshold crossing".to_string()
    } else {
        flags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_reports_every_flagged_threshold() {
        let status = RocketStatus {
            launched: true,
            hull_level: 15.0,
            fuel_level: 50.0,
            oxygen_level: 50.0,
            temperature_level: 20.0,
            pressure_level: 50.0,
        };
        assert_eq!(describe(&status), "hull critical");
    }
}
