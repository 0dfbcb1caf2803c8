//! The state protected by a mission's single exclusive lock (§5): the
//! rocket's settings, its derived status, and the subscriber registry.
//! Bundling all three behind one lock is what makes broadcast-during-
//! iteration and read-modify-write-then-persist safe without additional
//! coordination.

use crate::subscriber::SubscriberRegistry;
use crate::types::{RocketSetting, RocketStatus};

pub struct MissionState {
    pub setting: RocketSetting,
    pub status: RocketStatus,
    pub subscribers: SubscriberRegistry,
}

impl MissionState {
    pub fn new(setting: RocketSetting, status: RocketStatus) -> Self {
        Self {
            setting,
            status,
            subscribers: SubscriberRegistry::new(),
        }
    }
}
