use crate::store::StoreError;
use thiserror::Error;

/// Domain errors surfaced at the mission-registry boundary (§7: "Domain").
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("user already joined this mission")]
    AlreadyJoined,
    #[error("user is not a member of this mission")]
    NotAMember,
    #[error("mission not found")]
    MissionNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}
