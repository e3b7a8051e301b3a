use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("no active semester; create or activate one first")]
    NoActiveSemester,

    #[error("validation failed: {0}")]
    Validation(String),
}
