use super::types::{EmptyRepoJobId, EventId, InventoryId, ShipmentId};

/// Coarse classification, for callers that map failures onto a transport
/// (404 / 422 / 409 / 500).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Storage,
}

#[derive(thiserror::Error, Debug)]
pub enum MovementError {
    #[error("movement event {0} not found")]
    EventNotFound(EventId),
    #[error("container {0} not found")]
    InventoryNotFound(InventoryId),
    #[error("shipment {0} not found")]
    ShipmentNotFound(ShipmentId),
    #[error("empty repo job {0} not found")]
    EmptyRepoJobNotFound(EmptyRepoJobId),
    #[error("no shipment or empty repo job with job number '{job_number}'")]
    JobNotFound { job_number: String },
    #[error("container {inventory_id} has no movement history; it must be allotted first")]
    NoPriorEvent { inventory_id: InventoryId },
    #[error("unrecognised movement status '{status}'")]
    UnknownStatus { status: String },
    #[error("status {status} for container {inventory_id} resolves to no port")]
    MissingPort {
        status: String,
        inventory_id: InventoryId,
    },
    #[error("status {status} for container {inventory_id} needs a shipment or empty repo job")]
    ContextRequired {
        status: String,
        inventory_id: InventoryId,
    },
    #[error("both a shipment and an empty repo job were given; expected exactly one")]
    AmbiguousJobReference,
    #[error("neither a shipment nor an empty repo job was given")]
    MissingJobReference,
    #[error("movement event {0} already exists")]
    DuplicateEvent(EventId),
    #[error(
        "container {inventory_id} moved on: expected latest event {expected}, found {found:?}"
    )]
    StalePredecessor {
        inventory_id: InventoryId,
        expected: EventId,
        found: Option<EventId>,
    },
    #[error("job number '{job_number}' is already taken")]
    DuplicateJobNumber { job_number: String },
    #[error("request names no containers")]
    EmptyRequest,
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

impl MovementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MovementError::EventNotFound(_)
            | MovementError::InventoryNotFound(_)
            | MovementError::ShipmentNotFound(_)
            | MovementError::EmptyRepoJobNotFound(_)
            | MovementError::JobNotFound { .. }
            | MovementError::NoPriorEvent { .. } => ErrorKind::NotFound,
            MovementError::UnknownStatus { .. }
            | MovementError::MissingPort { .. }
            | MovementError::ContextRequired { .. }
            | MovementError::AmbiguousJobReference
            | MovementError::MissingJobReference
            | MovementError::EmptyRequest => ErrorKind::Validation,
            MovementError::DuplicateEvent(_)
            | MovementError::DuplicateJobNumber { .. }
            | MovementError::StalePredecessor { .. } => ErrorKind::Conflict,
            MovementError::Storage(_)
            | MovementError::Encode(_)
            | MovementError::Corrupt(_)
            | MovementError::Decode(_) => ErrorKind::Storage,
        }
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for MovementError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        MovementError::Encode(value.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to open movement store: {0}")]
    Open(#[from] sled::Error),
}
