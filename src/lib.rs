pub mod catalog;
pub mod config;
pub mod context;
pub mod correction;
pub mod error;
pub mod event;
pub mod ledger;
pub mod placement;
pub mod service;
pub mod status;
pub mod types;

pub use error::{ErrorKind, MovementError};
pub use event::{MovementDraft, MovementEvent};
pub use ledger::MovementLedger;
pub use service::MovementService;
pub use status::MovementStatus;
