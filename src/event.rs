//! Ledger rows and the drafts they are built from
use super::status::MovementStatus;
use super::types::{EmptyRepoJobId, EventId, InventoryId, JobRef, PartyId, PortId, ShipmentId, TimeStamp};

/// One committed row of the movement history. Never updated by transitions.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct MovementEvent {
    #[n(0)]
    pub id: EventId,
    #[n(1)]
    pub inventory_id: InventoryId,
    #[n(2)]
    pub shipment_id: Option<ShipmentId>,
    #[n(3)]
    pub empty_repo_job_id: Option<EmptyRepoJobId>,
    #[n(4)]
    pub port_id: PortId,
    #[n(5)]
    pub party_id: Option<PartyId>,
    #[n(6)]
    pub status: MovementStatus,
    #[n(7)]
    pub remarks: Option<String>,
    #[n(8)]
    pub occurred_at: TimeStamp,
}

impl MovementEvent {
    pub fn job(&self) -> Option<JobRef> {
        JobRef::from_columns(self.shipment_id, self.empty_repo_job_id)
    }
}

/// A row waiting to be appended. `id` and `occurred_at` are filled in by the
/// ledger when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDraft {
    pub id: Option<EventId>,
    pub inventory_id: InventoryId,
    pub job: Option<JobRef>,
    pub port_id: PortId,
    pub party_id: Option<PartyId>,
    pub status: MovementStatus,
    pub remarks: Option<String>,
    pub occurred_at: Option<TimeStamp>,
}

impl MovementDraft {
    pub fn new(inventory_id: InventoryId, status: MovementStatus, port_id: PortId) -> Self {
        Self {
            id: None,
            inventory_id,
            job: None,
            port_id,
            party_id: None,
            status,
            remarks: None,
            occurred_at: None,
        }
    }
    pub fn with_job(mut self, job: JobRef) -> Self {
        self.job = Some(job);
        self
    }
    pub fn with_party(mut self, party_id: Option<PartyId>) -> Self {
        self.party_id = party_id;
        self
    }
    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }
    pub fn at(mut self, occurred_at: TimeStamp) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub(crate) fn into_event(self, id: EventId, occurred_at: TimeStamp) -> MovementEvent {
        MovementEvent {
            id,
            inventory_id: self.inventory_id,
            shipment_id: self.job.and_then(|job| job.shipment_id()),
            empty_repo_job_id: self.job.and_then(|job| job.empty_repo_job_id()),
            port_id: self.port_id,
            party_id: self.party_id,
            status: self.status,
            remarks: self.remarks,
            occurred_at,
        }
    }
}
