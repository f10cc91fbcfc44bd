//! Operator corrections.
//!
//! This is the only path that rewrites an existing ledger row. Transitions never
//! come through here; they append through [`MovementLedger::append_guarded`].
use super::error::MovementError;
use super::event::MovementEvent;
use super::ledger::{MovementLedger, event_key, index_key};
use super::status::MovementStatus;
use super::types::{EventId, JobRef, PartyId, PortId, TimeStamp};
use sled::Batch;
use tracing::info;

/// Fields an operator may patch. `None` leaves a field untouched; the nested
/// options on `party_id` and `remarks` can clear a value. `job: Some(None)` is
/// only accepted for an event that has no job yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementCorrection {
    pub port_id: Option<PortId>,
    pub party_id: Option<Option<PartyId>>,
    pub status: Option<MovementStatus>,
    pub remarks: Option<Option<String>>,
    pub job: Option<Option<JobRef>>,
    pub occurred_at: Option<TimeStamp>,
}

impl MovementCorrection {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, mut event: MovementEvent) -> MovementEvent {
        if let Some(port_id) = self.port_id {
            event.port_id = port_id;
        }
        if let Some(party_id) = self.party_id {
            event.party_id = party_id;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(remarks) = &self.remarks {
            event.remarks = remarks.clone();
        }
        if let Some(job) = self.job {
            event.shipment_id = job.and_then(|job| job.shipment_id());
            event.empty_repo_job_id = job.and_then(|job| job.empty_repo_job_id());
        }
        if let Some(occurred_at) = self.occurred_at {
            event.occurred_at = occurred_at;
        }
        event
    }
}

impl MovementLedger {
    /// Rewrite event `id` in place. The index entry is re-keyed in the same
    /// batch when the timestamp moves.
    pub fn correct(
        &self,
        id: EventId,
        correction: &MovementCorrection,
    ) -> Result<MovementEvent, MovementError> {
        let _guard = self.lock();

        let before = self.get(id)?.ok_or(MovementError::EventNotFound(id))?;
        // an allotted container's events keep exactly one job; a correction may
        // move an event to another job but not detach it
        if correction.job == Some(None) && before.job().is_some() {
            return Err(MovementError::MissingJobReference);
        }
        let after = correction.apply_to(before.clone());
        if after == before {
            return Ok(after);
        }

        let mut batch = Batch::default();
        batch.remove(index_key(&before));
        batch.insert(index_key(&after), Vec::<u8>::new());
        batch.insert(event_key(id), minicbor::to_vec(&after)?);
        self.db().apply_batch(batch)?;

        info!(
            event_id = %id,
            inventory_id = %after.inventory_id,
            status = %after.status,
            "movement corrected in place"
        );
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MovementDraft;
    use crate::types::{InventoryId, ShipmentId};

    #[test]
    fn empty_correction_changes_nothing() {
        let event = MovementDraft::new(InventoryId(1), MovementStatus::GateIn, PortId(3))
            .with_job(JobRef::Shipment(ShipmentId(8)))
            .into_event(EventId(5), TimeStamp::from_nanos(100));

        let correction = MovementCorrection::default();
        assert!(correction.is_empty());
        assert_eq!(correction.apply_to(event.clone()), event);
    }

    #[test]
    fn nested_options_clear_fields() {
        let event = MovementDraft::new(InventoryId(1), MovementStatus::Sob, PortId(3))
            .with_party(Some(PartyId(9)))
            .with_remarks(Some("vessel delayed".into()))
            .into_event(EventId(5), TimeStamp::from_nanos(100));

        let correction = MovementCorrection {
            party_id: Some(None),
            remarks: Some(None),
            port_id: Some(PortId(4)),
            ..Default::default()
        };
        let corrected = correction.apply_to(event);

        assert_eq!(corrected.party_id, None);
        assert_eq!(corrected.remarks, None);
        assert_eq!(corrected.port_id, PortId(4));
        assert_eq!(corrected.status, MovementStatus::Sob);
    }
}
