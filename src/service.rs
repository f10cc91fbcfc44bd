//! Service layer API for container movement operations
use super::catalog::{JobCatalog, JobDirectory};
use super::context::{ContextResolver, ResolvedJob};
use super::correction::MovementCorrection;
use super::error::MovementError;
use super::event::{MovementDraft, MovementEvent};
use super::ledger::MovementLedger;
use super::placement::{self, PlacementOverride};
use super::status::MovementStatus;
use super::types::{EmptyRepoJobId, EventId, InventoryId, JobRef, PartyId, PortId, ShipmentId, TimeStamp};
use sled::Db;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid7::uuid7;

/// A status change for one container.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub inventory_id: InventoryId,
    pub status: String,
    pub job_number: Option<String>,
    pub overrides: PlacementOverride,
    pub remarks: Option<String>,
    /// Reject the change unless this is still the container's latest event.
    pub expected_predecessor: Option<EventId>,
}

/// `bulk-create-status`: every container goes through the single-item path,
/// overrides included.
#[derive(Debug, Clone, Default)]
pub struct BulkCreateStatus {
    pub ids: Vec<InventoryId>,
    pub new_status: String,
    pub job_number: String,
    pub port_id: Option<PortId>,
    pub party_id: Option<PartyId>,
    pub remarks: Option<String>,
}

/// `bulk-update-status`: one job action over many containers. No overrides.
#[derive(Debug, Clone, Default)]
pub struct BulkUpdateStatus {
    pub ids: Vec<InventoryId>,
    pub new_status: String,
    pub job_number: String,
    pub remarks: Option<String>,
    pub expected_predecessors: Vec<(InventoryId, EventId)>,
}

/// Port and party an allotted container starts from, taken from its active
/// leasing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasingPosition {
    pub port_id: PortId,
    pub party_id: Option<PartyId>,
}

/// An event joined with the names an operator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementView {
    pub event: MovementEvent,
    pub container_number: Option<String>,
    pub port_name: Option<String>,
    pub party_name: Option<String>,
}

// Everything a transition call needs besides the container ids.
struct Transition<'r> {
    operation: &'static str,
    status: &'r str,
    job_number: Option<&'r str>,
    overrides: PlacementOverride,
    remarks: Option<String>,
    expected_predecessors: &'r [(InventoryId, EventId)],
}

pub struct MovementService<D: JobDirectory = JobCatalog> {
    ledger: MovementLedger,
    directory: D,
}

impl MovementService<JobCatalog> {
    /// Ledger and catalog on the same sled instance.
    pub fn new(instance: Arc<Db>) -> Self {
        Self {
            ledger: MovementLedger::new(instance.clone()),
            directory: JobCatalog::new(instance),
        }
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.directory
    }

    /// Delete a shipment and, explicitly, every movement that belongs to it.
    /// Record and movements go in one batch.
    pub fn remove_shipment(&self, id: ShipmentId) -> Result<usize, MovementError> {
        let keys = self
            .directory
            .job_keys(JobRef::Shipment(id))?
            .ok_or(MovementError::ShipmentNotFound(id))?;
        self.ledger.delete_by_job(JobRef::Shipment(id), &keys)
    }

    /// Delete an empty repo job and every movement that belongs to it.
    pub fn remove_empty_repo_job(&self, id: EmptyRepoJobId) -> Result<usize, MovementError> {
        let keys = self
            .directory
            .job_keys(JobRef::EmptyRepoJob(id))?
            .ok_or(MovementError::EmptyRepoJobNotFound(id))?;
        self.ledger.delete_by_job(JobRef::EmptyRepoJob(id), &keys)
    }
}

impl<D: JobDirectory> MovementService<D> {
    pub fn with_directory(ledger: MovementLedger, directory: D) -> Self {
        Self { ledger, directory }
    }

    pub fn ledger(&self) -> &MovementLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    fn resolver(&self) -> ContextResolver<'_, D> {
        ContextResolver::new(&self.directory)
    }

    /// First event of a container on a job: ALLOTTED, placed where the leasing
    /// record says the container is.
    pub fn record_allotment(
        &self,
        inventory_id: InventoryId,
        job: JobRef,
        leasing: LeasingPosition,
        remarks: Option<String>,
    ) -> Result<MovementEvent, MovementError> {
        self.directory
            .inventory(inventory_id)?
            .ok_or(MovementError::InventoryNotFound(inventory_id))?;
        self.resolver().resolve_job(job)?;

        let occurred_at = not_before(TimeStamp::new(), self.ledger.latest_for(inventory_id)?.as_ref());
        let draft = MovementDraft::new(inventory_id, MovementStatus::Allotted, leasing.port_id)
            .with_job(job)
            .with_party(leasing.party_id)
            .with_remarks(remarks)
            .at(occurred_at);

        let event = self.ledger.append(draft)?;
        info!(%inventory_id, %job, event_id = %event.id, "container allotted");
        Ok(event)
    }

    /// Apply one status change to one container.
    pub fn apply_single_status(&self, change: StatusChange) -> Result<MovementEvent, MovementError> {
        let expected: Vec<_> = change
            .expected_predecessor
            .map(|id| (change.inventory_id, id))
            .into_iter()
            .collect();

        let mut events = self.transition(
            &[change.inventory_id],
            Transition {
                operation: "single_status",
                status: &change.status,
                job_number: change.job_number.as_deref(),
                overrides: change.overrides,
                remarks: change.remarks,
                expected_predecessors: &expected,
            },
        )?;
        events.pop().ok_or(MovementError::EmptyRequest)
    }

    /// One job action over many containers, all or nothing.
    pub fn apply_bulk_status(
        &self,
        ids: &[InventoryId],
        status: &str,
        job_number: &str,
        remarks: Option<String>,
    ) -> Result<Vec<MovementEvent>, MovementError> {
        self.transition(
            ids,
            Transition {
                operation: "bulk_update_status",
                status,
                job_number: Some(job_number),
                overrides: PlacementOverride::none(),
                remarks,
                expected_predecessors: &[],
            },
        )
    }

    pub fn bulk_update_status(&self, request: BulkUpdateStatus) -> Result<Vec<MovementEvent>, MovementError> {
        self.transition(
            &request.ids,
            Transition {
                operation: "bulk_update_status",
                status: &request.new_status,
                job_number: Some(request.job_number.as_str()),
                overrides: PlacementOverride::none(),
                remarks: request.remarks,
                expected_predecessors: &request.expected_predecessors,
            },
        )
    }

    pub fn bulk_create_status(&self, request: BulkCreateStatus) -> Result<Vec<MovementEvent>, MovementError> {
        self.transition(
            &request.ids,
            Transition {
                operation: "bulk_create_status",
                status: &request.new_status,
                job_number: Some(request.job_number.as_str()),
                overrides: PlacementOverride {
                    port_id: request.port_id,
                    party_id: request.party_id,
                },
                remarks: request.remarks,
                expected_predecessors: &[],
            },
        )
    }

    // Shared by the single and bulk paths: resolve the job once, plan every
    // container against its latest event, then commit the whole set in one batch.
    fn transition(
        &self,
        ids: &[InventoryId],
        transition: Transition<'_>,
    ) -> Result<Vec<MovementEvent>, MovementError> {
        let span = info_span!(
            "transition",
            operation = transition.operation,
            batch = %uuid7(),
            status = transition.status,
            job_number = transition.job_number.unwrap_or_default(),
        );
        let _enter = span.enter();

        let result = self.plan_and_commit(ids, &transition);
        match &result {
            Ok(events) => info!(count = events.len(), "movements recorded"),
            Err(e) => warn!(error = %e, "transition rejected, nothing recorded"),
        }
        result
    }

    fn plan_and_commit(
        &self,
        ids: &[InventoryId],
        transition: &Transition<'_>,
    ) -> Result<Vec<MovementEvent>, MovementError> {
        if ids.is_empty() {
            return Err(MovementError::EmptyRequest);
        }
        let status: MovementStatus = transition.status.parse()?;

        let job_number = transition
            .job_number
            .map(str::trim)
            .filter(|number| !number.is_empty());
        let resolved = match job_number {
            Some(number) => match self.resolver().resolve_job_number(number)? {
                Some(resolved) => Some(resolved),
                None if status.requires_context() => {
                    return Err(MovementError::JobNotFound {
                        job_number: number.to_string(),
                    });
                }
                None => None,
            },
            None => None,
        };

        let now = TimeStamp::new();
        let drafts = ids
            .iter()
            .map(|inventory_id| {
                self.plan(
                    *inventory_id,
                    status,
                    resolved.as_ref(),
                    transition.overrides,
                    transition.remarks.clone(),
                    now,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.ledger
            .append_guarded(drafts, transition.expected_predecessors)
    }

    // The per-container step: latest event, placement, draft.
    fn plan(
        &self,
        inventory_id: InventoryId,
        status: MovementStatus,
        resolved: Option<&ResolvedJob>,
        overrides: PlacementOverride,
        remarks: Option<String>,
        now: TimeStamp,
    ) -> Result<MovementDraft, MovementError> {
        let previous = self
            .ledger
            .latest_for(inventory_id)?
            .ok_or(MovementError::NoPriorEvent { inventory_id })?;

        // without a job number, milestones fall back to the job the container is on
        let context = match (resolved, previous.job()) {
            (Some(resolved), _) => Some(resolved.context),
            (None, Some(job)) if status.requires_context() => {
                Some(self.resolver().resolve_job(job)?.context)
            }
            (None, _) => None,
        };

        let placement = placement::derive(status, &previous, context.as_ref(), overrides)?;

        let mut draft = MovementDraft::new(inventory_id, status, placement.port_id)
            .with_party(placement.party_id)
            .with_remarks(remarks)
            .at(not_before(now, Some(&previous)));
        if let Some(job) = previous.job().or(resolved.map(|resolved| resolved.job)) {
            draft = draft.with_job(job);
        }
        Ok(draft)
    }

    /// Operator correction of a stored event. Not a transition: the row is
    /// rewritten, nothing is appended.
    pub fn correct_movement(
        &self,
        id: EventId,
        correction: MovementCorrection,
    ) -> Result<MovementEvent, MovementError> {
        if let Some(Some(job)) = correction.job {
            self.resolver().resolve_job(job)?;
        }
        self.ledger.correct(id, &correction)
    }

    pub fn get_movement(&self, id: EventId) -> Result<MovementView, MovementError> {
        let event = self.ledger.get(id)?.ok_or(MovementError::EventNotFound(id))?;
        self.view(event)
    }

    /// The full ledger, newest first.
    pub fn list_movements(&self) -> Result<Vec<MovementView>, MovementError> {
        self.views(self.ledger.all()?)
    }

    /// Current position of every container.
    pub fn list_latest_movements(&self) -> Result<Vec<MovementView>, MovementError> {
        self.views(self.ledger.latest_per_container()?)
    }

    pub fn list_movements_except_available(&self) -> Result<Vec<MovementView>, MovementError> {
        self.views(self.ledger.excluding_status(MovementStatus::Available)?)
    }

    pub fn container_history(&self, inventory_id: InventoryId) -> Result<Vec<MovementView>, MovementError> {
        self.views(self.ledger.history(inventory_id)?)
    }

    fn views(&self, events: Vec<MovementEvent>) -> Result<Vec<MovementView>, MovementError> {
        events.into_iter().map(|event| self.view(event)).collect()
    }

    fn view(&self, event: MovementEvent) -> Result<MovementView, MovementError> {
        let container_number = self
            .directory
            .inventory(event.inventory_id)?
            .map(|record| record.container_number);
        let port_name = self.directory.port(event.port_id)?.map(|record| record.name);
        let party_name = match event.party_id {
            Some(party_id) => self.directory.party(party_id)?.map(|record| record.name),
            None => None,
        };
        Ok(MovementView {
            event,
            container_number,
            port_name,
            party_name,
        })
    }
}

// A new event always sorts after the one it follows. Its id may be smaller
// than the predecessor's (ids can be supplied), so an equal timestamp is not
// enough to win the (occurred_at, id) tie-break.
fn not_before(now: TimeStamp, previous: Option<&MovementEvent>) -> TimeStamp {
    match previous {
        Some(previous) if previous.occurred_at >= now => previous.occurred_at.next_tick(),
        _ => now,
    }
}
