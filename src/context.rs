//! Job context: the routing fields of the shipment or empty repo job that owns
//! a movement.
use super::catalog::{EmptyRepoJobRecord, JobDirectory, ShipmentRecord};
use super::error::MovementError;
use super::types::{EmptyRepoJobId, JobRef, PartyId, PortId, ShipmentId};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobContext {
    pub load_port_id: Option<PortId>,
    pub discharge_port_id: Option<PortId>,
    pub carrier_party_id: Option<PartyId>,
    pub empty_return_party_id: Option<PartyId>,
}

impl From<&ShipmentRecord> for JobContext {
    fn from(record: &ShipmentRecord) -> Self {
        Self {
            load_port_id: record.pol_port_id,
            discharge_port_id: record.pod_port_id,
            carrier_party_id: record.carrier_address_book_id,
            empty_return_party_id: record.empty_return_depot_address_book_id,
        }
    }
}

impl From<&EmptyRepoJobRecord> for JobContext {
    fn from(record: &EmptyRepoJobRecord) -> Self {
        Self {
            load_port_id: record.pol_port_id,
            discharge_port_id: record.pod_port_id,
            carrier_party_id: record.carrier_address_book_id,
            empty_return_party_id: record.empty_return_depot_address_book_id,
        }
    }
}

/// A job together with the context projected from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedJob {
    pub job: JobRef,
    pub context: JobContext,
}

/// Projects job context out of a [`JobDirectory`]. Never writes.
pub struct ContextResolver<'a, D: JobDirectory + ?Sized> {
    directory: &'a D,
}

impl<'a, D: JobDirectory + ?Sized> ContextResolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Resolve from an event's job columns. Exactly one must be set.
    pub fn resolve(
        &self,
        shipment_id: Option<ShipmentId>,
        empty_repo_job_id: Option<EmptyRepoJobId>,
    ) -> Result<JobContext, MovementError> {
        match (shipment_id, empty_repo_job_id) {
            (Some(_), Some(_)) => Err(MovementError::AmbiguousJobReference),
            (None, None) => Err(MovementError::MissingJobReference),
            (Some(id), None) => self.resolve_job(JobRef::Shipment(id)).map(|r| r.context),
            (None, Some(id)) => self.resolve_job(JobRef::EmptyRepoJob(id)).map(|r| r.context),
        }
    }

    pub fn resolve_job(&self, job: JobRef) -> Result<ResolvedJob, MovementError> {
        let context = match job {
            JobRef::Shipment(id) => self
                .directory
                .shipment(id)?
                .map(|record| JobContext::from(&record))
                .ok_or(MovementError::ShipmentNotFound(id))?,
            JobRef::EmptyRepoJob(id) => self
                .directory
                .empty_repo_job(id)?
                .map(|record| JobContext::from(&record))
                .ok_or(MovementError::EmptyRepoJobNotFound(id))?,
        };
        debug!(%job, ?context, "resolved job context");
        Ok(ResolvedJob { job, context })
    }

    /// Look a job number up as a shipment first, then as an empty repo job.
    /// `None` when neither exists.
    pub fn resolve_job_number(&self, job_number: &str) -> Result<Option<ResolvedJob>, MovementError> {
        if let Some(record) = self.directory.shipment_by_job_number(job_number)? {
            return Ok(Some(ResolvedJob {
                job: JobRef::Shipment(record.id),
                context: JobContext::from(&record),
            }));
        }
        if let Some(record) = self.directory.empty_repo_job_by_job_number(job_number)? {
            return Ok(Some(ResolvedJob {
                job: JobRef::EmptyRepoJob(record.id),
                context: JobContext::from(&record),
            }));
        }
        debug!(job_number, "job number matched no shipment or empty repo job");
        Ok(None)
    }
}
