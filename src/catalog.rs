//! Read-only projections of the records that own movements, and a sled-backed
//! catalog the owning modules keep up to date.
use super::error::MovementError;
use super::types::{EmptyRepoJobId, InventoryId, JobRef, PartyId, PortId, ShipmentId};
use sled::{Batch, Db};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ShipmentRecord {
    #[n(0)]
    pub id: ShipmentId,
    #[n(1)]
    pub job_number: String,
    #[n(2)]
    pub pol_port_id: Option<PortId>,
    #[n(3)]
    pub pod_port_id: Option<PortId>,
    #[n(4)]
    pub carrier_address_book_id: Option<PartyId>,
    #[n(5)]
    pub empty_return_depot_address_book_id: Option<PartyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct EmptyRepoJobRecord {
    #[n(0)]
    pub id: EmptyRepoJobId,
    #[n(1)]
    pub job_number: String,
    #[n(2)]
    pub pol_port_id: Option<PortId>,
    #[n(3)]
    pub pod_port_id: Option<PortId>,
    #[n(4)]
    pub carrier_address_book_id: Option<PartyId>,
    #[n(5)]
    pub empty_return_depot_address_book_id: Option<PartyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct InventoryRecord {
    #[n(0)]
    pub id: InventoryId,
    #[n(1)]
    pub container_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct PortRecord {
    #[n(0)]
    pub id: PortId,
    #[n(1)]
    pub code: String,
    #[n(2)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct PartyRecord {
    #[n(0)]
    pub id: PartyId,
    #[n(1)]
    pub name: String,
}

/// What the movement core reads from the rest of the platform.
pub trait JobDirectory {
    fn shipment(&self, id: ShipmentId) -> Result<Option<ShipmentRecord>, MovementError>;
    fn shipment_by_job_number(&self, job_number: &str) -> Result<Option<ShipmentRecord>, MovementError>;
    fn empty_repo_job(&self, id: EmptyRepoJobId) -> Result<Option<EmptyRepoJobRecord>, MovementError>;
    fn empty_repo_job_by_job_number(
        &self,
        job_number: &str,
    ) -> Result<Option<EmptyRepoJobRecord>, MovementError>;
    fn inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, MovementError>;
    fn port(&self, id: PortId) -> Result<Option<PortRecord>, MovementError>;
    fn party(&self, id: PartyId) -> Result<Option<PartyRecord>, MovementError>;
}

const SHIPMENT: &[u8] = b"cat/shp/";
const SHIPMENT_NO: &[u8] = b"cat/shpno/";
const EMPTY_REPO_JOB: &[u8] = b"cat/erj/";
const EMPTY_REPO_JOB_NO: &[u8] = b"cat/erjno/";
const CONTAINER: &[u8] = b"cat/ctr/";
const PORT: &[u8] = b"cat/port/";
const PARTY: &[u8] = b"cat/party/";

fn id_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn number_key(prefix: &[u8], job_number: &str) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(job_number.trim().as_bytes());
    key
}

pub struct JobCatalog {
    instance: Arc<Db>,
}

impl JobCatalog {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    fn read<T>(&self, key: Vec<u8>) -> Result<Option<T>, MovementError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.instance.get(key)? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn id_for_number(&self, prefix: &[u8], job_number: &str) -> Result<Option<u64>, MovementError> {
        match self.instance.get(number_key(prefix, job_number))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes[..].try_into().map_err(|_| {
                    MovementError::Corrupt(format!("job number index for '{job_number}'"))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    // Writes a job record and its job number key in one batch, dropping the key
    // of a previous job number.
    fn put_job(
        &self,
        (record_prefix, number_prefix): (&[u8], &[u8]),
        id: u64,
        job_number: &str,
        previous_number: Option<String>,
        encoded: Vec<u8>,
    ) -> Result<(), MovementError> {
        if let Some(owner) = self.id_for_number(number_prefix, job_number)? {
            if owner != id {
                return Err(MovementError::DuplicateJobNumber {
                    job_number: job_number.to_string(),
                });
            }
        }

        let mut batch = Batch::default();
        if let Some(previous) = previous_number {
            if previous.trim() != job_number.trim() {
                batch.remove(number_key(number_prefix, &previous));
            }
        }
        batch.insert(id_key(record_prefix, id), encoded);
        batch.insert(number_key(number_prefix, job_number), id.to_be_bytes().to_vec());
        self.instance.apply_batch(batch)?;
        Ok(())
    }

    pub fn put_shipment(&self, record: &ShipmentRecord) -> Result<(), MovementError> {
        let previous = self.shipment(record.id)?.map(|old| old.job_number);
        self.put_job(
            (SHIPMENT, SHIPMENT_NO),
            record.id.get(),
            &record.job_number,
            previous,
            minicbor::to_vec(record)?,
        )?;
        debug!(shipment_id = %record.id, job_number = %record.job_number, "shipment stored");
        Ok(())
    }

    pub fn put_empty_repo_job(&self, record: &EmptyRepoJobRecord) -> Result<(), MovementError> {
        let previous = self.empty_repo_job(record.id)?.map(|old| old.job_number);
        self.put_job(
            (EMPTY_REPO_JOB, EMPTY_REPO_JOB_NO),
            record.id.get(),
            &record.job_number,
            previous,
            minicbor::to_vec(record)?,
        )?;
        debug!(empty_repo_job_id = %record.id, job_number = %record.job_number, "empty repo job stored");
        Ok(())
    }

    pub fn put_inventory(&self, record: &InventoryRecord) -> Result<(), MovementError> {
        self.instance
            .insert(id_key(CONTAINER, record.id.get()), minicbor::to_vec(record)?)?;
        Ok(())
    }

    pub fn put_port(&self, record: &PortRecord) -> Result<(), MovementError> {
        self.instance
            .insert(id_key(PORT, record.id.get()), minicbor::to_vec(record)?)?;
        Ok(())
    }

    pub fn put_party(&self, record: &PartyRecord) -> Result<(), MovementError> {
        self.instance
            .insert(id_key(PARTY, record.id.get()), minicbor::to_vec(record)?)?;
        Ok(())
    }

    /// The keys that removing `job` deletes: its record and its job number.
    /// `None` when the job does not exist.
    pub(crate) fn job_keys(&self, job: JobRef) -> Result<Option<Vec<Vec<u8>>>, MovementError> {
        let keys = match job {
            JobRef::Shipment(id) => self.shipment(id)?.map(|record| {
                vec![
                    id_key(SHIPMENT, id.get()),
                    number_key(SHIPMENT_NO, &record.job_number),
                ]
            }),
            JobRef::EmptyRepoJob(id) => self.empty_repo_job(id)?.map(|record| {
                vec![
                    id_key(EMPTY_REPO_JOB, id.get()),
                    number_key(EMPTY_REPO_JOB_NO, &record.job_number),
                ]
            }),
        };
        Ok(keys)
    }

    fn remove_keys(&self, keys: Vec<Vec<u8>>) -> Result<(), MovementError> {
        let mut batch = Batch::default();
        for key in keys {
            batch.remove(key);
        }
        self.instance.apply_batch(batch)?;
        Ok(())
    }

    /// Removes the record only; movements are left alone. Returns the removed
    /// record, if there was one.
    pub fn remove_shipment(&self, id: ShipmentId) -> Result<Option<ShipmentRecord>, MovementError> {
        let record = self.shipment(id)?;
        if let Some(keys) = self.job_keys(JobRef::Shipment(id))? {
            self.remove_keys(keys)?;
        }
        Ok(record)
    }

    pub fn remove_empty_repo_job(
        &self,
        id: EmptyRepoJobId,
    ) -> Result<Option<EmptyRepoJobRecord>, MovementError> {
        let record = self.empty_repo_job(id)?;
        if let Some(keys) = self.job_keys(JobRef::EmptyRepoJob(id))? {
            self.remove_keys(keys)?;
        }
        Ok(record)
    }
}

impl JobDirectory for JobCatalog {
    fn shipment(&self, id: ShipmentId) -> Result<Option<ShipmentRecord>, MovementError> {
        self.read(id_key(SHIPMENT, id.get()))
    }

    fn shipment_by_job_number(&self, job_number: &str) -> Result<Option<ShipmentRecord>, MovementError> {
        match self.id_for_number(SHIPMENT_NO, job_number)? {
            Some(id) => self.shipment(ShipmentId(id)),
            None => Ok(None),
        }
    }

    fn empty_repo_job(&self, id: EmptyRepoJobId) -> Result<Option<EmptyRepoJobRecord>, MovementError> {
        self.read(id_key(EMPTY_REPO_JOB, id.get()))
    }

    fn empty_repo_job_by_job_number(
        &self,
        job_number: &str,
    ) -> Result<Option<EmptyRepoJobRecord>, MovementError> {
        match self.id_for_number(EMPTY_REPO_JOB_NO, job_number)? {
            Some(id) => self.empty_repo_job(EmptyRepoJobId(id)),
            None => Ok(None),
        }
    }

    fn inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>, MovementError> {
        self.read(id_key(CONTAINER, id.get()))
    }

    fn port(&self, id: PortId) -> Result<Option<PortRecord>, MovementError> {
        self.read(id_key(PORT, id.get()))
    }

    fn party(&self, id: PartyId) -> Result<Option<PartyRecord>, MovementError> {
        self.read(id_key(PARTY, id.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn shipment(id: u64, job_number: &str) -> ShipmentRecord {
        ShipmentRecord {
            id: ShipmentId(id),
            job_number: job_number.into(),
            pol_port_id: Some(PortId(1)),
            pod_port_id: Some(PortId(2)),
            carrier_address_book_id: Some(PartyId(9)),
            empty_return_depot_address_book_id: Some(PartyId(42)),
        }
    }

    #[test]
    fn renumbering_a_shipment_drops_the_old_job_number() {
        let dir = tempdir().unwrap();
        let db = Arc::new(sled::open(dir.path().join("catalog.db")).unwrap());
        let catalog = JobCatalog::new(db);

        catalog.put_shipment(&shipment(100, "SHP-0001")).unwrap();
        catalog.put_shipment(&shipment(100, "SHP-0002")).unwrap();

        assert_eq!(catalog.shipment_by_job_number("SHP-0001").unwrap(), None);
        assert_eq!(
            catalog.shipment_by_job_number("SHP-0002").unwrap().map(|s| s.id),
            Some(ShipmentId(100))
        );
    }

    #[test]
    fn job_numbers_are_unique_per_kind() {
        let dir = tempdir().unwrap();
        let db = Arc::new(sled::open(dir.path().join("catalog.db")).unwrap());
        let catalog = JobCatalog::new(db);

        catalog.put_shipment(&shipment(100, "SHP-0001")).unwrap();
        let err = catalog.put_shipment(&shipment(101, "SHP-0001")).unwrap_err();
        assert!(matches!(err, MovementError::DuplicateJobNumber { .. }));
    }
}
