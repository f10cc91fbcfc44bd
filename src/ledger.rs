//! Append-only movement ledger on top of sled
//!
//! Two keyspaces share the default tree:
//!
//! ```text
//! mv/evt/<event id>                              -> cbor MovementEvent
//! mv/inv/<inventory id><occurred_at><event id>   -> (empty)
//! ```
//!
//! All integers are big-endian, so the index sorts by container, then time, then
//! id. The latest event of a container is the last key under its prefix; nothing
//! else records "current location".
use super::error::MovementError;
use super::event::{MovementDraft, MovementEvent};
use super::status::MovementStatus;
use super::types::{EmptyRepoJobId, EventId, InventoryId, JobRef, ShipmentId, TimeStamp};
use sled::{Batch, Db};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub(crate) const EVENT_PREFIX: &[u8] = b"mv/evt/";
pub(crate) const INDEX_PREFIX: &[u8] = b"mv/inv/";

pub(crate) fn event_key(id: EventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(EVENT_PREFIX.len() + 8);
    key.extend_from_slice(EVENT_PREFIX);
    key.extend_from_slice(&id.get().to_be_bytes());
    key
}

fn inventory_prefix(inventory_id: InventoryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(INDEX_PREFIX.len() + 24);
    key.extend_from_slice(INDEX_PREFIX);
    key.extend_from_slice(&inventory_id.get().to_be_bytes());
    key
}

pub(crate) fn index_key(event: &MovementEvent) -> Vec<u8> {
    let mut key = inventory_prefix(event.inventory_id);
    key.extend_from_slice(&event.occurred_at.sort_key().to_be_bytes());
    key.extend_from_slice(&event.id.get().to_be_bytes());
    key
}

// (inventory id, event id) from an index key
fn parse_index_key(key: &[u8]) -> Option<(InventoryId, EventId)> {
    let rest = key.strip_prefix(INDEX_PREFIX)?;
    if rest.len() != 24 {
        return None;
    }
    let inventory = u64::from_be_bytes(rest[0..8].try_into().ok()?);
    let event = u64::from_be_bytes(rest[16..24].try_into().ok()?);
    Some((InventoryId(inventory), EventId(event)))
}

pub(crate) fn decode_event(bytes: &[u8]) -> Result<MovementEvent, MovementError> {
    Ok(minicbor::decode(bytes)?)
}

fn newest_first(events: &mut [MovementEvent]) {
    events.sort_by(|a, b| (b.occurred_at, b.id).cmp(&(a.occurred_at, a.id)));
}

pub struct MovementLedger {
    instance: Arc<Db>,
    // serializes check-then-apply within this process; sled's file lock keeps
    // other processes out
    commit_lock: Mutex<()>,
}

impl MovementLedger {
    pub fn new(instance: Arc<Db>) -> Self {
        Self {
            instance,
            commit_lock: Mutex::new(()),
        }
    }

    pub(crate) fn db(&self) -> &Db {
        &self.instance
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.commit_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a single draft.
    pub fn append(&self, draft: MovementDraft) -> Result<MovementEvent, MovementError> {
        let mut events = self.append_all(vec![draft])?;
        events.pop().ok_or(MovementError::EmptyRequest)
    }

    /// Append drafts as one atomic unit. Ids are assigned in input order.
    pub fn append_all(&self, drafts: Vec<MovementDraft>) -> Result<Vec<MovementEvent>, MovementError> {
        self.append_guarded(drafts, &[])
    }

    /// Like [`append_all`](Self::append_all), but first checks that each
    /// `(container, event)` pair still names the container's latest event. A
    /// mismatch rejects the whole unit with `StalePredecessor`.
    pub fn append_guarded(
        &self,
        drafts: Vec<MovementDraft>,
        expected_predecessors: &[(InventoryId, EventId)],
    ) -> Result<Vec<MovementEvent>, MovementError> {
        if drafts.is_empty() {
            return Err(MovementError::EmptyRequest);
        }

        let _guard = self.lock();

        for (inventory_id, expected) in expected_predecessors {
            let found = self.latest_for(*inventory_id)?.map(|event| event.id);
            if found != Some(*expected) {
                warn!(%inventory_id, %expected, ?found, "predecessor check failed");
                return Err(MovementError::StalePredecessor {
                    inventory_id: *inventory_id,
                    expected: *expected,
                    found,
                });
            }
        }

        let now = TimeStamp::new();
        let mut claimed = HashSet::new();
        let mut events = Vec::with_capacity(drafts.len());
        let mut batch = Batch::default();

        for draft in drafts {
            let id = match draft.id {
                Some(id) => {
                    if !claimed.insert(id) || self.instance.contains_key(event_key(id))? {
                        return Err(MovementError::DuplicateEvent(id));
                    }
                    id
                }
                None => loop {
                    // generated ids never collide with each other, but may with
                    // an explicitly supplied one
                    let id = EventId(self.instance.generate_id()?);
                    if claimed.insert(id) && !self.instance.contains_key(event_key(id))? {
                        break id;
                    }
                },
            };
            let occurred_at = draft.occurred_at.unwrap_or(now);
            let event = draft.into_event(id, occurred_at);

            batch.insert(event_key(event.id), minicbor::to_vec(&event)?);
            batch.insert(index_key(&event), Vec::<u8>::new());
            events.push(event);
        }

        self.instance.apply_batch(batch)?;

        debug!(count = events.len(), "appended movement events");
        Ok(events)
    }

    pub fn get(&self, id: EventId) -> Result<Option<MovementEvent>, MovementError> {
        match self.instance.get(event_key(id))? {
            Some(bytes) => Ok(Some(decode_event(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load(&self, id: EventId) -> Result<MovementEvent, MovementError> {
        self.get(id)?.ok_or(MovementError::EventNotFound(id))
    }

    /// The container's latest event: greatest `occurred_at`, ties broken by id.
    pub fn latest_for(&self, inventory_id: InventoryId) -> Result<Option<MovementEvent>, MovementError> {
        let last = self
            .instance
            .scan_prefix(inventory_prefix(inventory_id))
            .keys()
            .next_back()
            .transpose()?;

        match last.as_deref().and_then(parse_index_key) {
            Some((_, id)) => Ok(Some(self.load(id)?)),
            None => Ok(None),
        }
    }

    /// One row per container, each the container's latest event. Computed from
    /// the index on every call: rank 1 of each container's partition.
    pub fn latest_per_container(&self) -> Result<Vec<MovementEvent>, MovementError> {
        let mut heads: Vec<EventId> = Vec::new();
        let mut current: Option<(InventoryId, EventId)> = None;

        for key in self.instance.scan_prefix(INDEX_PREFIX).keys() {
            let key = key?;
            let Some((inventory_id, id)) = parse_index_key(&key) else {
                continue;
            };
            if let Some((previous, head)) = current {
                if previous != inventory_id {
                    heads.push(head);
                }
            }
            current = Some((inventory_id, id));
        }
        if let Some((_, head)) = current {
            heads.push(head);
        }

        let mut events = heads
            .into_iter()
            .map(|id| self.load(id))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut events);
        Ok(events)
    }

    /// Every event of one container, newest first.
    pub fn history(&self, inventory_id: InventoryId) -> Result<Vec<MovementEvent>, MovementError> {
        self.instance
            .scan_prefix(inventory_prefix(inventory_id))
            .keys()
            .rev()
            .filter_map(|key| match key {
                Ok(key) => parse_index_key(&key).map(|(_, id)| self.load(id)),
                Err(e) => Some(Err(e.into())),
            })
            .collect()
    }

    /// The whole ledger, newest first.
    pub fn all(&self) -> Result<Vec<MovementEvent>, MovementError> {
        let mut events = self
            .instance
            .scan_prefix(EVENT_PREFIX)
            .values()
            .map(|value| decode_event(&value?))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut events);
        Ok(events)
    }

    /// Every event whose status is not `status`, newest first.
    pub fn excluding_status(&self, status: MovementStatus) -> Result<Vec<MovementEvent>, MovementError> {
        let mut events = self.all()?;
        events.retain(|event| event.status != status);
        Ok(events)
    }

    /// Cascade for a deleted shipment. Returns how many events were removed.
    pub fn delete_by_shipment(&self, shipment_id: ShipmentId) -> Result<usize, MovementError> {
        self.delete_by_job(JobRef::Shipment(shipment_id), &[])
    }

    /// Cascade for a deleted empty repo job. Returns how many events were removed.
    pub fn delete_by_empty_repo_job(&self, job_id: EmptyRepoJobId) -> Result<usize, MovementError> {
        self.delete_by_job(JobRef::EmptyRepoJob(job_id), &[])
    }

    /// Removes every event of `job` together with `owner_keys` (the job's own
    /// catalog keys) in one batch. Nothing is removed if any event fails to decode.
    pub(crate) fn delete_by_job(
        &self,
        job: JobRef,
        owner_keys: &[Vec<u8>],
    ) -> Result<usize, MovementError> {
        let _guard = self.lock();

        let mut batch = Batch::default();
        for key in owner_keys {
            batch.remove(key.as_slice());
        }
        let mut removed = 0;
        for value in self.instance.scan_prefix(EVENT_PREFIX).values() {
            let event = decode_event(&value?)?;
            if event.job() == Some(job) {
                batch.remove(event_key(event.id));
                batch.remove(index_key(&event));
                removed += 1;
            }
        }
        if removed > 0 || !owner_keys.is_empty() {
            self.instance.apply_batch(batch)?;
        }

        info!(%job, removed, "deleted movements of job");
        Ok(removed)
    }
}
