//! Identifiers and timestamps shared by the ledger, the catalog and the service
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::fmt;

// Plain u64 newtypes. They encode as a bare CBOR unsigned integer.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<C> minicbor::Encode<C> for $name {
            fn encode<W: minicbor::encode::Write>(
                &self,
                e: &mut minicbor::Encoder<W>,
                _: &mut C,
            ) -> Result<(), minicbor::encode::Error<W::Error>> {
                e.u64(self.0)?.ok()
            }
        }

        impl<'b, C> minicbor::Decode<'b, C> for $name {
            fn decode(
                d: &mut minicbor::Decoder<'b>,
                _: &mut C,
            ) -> Result<Self, minicbor::decode::Error> {
                Ok(Self(d.u64()?))
            }
        }
    };
}

numeric_id!(
    /// Ledger row id, assigned by the store and monotonic.
    EventId
);
numeric_id!(
    /// A physical container (inventory unit).
    InventoryId
);
numeric_id!(ShipmentId);
numeric_id!(EmptyRepoJobId);
numeric_id!(PortId);
numeric_id!(
    /// Address book entry: depot, carrier or agent.
    PartyId
);

/// The job that owns a movement. An event points at one of these or at nothing
/// (only before the container's first allotment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobRef {
    Shipment(ShipmentId),
    EmptyRepoJob(EmptyRepoJobId),
}

impl JobRef {
    pub fn from_columns(
        shipment_id: Option<ShipmentId>,
        empty_repo_job_id: Option<EmptyRepoJobId>,
    ) -> Option<Self> {
        match (shipment_id, empty_repo_job_id) {
            (Some(id), _) => Some(JobRef::Shipment(id)),
            (None, Some(id)) => Some(JobRef::EmptyRepoJob(id)),
            (None, None) => None,
        }
    }

    pub fn shipment_id(&self) -> Option<ShipmentId> {
        match self {
            JobRef::Shipment(id) => Some(*id),
            JobRef::EmptyRepoJob(_) => None,
        }
    }

    pub fn empty_repo_job_id(&self) -> Option<EmptyRepoJobId> {
        match self {
            JobRef::Shipment(_) => None,
            JobRef::EmptyRepoJob(id) => Some(*id),
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobRef::Shipment(id) => write!(f, "shipment {id}"),
            JobRef::EmptyRepoJob(id) => write!(f, "empty repo job {id}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
            .into()
    }
    pub fn from_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Nanoseconds since the epoch, saturating outside the representable range
    /// (roughly 1677..2262) so ordering is preserved.
    pub fn nanos(&self) -> i64 {
        match self.0.timestamp_nanos_opt() {
            Some(n) => n,
            None if self.0.timestamp() < 0 => i64::MIN,
            None => i64::MAX,
        }
    }
    /// One nanosecond later, or unchanged at the end of chrono's range.
    pub fn next_tick(&self) -> Self {
        Self(
            self.0
                .checked_add_signed(TimeDelta::nanoseconds(1))
                .unwrap_or(self.0),
        )
    }
    /// Order-preserving unsigned form, used in index keys.
    pub fn sort_key(&self) -> u64 {
        (self.nanos() as u64) ^ (1 << 63)
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
