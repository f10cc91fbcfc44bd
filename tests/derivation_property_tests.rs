//! Property-based tests for port/party derivation
//!
//! derive() is pure, so these run without a store. They pin down the rule
//! table across arbitrary previous events, job contexts and overrides.

use container_movements::{
    MovementError, MovementEvent, MovementStatus,
    context::JobContext,
    placement::{PlacementOverride, derive},
    types::{EventId, InventoryId, PartyId, PortId, TimeStamp},
};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = MovementStatus> {
    prop::sample::select(MovementStatus::ALL.to_vec())
}

fn milestone_strategy() -> impl Strategy<Value = MovementStatus> {
    prop::sample::select(vec![
        MovementStatus::GateIn,
        MovementStatus::Sob,
        MovementStatus::GateOut,
        MovementStatus::EmptyReturned,
    ])
}

fn previous_strategy() -> impl Strategy<Value = MovementEvent> {
    (1u64..50, 1u64..50, proptest::option::of(1u64..50)).prop_map(|(inventory, port, party)| {
        MovementEvent {
            id: EventId(1),
            inventory_id: InventoryId(inventory),
            shipment_id: None,
            empty_repo_job_id: None,
            port_id: PortId(port),
            party_id: party.map(PartyId),
            status: MovementStatus::Allotted,
            remarks: None,
            occurred_at: TimeStamp::new(),
        }
    })
}

fn context_strategy() -> impl Strategy<Value = JobContext> {
    (
        proptest::option::of(1u64..50),
        proptest::option::of(1u64..50),
        proptest::option::of(1u64..50),
        proptest::option::of(1u64..50),
    )
        .prop_map(|(load, discharge, carrier, empty_return)| JobContext {
            load_port_id: load.map(PortId),
            discharge_port_id: discharge.map(PortId),
            carrier_party_id: carrier.map(PartyId),
            empty_return_party_id: empty_return.map(PartyId),
        })
}

fn override_strategy() -> impl Strategy<Value = PlacementOverride> {
    (proptest::option::of(1u64..50), proptest::option::of(1u64..50)).prop_map(|(port, party)| {
        PlacementOverride {
            port_id: port.map(PortId),
            party_id: party.map(PartyId),
        }
    })
}

proptest! {
    /// Property: derivation is deterministic
    #[test]
    fn prop_derive_is_deterministic(
        status in status_strategy(),
        previous in previous_strategy(),
        context in context_strategy(),
        overrides in override_strategy(),
    ) {
        let first = derive(status, &previous, Some(&context), overrides);
        let second = derive(status, &previous, Some(&context), overrides);
        prop_assert_eq!(first.ok(), second.ok());
    }

    /// Property: job milestones never look at overrides
    #[test]
    fn prop_milestones_ignore_overrides(
        status in milestone_strategy(),
        previous in previous_strategy(),
        context in context_strategy(),
        overrides in override_strategy(),
    ) {
        let with = derive(status, &previous, Some(&context), overrides).ok();
        let without = derive(status, &previous, Some(&context), PlacementOverride::none()).ok();
        prop_assert_eq!(with, without);
    }

    /// Property: job milestones never look at the previous placement
    #[test]
    fn prop_milestones_ignore_previous(
        status in milestone_strategy(),
        first in previous_strategy(),
        second in previous_strategy(),
        context in context_strategy(),
    ) {
        let a = derive(status, &first, Some(&context), PlacementOverride::none()).ok();
        let b = derive(status, &second, Some(&context), PlacementOverride::none()).ok();
        prop_assert_eq!(a, b);
    }

    /// Property: a milestone fails exactly when the rule's port is missing
    #[test]
    fn prop_missing_port_is_rejected(
        status in milestone_strategy(),
        previous in previous_strategy(),
        context in context_strategy(),
    ) {
        let port = match status {
            MovementStatus::GateIn => context.load_port_id,
            MovementStatus::Sob => context.discharge_port_id.or(context.load_port_id),
            _ => context.discharge_port_id,
        };
        match derive(status, &previous, Some(&context), PlacementOverride::none()) {
            Ok(placement) => prop_assert_eq!(Some(placement.port_id), port),
            Err(MovementError::MissingPort { .. }) => prop_assert!(port.is_none()),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Property: overridable statuses take the override, else the previous value,
    /// and never need a job context
    #[test]
    fn prop_overridable_statuses_fall_back_to_previous(
        status in prop::sample::select(vec![
            MovementStatus::Available,
            MovementStatus::Unavailable,
            MovementStatus::Allotted,
            MovementStatus::Correction,
        ]),
        previous in previous_strategy(),
        overrides in override_strategy(),
    ) {
        let placement = derive(status, &previous, None, overrides).expect("always placeable");
        prop_assert_eq!(placement.port_id, overrides.port_id.unwrap_or(previous.port_id));
        prop_assert_eq!(placement.party_id, overrides.party_id.or(previous.party_id));
    }

    /// Property: status labels parse back regardless of case
    #[test]
    fn prop_status_parsing_ignores_case(status in status_strategy()) {
        let lower = status.label().to_lowercase();
        prop_assert_eq!(lower.parse::<MovementStatus>().ok(), Some(status));
    }
}
