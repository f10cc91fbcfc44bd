//! Port and party derivation for a status transition.
//!
//! | status                 | port                         | party                 |
//! |------------------------|------------------------------|-----------------------|
//! | EMPTY PICKED UP        | previous                     | previous              |
//! | GATE-IN                | load port                    | none                  |
//! | SOB                    | discharge port, else load    | carrier               |
//! | GATE-OUT               | discharge port               | none                  |
//! | EMPTY RETURNED         | discharge port               | empty return depot    |
//! | AVAILABLE, UNAVAILABLE | override, else previous      | override, else previous |
//! | ALLOTTED, CORRECTION   | override, else previous      | override, else previous |
//!
//! Job milestones (GATE-IN, SOB, GATE-OUT, EMPTY RETURNED) always take the job's
//! values; overrides are ignored for them.
use super::context::JobContext;
use super::error::MovementError;
use super::event::MovementEvent;
use super::status::MovementStatus;
use super::types::{PartyId, PortId};
use tracing::debug;

/// Caller-supplied port/party, honoured only by overridable statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementOverride {
    pub port_id: Option<PortId>,
    pub party_id: Option<PartyId>,
}

impl PlacementOverride {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub port_id: PortId,
    pub party_id: Option<PartyId>,
}

pub fn derive(
    status: MovementStatus,
    previous: &MovementEvent,
    context: Option<&JobContext>,
    overrides: PlacementOverride,
) -> Result<Placement, MovementError> {
    let milestone = |context: Option<&JobContext>| {
        context.copied().ok_or_else(|| MovementError::ContextRequired {
            status: status.to_string(),
            inventory_id: previous.inventory_id,
        })
    };

    let (port_id, party_id) = match status {
        MovementStatus::EmptyPickedUp => (Some(previous.port_id), previous.party_id),
        MovementStatus::GateIn => {
            let context = milestone(context)?;
            (context.load_port_id, None)
        }
        MovementStatus::Sob => {
            let context = milestone(context)?;
            (
                context.discharge_port_id.or(context.load_port_id),
                context.carrier_party_id,
            )
        }
        MovementStatus::GateOut => {
            let context = milestone(context)?;
            (context.discharge_port_id, None)
        }
        MovementStatus::EmptyReturned => {
            let context = milestone(context)?;
            (context.discharge_port_id, context.empty_return_party_id)
        }
        MovementStatus::Available
        | MovementStatus::Unavailable
        | MovementStatus::Allotted
        | MovementStatus::Correction => (
            overrides.port_id.or(Some(previous.port_id)),
            overrides.party_id.or(previous.party_id),
        ),
    };

    let port_id = port_id.ok_or_else(|| MovementError::MissingPort {
        status: status.to_string(),
        inventory_id: previous.inventory_id,
    })?;

    debug!(
        inventory_id = %previous.inventory_id,
        %status,
        %port_id,
        party_id = ?party_id,
        "derived placement"
    );
    Ok(Placement { port_id, party_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MovementDraft;
    use crate::types::{EventId, InventoryId, TimeStamp};

    fn previous() -> MovementEvent {
        MovementDraft::new(InventoryId(1), MovementStatus::Allotted, PortId(1))
            .with_party(Some(PartyId(5)))
            .into_event(EventId(1), TimeStamp::new())
    }

    #[test]
    fn gate_in_takes_load_port_and_clears_party() {
        let context = JobContext {
            load_port_id: Some(PortId(7)),
            discharge_port_id: Some(PortId(8)),
            carrier_party_id: Some(PartyId(9)),
            empty_return_party_id: Some(PartyId(10)),
        };
        let placement =
            derive(MovementStatus::GateIn, &previous(), Some(&context), PlacementOverride::none())
                .unwrap();
        assert_eq!(
            placement,
            Placement {
                port_id: PortId(7),
                party_id: None
            }
        );
    }

    #[test]
    fn sob_falls_back_to_load_port() {
        let context = JobContext {
            load_port_id: Some(PortId(3)),
            discharge_port_id: None,
            carrier_party_id: Some(PartyId(9)),
            empty_return_party_id: None,
        };
        let placement =
            derive(MovementStatus::Sob, &previous(), Some(&context), PlacementOverride::none())
                .unwrap();
        assert_eq!(placement.port_id, PortId(3));
        assert_eq!(placement.party_id, Some(PartyId(9)));
    }

    #[test]
    fn milestones_ignore_overrides() {
        let context = JobContext {
            discharge_port_id: Some(PortId(2)),
            empty_return_party_id: Some(PartyId(42)),
            ..Default::default()
        };
        let overrides = PlacementOverride {
            port_id: Some(PortId(99)),
            party_id: Some(PartyId(99)),
        };
        let placement =
            derive(MovementStatus::EmptyReturned, &previous(), Some(&context), overrides).unwrap();
        assert_eq!(placement.port_id, PortId(2));
        assert_eq!(placement.party_id, Some(PartyId(42)));
    }

    #[test]
    fn gate_out_without_discharge_port_is_rejected() {
        let context = JobContext {
            load_port_id: Some(PortId(3)),
            ..Default::default()
        };
        let err = derive(MovementStatus::GateOut, &previous(), Some(&context), PlacementOverride::none())
            .unwrap_err();
        assert!(matches!(err, MovementError::MissingPort { .. }));
    }

    #[test]
    fn milestone_without_context_is_rejected() {
        let err = derive(MovementStatus::Sob, &previous(), None, PlacementOverride::none()).unwrap_err();
        assert!(matches!(err, MovementError::ContextRequired { .. }));
    }

    #[test]
    fn available_uses_override_else_previous() {
        let kept = derive(MovementStatus::Available, &previous(), None, PlacementOverride::none())
            .unwrap();
        assert_eq!(kept.port_id, PortId(1));
        assert_eq!(kept.party_id, Some(PartyId(5)));

        let moved = derive(
            MovementStatus::Unavailable,
            &previous(),
            None,
            PlacementOverride {
                port_id: Some(PortId(4)),
                party_id: None,
            },
        )
        .unwrap();
        assert_eq!(moved.port_id, PortId(4));
        assert_eq!(moved.party_id, Some(PartyId(5)));
    }

    #[test]
    fn empty_pick_up_ignores_overrides() {
        let placement = derive(
            MovementStatus::EmptyPickedUp,
            &previous(),
            None,
            PlacementOverride {
                port_id: Some(PortId(4)),
                party_id: Some(PartyId(6)),
            },
        )
        .unwrap();
        assert_eq!(placement.port_id, PortId(1));
        assert_eq!(placement.party_id, Some(PartyId(5)));
    }
}
