//! Movement status vocabulary
use super::error::MovementError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum MovementStatus {
    #[n(0)]
    Allotted,
    #[n(1)]
    EmptyPickedUp,
    #[n(2)]
    GateIn,
    #[n(3)]
    Sob, // shipped on board
    #[n(4)]
    GateOut,
    #[n(5)]
    EmptyReturned,
    #[n(6)]
    Available,
    #[n(7)]
    Unavailable,
    /// Operator correction: keeps the previous placement unless overridden.
    #[n(8)]
    Correction,
}

/// Where a status takes its port and party from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRule {
    /// Copy the previous event, ignoring overrides.
    CarryForward,
    /// Read from the job context. Overrides are ignored.
    JobMilestone,
    /// Use the override when given, else the previous event.
    Overridable,
}

impl MovementStatus {
    pub const ALL: [MovementStatus; 9] = [
        MovementStatus::Allotted,
        MovementStatus::EmptyPickedUp,
        MovementStatus::GateIn,
        MovementStatus::Sob,
        MovementStatus::GateOut,
        MovementStatus::EmptyReturned,
        MovementStatus::Available,
        MovementStatus::Unavailable,
        MovementStatus::Correction,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MovementStatus::Allotted => "ALLOTTED",
            MovementStatus::EmptyPickedUp => "EMPTY PICKED UP",
            MovementStatus::GateIn => "GATE-IN",
            MovementStatus::Sob => "SOB",
            MovementStatus::GateOut => "GATE-OUT",
            MovementStatus::EmptyReturned => "EMPTY RETURNED",
            MovementStatus::Available => "AVAILABLE",
            MovementStatus::Unavailable => "UNAVAILABLE",
            MovementStatus::Correction => "CORRECTION",
        }
    }

    pub fn placement_rule(&self) -> PlacementRule {
        match self {
            MovementStatus::EmptyPickedUp => PlacementRule::CarryForward,
            MovementStatus::GateIn
            | MovementStatus::Sob
            | MovementStatus::GateOut
            | MovementStatus::EmptyReturned => PlacementRule::JobMilestone,
            MovementStatus::Available
            | MovementStatus::Unavailable
            | MovementStatus::Allotted
            | MovementStatus::Correction => PlacementRule::Overridable,
        }
    }

    pub fn requires_context(&self) -> bool {
        self.placement_rule() == PlacementRule::JobMilestone
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MovementStatus {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "gate in", "GATE_IN" and "Gate-In" all name the same status
        let normalized = s
            .trim()
            .to_uppercase()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let status = match normalized.as_str() {
            "ALLOTTED" => MovementStatus::Allotted,
            "EMPTY PICKED UP" => MovementStatus::EmptyPickedUp,
            "GATE IN" => MovementStatus::GateIn,
            "SOB" => MovementStatus::Sob,
            "GATE OUT" => MovementStatus::GateOut,
            "EMPTY RETURNED" => MovementStatus::EmptyReturned,
            "AVAILABLE" => MovementStatus::Available,
            "UNAVAILABLE" => MovementStatus::Unavailable,
            "CORRECTION" => MovementStatus::Correction,
            _ => {
                return Err(MovementError::UnknownStatus {
                    status: s.to_string(),
                });
            }
        };
        Ok(status)
    }
}
