/// Status machines for entities with a lifecycle
///
/// Trips, vehicles, drivers and shipments each carry a status drawn from a small
/// fixed set. Every status type implements [`StatusMachine`], which owns the
/// allowed-transition table for that entity. Terminal statuses have no
/// successors, so a terminal entity can never be moved again.
///
/// # Example
///
/// ```
/// use fleetdesk_shared::models::trip::TripStatus;
/// use fleetdesk_shared::status::StatusMachine;
///
/// assert!(TripStatus::Planned.can_transition_to(TripStatus::Ongoing));
/// assert!(TripStatus::Completed.is_terminal());
/// assert!(TripStatus::Completed.check_transition(TripStatus::Ongoing).is_err());
/// ```

use std::fmt;

/// Error returned when a requested status change is not in the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The entity is already in a terminal status
    #[error("{entity} is {from} and can no longer change status")]
    Terminal {
        entity: &'static str,
        from: &'static str,
    },

    /// The transition is not permitted from the current status
    #[error("{entity} cannot move from {from} to {to}")]
    NotAllowed {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

/// A fixed set of statuses with a restricted transition table
pub trait StatusMachine: Copy + Eq + fmt::Debug + 'static {
    /// Human-readable entity name used in error messages ("Trip", "Vehicle")
    const ENTITY: &'static str;

    /// All statuses, in lifecycle order
    const ALL: &'static [Self];

    /// Wire/database representation (e.g. `"IN_MAINTENANCE"`)
    fn as_str(&self) -> &'static str;

    /// Statuses reachable in one step from `self`
    fn successors(&self) -> &'static [Self];

    /// Whether no further transitions are possible
    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    /// Whether `target` is reachable in one step
    fn can_transition_to(&self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Validates a transition, describing why it is rejected
    fn check_transition(&self, target: Self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                entity: Self::ENTITY,
                from: self.as_str(),
            });
        }

        if !self.can_transition_to(target) {
            return Err(TransitionError::NotAllowed {
                entity: Self::ENTITY,
                from: self.as_str(),
                to: target.as_str(),
            });
        }

        Ok(())
    }

    /// Parses the wire representation, case-insensitively
    fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::driver::DriverStatus;
    use crate::models::shipment::ShipmentStatus;
    use crate::models::trip::TripStatus;
    use crate::models::vehicle::VehicleStatus;

    fn assert_table_is_closed<S: StatusMachine>() {
        for status in S::ALL {
            // No self loops; a status never lists itself as a successor
            assert!(!status.can_transition_to(*status), "{:?} loops", status);

            // Terminal statuses reject every target
            if status.is_terminal() {
                for target in S::ALL {
                    assert!(status.check_transition(*target).is_err());
                }
            }
        }
    }

    #[test]
    fn test_tables_are_closed() {
        assert_table_is_closed::<TripStatus>();
        assert_table_is_closed::<VehicleStatus>();
        assert_table_is_closed::<DriverStatus>();
        assert_table_is_closed::<ShipmentStatus>();
    }

    #[test]
    fn test_terminal_error_message() {
        let err = TripStatus::Cancelled
            .check_transition(TripStatus::Ongoing)
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::Terminal {
                entity: "Trip",
                from: "CANCELLED"
            }
        );
        assert_eq!(err.to_string(), "Trip is CANCELLED and can no longer change status");
    }

    #[test]
    fn test_not_allowed_error_message() {
        let err = TripStatus::Planned
            .check_transition(TripStatus::Completed)
            .unwrap_err();

        assert_eq!(err.to_string(), "Trip cannot move from PLANNED to COMPLETED");
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert!(VehicleStatus::Active
            .check_transition(VehicleStatus::Active)
            .is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(TripStatus::parse("ongoing"), Some(TripStatus::Ongoing));
        assert_eq!(
            VehicleStatus::parse("IN_MAINTENANCE"),
            Some(VehicleStatus::InMaintenance)
        );
        assert_eq!(ShipmentStatus::parse("lost"), None);
    }
}
