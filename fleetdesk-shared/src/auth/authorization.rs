/// Authorization checks performed inside actions
///
/// The access gate already redirects callers away from routes their role may
/// not use. Every mutating action repeats the role check here so that an action
/// is safe even when reached through a route the gate does not cover. These
/// checks fail with an error (HTTP 403), not a redirect.
///
/// # Trip Transitions
///
/// | Caller | May request | On |
/// |--------|-------------|----|
/// | admin  | any transition in the trip table | any trip |
/// | driver | `ONGOING`, `COMPLETED` | trips assigned to their own driver profile |
/// | client | nothing | |
///
/// # Example
///
/// ```
/// use fleetdesk_shared::auth::authorization::require_role;
/// use fleetdesk_shared::auth::session::Session;
/// use fleetdesk_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let session = Session {
///     user_id: Uuid::new_v4(),
///     role: Some(Role::Driver),
///     must_change_password: false,
/// };
///
/// assert!(require_role(&session, &[Role::Admin, Role::Driver]).is_ok());
/// assert!(require_role(&session, &[Role::Admin]).is_err());
/// ```

use uuid::Uuid;

use super::session::Session;
use crate::models::trip::TripStatus;
use crate::models::user::Role;
use crate::status::StatusMachine;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller has not picked a role yet
    #[error("Complete onboarding before using this action")]
    MissingRole,

    /// Caller's role is not allowed
    #[error("Insufficient permissions: {actual} cannot perform this action")]
    InsufficientRole { actual: Role },

    /// Caller does not own the resource
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Driver asked for a status only an administrator may set
    #[error("Drivers cannot set a trip to {0}")]
    StatusNotPermitted(&'static str),
}

/// Statuses a driver may request on their own trips
pub const DRIVER_TRIP_STATUSES: &[TripStatus] = &[TripStatus::Ongoing, TripStatus::Completed];

/// Checks that the caller holds one of `allowed` and returns the role
pub fn require_role(session: &Session, allowed: &[Role]) -> Result<Role, AuthzError> {
    let role = session.role.ok_or(AuthzError::MissingRole)?;

    if !allowed.contains(&role) {
        return Err(AuthzError::InsufficientRole { actual: role });
    }

    Ok(role)
}

/// Shorthand for `require_role(session, &[Role::Admin])`
pub fn require_admin(session: &Session) -> Result<(), AuthzError> {
    require_role(session, &[Role::Admin]).map(|_| ())
}

/// Checks that `owner_id` matches the caller's own profile
///
/// `own_profile_id` is the caller's driver or client profile, if any.
pub fn require_ownership(own_profile_id: Option<Uuid>, owner_id: Uuid) -> Result<(), AuthzError> {
    match own_profile_id {
        Some(id) if id == owner_id => Ok(()),
        _ => Err(AuthzError::NotOwner),
    }
}

/// Decides whether `role` may move a trip owned by `trip_driver_id` to `target`
///
/// `own_driver_id` is the caller's driver profile ID (only meaningful for
/// drivers). The transition table itself is checked separately by
/// [`crate::status::StatusMachine::check_transition`].
pub fn authorize_trip_transition(
    role: Role,
    own_driver_id: Option<Uuid>,
    trip_driver_id: Uuid,
    target: TripStatus,
) -> Result<(), AuthzError> {
    match role {
        Role::Admin => Ok(()),
        Role::Driver => {
            if !DRIVER_TRIP_STATUSES.contains(&target) {
                return Err(AuthzError::StatusNotPermitted(target.as_str()));
            }
            require_ownership(own_driver_id, trip_driver_id)
        }
        Role::Client => Err(AuthzError::InsufficientRole { actual: role }),
    }
}
