/// Identity-provider webhooks
///
/// # Endpoints
///
/// - `POST /api/webhooks/identity` - Account lifecycle events
///
/// Deliveries are verified against the configured secret before the body is
/// parsed. `user.created` and `user.updated` upsert the account by its
/// provider ID (linking an existing account with the same email on first
/// sight); `user.deleted` removes it. Other event types are acknowledged and
/// ignored.
///
/// A role carried by the event is only applied when it needs no profile
/// (`admin`). Drivers and clients pick their role through onboarding, which
/// creates the profile alongside it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, ActionResponse},
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use fleetdesk_shared::{
    integrations::webhook::{IdentityEvent, IdentityUser},
    models::user::{CreateUser, Role, UpdateUser, User},
};

/// Role from the provider that can be stored without a profile
fn provisioned_role(role: Option<Role>) -> Option<Role> {
    role.filter(|role| !role.is_self_service())
}

/// Creates or refreshes the account behind a provider user
async fn upsert_identity_user(state: &AppState, identity: IdentityUser) -> ApiResult<User> {
    let email = non_blank(identity.email);
    let role = provisioned_role(identity.role);

    let existing = match User::find_by_external_id(&state.db, &identity.id).await? {
        Some(user) => Some(user),
        None => match &email {
            Some(email) => match User::find_by_email(&state.db, email).await? {
                Some(user) => {
                    tracing::info!(user_id = %user.id, external_id = %identity.id, "Linking identity to existing account");
                    let linked = User::link_external_id(&state.db, user.id, &identity.id).await?;
                    Some(linked.ok_or_else(|| {
                        ApiError::Conflict(
                            "Email belongs to an account linked to another identity".to_string(),
                        )
                    })?)
                }
                None => None,
            },
            None => None,
        },
    };

    let Some(existing) = existing else {
        let email = email.ok_or_else(|| {
            ApiError::BadRequest("Identity event for a new user carries no email".to_string())
        })?;

        let user = User::create(
            &state.db,
            CreateUser {
                email,
                name: non_blank(identity.name),
                role,
                password_hash: None,
                must_change_password: false,
                external_id: Some(identity.id),
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, "User created from identity event");
        return Ok(user);
    };

    let user = User::update(
        &state.db,
        existing.id,
        UpdateUser {
            email,
            name: identity.name.map(|name| non_blank(Some(name))),
            role: role.filter(|_| existing.role.is_none()),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "User updated from identity event");
    Ok(user)
}

/// Applies a verified identity-provider event
///
/// # Errors
///
/// - `400 Bad Request`: Malformed payload, or a new user without email
/// - `401 Unauthorized`: Missing headers, bad signature or stale timestamp
/// - `409 Conflict`: The email belongs to an account linked to another identity
/// - `503 Service Unavailable`: No webhook secret configured
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ActionResponse<()>>> {
    let verifier = state.webhooks.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Identity webhooks are not configured".to_string())
    })?;

    verifier.verify(&headers, &body, Utc::now().timestamp())?;

    let event = IdentityEvent::parse(&body)?;
    tracing::debug!(event_type = event.event_type(), "Identity event received");

    let message = match event {
        IdentityEvent::UserCreated(identity) | IdentityEvent::UserUpdated(identity) => {
            upsert_identity_user(&state, identity).await?;
            "User synchronized"
        }
        IdentityEvent::UserDeleted(deleted) => {
            if User::delete_by_external_id(&state.db, &deleted.id).await? {
                tracing::info!(external_id = %deleted.id, "User deleted from identity event");
                "User deleted"
            } else {
                "User already absent"
            }
        }
        IdentityEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring identity event");
            "Event ignored"
        }
    };

    Ok(ActionResponse::done(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_profileless_roles_are_provisioned() {
        assert_eq!(provisioned_role(Some(Role::Admin)), Some(Role::Admin));
        assert_eq!(provisioned_role(Some(Role::Driver)), None);
        assert_eq!(provisioned_role(Some(Role::Client)), None);
        assert_eq!(provisioned_role(None), None);
    }
}
