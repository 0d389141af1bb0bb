/// The caller's own account
///
/// # Endpoints
///
/// - `GET /api/account/me` - Account and role profile
/// - `POST /api/account/password` - Change password (clears the temporary-password flag)
/// - `POST /api/account/password-flag/clear` - Clear the temporary-password flag

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::token_response, current_user},
};
use axum::{extract::State, response::Response, Json};
use fleetdesk_shared::{
    auth::{password, session::Session},
    models::{client::ClientProfile, driver::DriverProfile, user::User},
};
use serde::{Deserialize, Serialize};

/// Account with the profile matching its role
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: User,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientProfile>,
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Required unless the account is still on a temporary password
    pub current_password: Option<String>,
    pub new_password: String,
}

/// Returns the caller's account and profile
pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<AccountResponse>> {
    let user = current_user(&state, &session).await?;

    let driver = DriverProfile::find_by_user_id(&state.db, user.id).await?;
    let client = ClientProfile::find_by_user_id(&state.db, user.id).await?;

    Ok(Json(AccountResponse {
        user,
        driver,
        client,
    }))
}

/// Whether the current password must be supplied to change it
fn requires_current_password(user: &User) -> bool {
    user.password_hash.is_some() && !user.must_change_password
}

/// Changes the caller's password
///
/// Returns fresh tokens without the temporary-password flag.
///
/// # Errors
///
/// - `401 Unauthorized`: Current password missing or wrong
/// - `422 Unprocessable Entity`: Weak new password
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Response> {
    let user = current_user(&state, &session).await?;

    if requires_current_password(&user) {
        let current = req.current_password.as_deref().unwrap_or_default();
        let hash = user.password_hash.as_deref().unwrap_or_default();

        if !password::verify_password(current, hash)? {
            return Err(ApiError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::invalid_field("new_password", e))?;

    let hash = password::hash_password(&req.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    let user = current_user(&state, &session).await?;
    token_response(&state, user, "Password changed")
}

/// Clears `must_change_password` for the caller
pub async fn clear_password_flag(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Response> {
    if !User::clear_password_flag(&state.db, session.user_id).await? {
        return Err(ApiError::Unauthorized("Account no longer exists".to_string()));
    }

    let user = current_user(&state, &session).await?;
    token_response(&state, user, "Password flag cleared")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(password_hash: Option<&str>, must_change_password: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            name: Some("Ana".to_string()),
            role: None,
            password_hash: password_hash.map(str::to_string),
            must_change_password,
            external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_requires_current_password() {
        assert!(requires_current_password(&user(Some("$argon2id$..."), false)));
        assert!(!requires_current_password(&user(Some("$argon2id$..."), true)));
        assert!(!requires_current_password(&user(None, false)));
    }
}
