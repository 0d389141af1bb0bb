/// User management (admin)
///
/// # Endpoints
///
/// - `GET /api/admin/users?role=&limit=&offset=` - List users
/// - `POST /api/admin/users` - Create a user with a temporary password
/// - `GET /api/admin/users/:id` - Get a user
/// - `PUT /api/admin/users/:id` - Update name, email or role
/// - `DELETE /api/admin/users/:id` - Delete a user (not yourself)
///
/// New accounts get a generated temporary password, `must_change_password`
/// set, the profile their role needs, and a welcome email.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, ActionResponse, ListResponse, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use fleetdesk_shared::{
    auth::{authorization::require_admin, password, session::Session},
    integrations::email::{dispatch_email, EmailMessage},
    models::{
        client::{ClientProfile, CreateClientProfile},
        driver::{CreateDriverProfile, DriverProfile},
        user::{CreateUser, Role, UpdateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// `?role=` filter
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: Role,

    /// Driver accounts: required
    #[validate(length(max = 50, message = "License number must be at most 50 characters"))]
    pub license_number: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// Client accounts: optional company details
    #[validate(length(max = 200, message = "Company name must be at most 200 characters"))]
    pub company_name: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: Option<Role>,
}

/// A created account and the password it was issued
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: User,

    /// Shown once; also sent in the welcome email
    pub temporary_password: String,
}

/// Account to provision on behalf of an administrator
pub(crate) struct NewAccount {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub driver: Option<CreateDriverProfile>,
    pub client: Option<CreateClientProfile>,
}

impl CreateUserRequest {
    fn into_account(self) -> ApiResult<NewAccount> {
        let mut account = NewAccount {
            email: self.email.trim().to_string(),
            name: non_blank(self.name),
            role: self.role,
            driver: None,
            client: None,
        };

        match self.role {
            Role::Admin => {}
            Role::Driver => {
                let license_number = non_blank(self.license_number).ok_or_else(|| {
                    ApiError::invalid_field("license_number", "License number is required")
                })?;
                let phone = non_blank(self.phone)
                    .ok_or_else(|| ApiError::invalid_field("phone", "Phone is required"))?;

                account.driver = Some(CreateDriverProfile {
                    user_id: Uuid::nil(),
                    license_number,
                    phone,
                });
            }
            Role::Client => {
                account.client = Some(CreateClientProfile {
                    user_id: Uuid::nil(),
                    company_name: non_blank(self.company_name),
                    phone: non_blank(self.phone),
                    address: non_blank(self.address),
                });
            }
        }

        Ok(account)
    }
}

/// Creates the user and role profile in one transaction, then sends the
/// welcome email
pub(crate) async fn provision_account(
    state: &AppState,
    account: NewAccount,
) -> ApiResult<CreatedUser> {
    let temporary_password = password::generate_temporary_password();
    let password_hash = password::hash_password(&temporary_password)?;

    let mut tx = state.db.begin().await?;

    let user = User::create_with(
        &mut *tx,
        CreateUser {
            email: account.email,
            name: account.name,
            role: Some(account.role),
            password_hash: Some(password_hash),
            must_change_password: true,
            external_id: None,
        },
    )
    .await?;

    if let Some(driver) = account.driver {
        DriverProfile::create(
            &mut *tx,
            CreateDriverProfile {
                user_id: user.id,
                ..driver
            },
        )
        .await?;
    }

    if let Some(client) = account.client {
        ClientProfile::create(
            &mut *tx,
            CreateClientProfile {
                user_id: user.id,
                ..client
            },
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = %user.id, role = %account.role, "User provisioned");

    dispatch_email(
        state.email.clone(),
        EmailMessage::welcome(&user.email, user.name.as_deref(), &temporary_password),
    );

    Ok(CreatedUser {
        user,
        temporary_password,
    })
}

async fn find_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Lists users, newest first
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<ListResponse<User>>> {
    require_admin(&session)?;

    let users = User::list(&state.db, query.role, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(users, page))
}

/// Gets one user
pub async fn get_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_admin(&session)?;

    Ok(Json(find_user(&state, id).await?))
}

/// Creates a user
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed or driver details missing
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<Json<ActionResponse<CreatedUser>>> {
    require_admin(&session)?;
    req.validate()?;

    let created = provision_account(&state, req.into_account()?).await?;

    Ok(ActionResponse::ok("User created", created))
}

/// Checks a role change against the profiles the user already has
///
/// Drivers and clients need their profile to use the app.
fn check_role_change(
    target: Role,
    has_driver_profile: bool,
    has_client_profile: bool,
) -> ApiResult<()> {
    match target {
        Role::Driver if !has_driver_profile => Err(ApiError::invalid_field(
            "role",
            "User has no driver profile; create the driver from the drivers page",
        )),
        Role::Client if !has_client_profile => Err(ApiError::invalid_field(
            "role",
            "User has no client profile",
        )),
        _ => Ok(()),
    }
}

/// Updates a user's name, email or role
///
/// # Errors
///
/// - `400 Bad Request`: Changing your own role
/// - `404 Not Found`: Unknown user
/// - `409 Conflict`: Email already exists
pub async fn update_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<ActionResponse<User>>> {
    require_admin(&session)?;
    req.validate()?;

    let existing = find_user(&state, id).await?;

    if let Some(role) = req.role.filter(|role| Some(*role) != existing.role) {
        if id == session.user_id {
            return Err(ApiError::BadRequest(
                "You cannot change your own role".to_string(),
            ));
        }

        let driver = DriverProfile::find_by_user_id(&state.db, id).await?;
        let client = ClientProfile::find_by_user_id(&state.db, id).await?;
        check_role_change(role, driver.is_some(), client.is_some())?;
    }

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            email: non_blank(req.email),
            name: req.name.map(|name| non_blank(Some(name))),
            role: req.role,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "User updated");

    Ok(ActionResponse::ok("User updated", user))
}

/// Deletes a user and their profile
///
/// # Errors
///
/// - `400 Bad Request`: Deleting your own account
/// - `404 Not Found`: Unknown user
/// - `409 Conflict`: The user's driver profile still has trips
pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    if id == session.user_id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, "User deleted");

    Ok(ActionResponse::done("User deleted"))
}
