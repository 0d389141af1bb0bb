/// Driver management (admin)
///
/// # Endpoints
///
/// - `GET /api/admin/drivers?status=&limit=&offset=` - List drivers
/// - `POST /api/admin/drivers` - Create a driver account and profile
/// - `GET /api/admin/drivers/:id` - Get a driver
/// - `PUT /api/admin/drivers/:id` - Update name, license or phone
/// - `DELETE /api/admin/drivers/:id` - Delete the driver's account
/// - `POST /api/admin/drivers/:id/status` - Change availability

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        concurrent_change, non_blank,
        users::{provision_account, CreatedUser, NewAccount},
        ActionResponse, ListResponse, Pagination, StatusChangeRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use fleetdesk_shared::{
    auth::{authorization::require_admin, session::Session},
    models::{
        driver::{CreateDriverProfile, DriverProfile, DriverStatus, DriverSummary, UpdateDriverProfile},
        user::{Role, UpdateUser, User},
    },
    status::StatusMachine,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// `?status=` filter
#[derive(Debug, Default, Deserialize)]
pub struct DriverQuery {
    pub status: Option<DriverStatus>,
}

/// Create driver request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "License number must be 1-50 characters"))]
    pub license_number: String,

    #[validate(length(min = 1, max = 30, message = "Phone must be 1-30 characters"))]
    pub phone: String,
}

/// Update driver request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDriverRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "License number must be 1-50 characters"))]
    pub license_number: Option<String>,

    #[validate(length(min = 1, max = 30, message = "Phone must be 1-30 characters"))]
    pub phone: Option<String>,
}

/// Driver profile with its account
#[derive(Debug, Serialize)]
pub struct DriverDetail {
    pub profile: DriverProfile,
    pub user: User,
}

async fn find_driver(state: &AppState, id: Uuid) -> ApiResult<DriverProfile> {
    DriverProfile::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Driver not found".to_string()))
}

async fn driver_detail(state: &AppState, profile: DriverProfile) -> ApiResult<DriverDetail> {
    let user = User::find_by_id(&state.db, profile.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Driver not found".to_string()))?;

    Ok(DriverDetail { profile, user })
}

/// Lists drivers with their names and emails
pub async fn list_drivers(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<DriverQuery>,
) -> ApiResult<Json<ListResponse<DriverSummary>>> {
    require_admin(&session)?;

    let drivers = DriverProfile::list(&state.db, query.status, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(drivers, page))
}

/// Gets one driver
pub async fn get_driver(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DriverDetail>> {
    require_admin(&session)?;

    let profile = find_driver(&state, id).await?;
    Ok(Json(driver_detail(&state, profile).await?))
}

/// Creates a driver account with a temporary password
pub async fn create_driver(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateDriverRequest>,
) -> ApiResult<Json<ActionResponse<CreatedUser>>> {
    require_admin(&session)?;
    req.validate()?;

    let account = NewAccount {
        email: req.email.trim().to_string(),
        name: non_blank(req.name),
        role: Role::Driver,
        driver: Some(CreateDriverProfile {
            user_id: Uuid::nil(),
            license_number: req.license_number.trim().to_string(),
            phone: req.phone.trim().to_string(),
        }),
        client: None,
    };

    let created = provision_account(&state, account).await?;

    Ok(ActionResponse::ok("Driver created", created))
}

/// Updates a driver's name and profile details
pub async fn update_driver(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDriverRequest>,
) -> ApiResult<Json<ActionResponse<DriverDetail>>> {
    require_admin(&session)?;
    req.validate()?;

    let profile = find_driver(&state, id).await?;

    if let Some(name) = req.name {
        User::update(
            &state.db,
            profile.user_id,
            UpdateUser {
                name: Some(non_blank(Some(name))),
                ..Default::default()
            },
        )
        .await?;
    }

    let profile = DriverProfile::update(
        &state.db,
        id,
        UpdateDriverProfile {
            license_number: non_blank(req.license_number),
            phone: non_blank(req.phone),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Driver not found".to_string()))?;

    tracing::info!(driver_id = %id, "Driver updated");

    Ok(ActionResponse::ok(
        "Driver updated",
        driver_detail(&state, profile).await?,
    ))
}

/// Deletes the driver's account (the profile goes with it)
///
/// # Errors
///
/// - `409 Conflict`: The driver still has trips
pub async fn delete_driver(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    let profile = find_driver(&state, id).await?;
    User::delete(&state.db, profile.user_id).await?;

    tracing::info!(driver_id = %id, user_id = %profile.user_id, "Driver deleted");

    Ok(ActionResponse::done("Driver deleted"))
}

/// Changes a driver's availability
///
/// # Errors
///
/// - `409 Conflict`: Transition not allowed, or the status changed concurrently
pub async fn update_driver_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest<DriverStatus>>,
) -> ApiResult<Json<ActionResponse<DriverProfile>>> {
    require_admin(&session)?;

    let profile = find_driver(&state, id).await?;
    profile.status.check_transition(req.status)?;

    let updated = DriverProfile::transition(&state.db, id, profile.status, req.status)
        .await?
        .ok_or_else(|| concurrent_change(profile.status))?;

    tracing::info!(
        driver_id = %id,
        from = profile.status.as_str(),
        to = req.status.as_str(),
        "Driver status changed"
    );

    Ok(ActionResponse::ok(
        format!("Driver is now {}", req.status.as_str()),
        updated,
    ))
}
