/// Trips
///
/// # Endpoints
///
/// Admin:
/// - `GET /api/admin/trips?status=&driver_id=&limit=&offset=` - List trips
/// - `POST /api/admin/trips` - Plan a trip (starts `PLANNED`, driver is emailed)
/// - `GET /api/admin/trips/:id` - Get a trip
/// - `PUT /api/admin/trips/:id` - Edit a `PLANNED` trip
/// - `DELETE /api/admin/trips/:id` - Delete a `PLANNED` or `CANCELLED` trip
///
/// Admin and driver:
/// - `POST /api/trips/:id/status` - Change status
///
/// Driver:
/// - `GET /api/driver/trips` - The caller's trips
///
/// Administrators may request any transition in the table. Drivers may only
/// start (`ONGOING`) or finish (`COMPLETED`) trips assigned to them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        concurrent_change, non_blank, notify, ActionResponse, ListResponse, Pagination,
        StatusChangeRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use fleetdesk_shared::{
    auth::{
        authorization::{authorize_trip_transition, require_admin, require_role},
        session::Session,
    },
    integrations::email::EmailMessage,
    models::{
        driver::{DriverProfile, DriverStatus},
        trip::{CreateTrip, Trip, TripFilter, TripStatus, UpdateTrip},
        user::{Role, User},
        vehicle::{Vehicle, VehicleStatus},
    },
    status::StatusMachine,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Roles allowed to change trip status
const TRIP_OPERATORS: &[Role] = &[Role::Admin, Role::Driver];

/// `?status=&driver_id=` filter
#[derive(Debug, Default, Deserialize)]
pub struct TripQuery {
    pub status: Option<TripStatus>,
    pub driver_id: Option<Uuid>,
}

/// Create trip request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Origin must be 1-255 characters"))]
    pub origin: String,

    #[validate(length(min = 1, max = 255, message = "Destination must be 1-255 characters"))]
    pub destination: String,

    pub scheduled_at: DateTime<Utc>,

    #[validate(range(exclusive_min = 0.0, message = "Distance must be positive"))]
    pub distance_km: Option<f64>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Update trip request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTripRequest {
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Origin must be 1-255 characters"))]
    pub origin: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Destination must be 1-255 characters"))]
    pub destination: Option<String>,

    pub scheduled_at: Option<DateTime<Utc>>,

    #[validate(range(exclusive_min = 0.0, message = "Distance must be positive"))]
    pub distance_km: Option<f64>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Drivers can be assigned unless they have left the fleet
fn check_driver_assignable(status: DriverStatus) -> ApiResult<()> {
    if status == DriverStatus::Inactive {
        return Err(ApiError::invalid_field(
            "driver_id",
            "Driver is INACTIVE and cannot be assigned trips",
        ));
    }
    Ok(())
}

/// Only vehicles in service can be assigned
fn check_vehicle_assignable(status: VehicleStatus) -> ApiResult<()> {
    if status != VehicleStatus::Active {
        return Err(ApiError::invalid_field(
            "vehicle_id",
            format!("Vehicle is {} and cannot be assigned trips", status.as_str()),
        ));
    }
    Ok(())
}

async fn assignable_driver(state: &AppState, id: Uuid) -> ApiResult<DriverProfile> {
    let driver = DriverProfile::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("driver_id", "Driver not found"))?;

    check_driver_assignable(driver.status)?;
    Ok(driver)
}

async fn assignable_vehicle(state: &AppState, id: Uuid) -> ApiResult<Vehicle> {
    let vehicle = Vehicle::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("vehicle_id", "Vehicle not found"))?;

    check_vehicle_assignable(vehicle.status)?;
    Ok(vehicle)
}

async fn find_trip(state: &AppState, id: Uuid) -> ApiResult<Trip> {
    Trip::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))
}

/// Emails the assigned driver
async fn notify_driver(state: &AppState, driver: &DriverProfile, trip: &Trip) {
    let scheduled_at = trip.scheduled_at.format("%Y-%m-%d %H:%M UTC").to_string();
    let lookup = async {
        User::find_by_id(&state.db, driver.user_id)
            .await
            .map(|user| user.map(|user| user.email))
    };

    notify(state, lookup, |to| {
        EmailMessage::trip_assigned(to, &trip.origin, &trip.destination, &scheduled_at)
    })
    .await;
}

/// Lists trips, latest schedule first
pub async fn list_trips(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<TripQuery>,
) -> ApiResult<Json<ListResponse<Trip>>> {
    require_admin(&session)?;

    let filter = TripFilter {
        status: query.status,
        driver_id: query.driver_id,
    };
    let trips = Trip::list(&state.db, filter, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(trips, page))
}

/// Gets one trip
pub async fn get_trip(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Trip>> {
    require_admin(&session)?;

    Ok(Json(find_trip(&state, id).await?))
}

/// Plans a trip
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown or inactive driver, vehicle not
///   `ACTIVE`, or invalid fields
pub async fn create_trip(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateTripRequest>,
) -> ApiResult<Json<ActionResponse<Trip>>> {
    require_admin(&session)?;
    req.validate()?;

    let driver = assignable_driver(&state, req.driver_id).await?;
    assignable_vehicle(&state, req.vehicle_id).await?;

    let trip = Trip::create(
        &state.db,
        CreateTrip {
            driver_id: req.driver_id,
            vehicle_id: req.vehicle_id,
            origin: req.origin.trim().to_string(),
            destination: req.destination.trim().to_string(),
            scheduled_at: req.scheduled_at,
            distance_km: req.distance_km,
            notes: non_blank(req.notes),
        },
    )
    .await?;

    tracing::info!(trip_id = %trip.id, driver_id = %trip.driver_id, "Trip planned");

    notify_driver(&state, &driver, &trip).await;

    Ok(ActionResponse::ok("Trip created", trip))
}

/// Edits a trip that has not started
///
/// # Errors
///
/// - `409 Conflict`: The trip is no longer `PLANNED`
pub async fn update_trip(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTripRequest>,
) -> ApiResult<Json<ActionResponse<Trip>>> {
    require_admin(&session)?;
    req.validate()?;

    let trip = find_trip(&state, id).await?;
    if !trip.status.is_editable() {
        return Err(ApiError::Conflict(format!(
            "Trip is {} and can no longer be edited",
            trip.status.as_str()
        )));
    }

    let new_driver = match req.driver_id.filter(|d| *d != trip.driver_id) {
        Some(driver_id) => Some(assignable_driver(&state, driver_id).await?),
        None => None,
    };
    if let Some(vehicle_id) = req.vehicle_id.filter(|v| *v != trip.vehicle_id) {
        assignable_vehicle(&state, vehicle_id).await?;
    }

    let updated = Trip::update_planned(
        &state.db,
        id,
        UpdateTrip {
            driver_id: req.driver_id,
            vehicle_id: req.vehicle_id,
            origin: non_blank(req.origin),
            destination: non_blank(req.destination),
            scheduled_at: req.scheduled_at,
            distance_km: req.distance_km,
            notes: non_blank(req.notes),
        },
    )
    .await?
    .ok_or_else(|| concurrent_change(trip.status))?;

    tracing::info!(trip_id = %id, "Trip updated");

    if let Some(driver) = new_driver {
        notify_driver(&state, &driver, &updated).await;
    }

    Ok(ActionResponse::ok("Trip updated", updated))
}

/// Deletes a trip that never ran or was called off
///
/// # Errors
///
/// - `409 Conflict`: The trip is `ONGOING` or `COMPLETED`
pub async fn delete_trip(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    let trip = find_trip(&state, id).await?;
    if !trip.status.is_deletable() {
        return Err(ApiError::Conflict(format!(
            "Trip is {} and cannot be deleted",
            trip.status.as_str()
        )));
    }

    Trip::delete(&state.db, id).await?;

    tracing::info!(trip_id = %id, "Trip deleted");

    Ok(ActionResponse::done("Trip deleted"))
}

/// Changes a trip's status
///
/// # Errors
///
/// - `403 Forbidden`: A driver requesting a status other than `ONGOING` or
///   `COMPLETED`, or a trip assigned to someone else
/// - `404 Not Found`: Unknown trip
/// - `409 Conflict`: Transition not allowed, or the status changed concurrently
pub async fn update_trip_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest<TripStatus>>,
) -> ApiResult<Json<ActionResponse<Trip>>> {
    let role = require_role(&session, TRIP_OPERATORS)?;
    let trip = find_trip(&state, id).await?;

    let own_driver_id = match role {
        Role::Driver => DriverProfile::find_by_user_id(&state.db, session.user_id)
            .await?
            .map(|profile| profile.id),
        _ => None,
    };

    authorize_trip_transition(role, own_driver_id, trip.driver_id, req.status)?;
    trip.status.check_transition(req.status)?;

    let updated = Trip::transition(&state.db, id, trip.status, req.status)
        .await?
        .ok_or_else(|| concurrent_change(trip.status))?;

    tracing::info!(
        trip_id = %id,
        user_id = %session.user_id,
        role = %role,
        from = trip.status.as_str(),
        to = req.status.as_str(),
        "Trip status changed"
    );

    Ok(ActionResponse::ok(
        format!("Trip is now {}", req.status.as_str()),
        updated,
    ))
}

/// The caller's own trips, active ones first
pub async fn list_own_trips(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Trip>>> {
    require_role(&session, &[Role::Driver])?;

    let profile = DriverProfile::find_by_user_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Driver profile not found".to_string()))?;

    Ok(Json(Trip::list_for_driver(&state.db, profile.id).await?))
}
