/// Vehicle management (admin)
///
/// # Endpoints
///
/// - `GET /api/admin/vehicles?status=&limit=&offset=` - List vehicles
/// - `POST /api/admin/vehicles` - Register a vehicle (starts `ACTIVE`)
/// - `GET /api/admin/vehicles/:id` - Get a vehicle
/// - `PUT /api/admin/vehicles/:id` - Update descriptive fields
/// - `DELETE /api/admin/vehicles/:id` - Delete a vehicle without trips
/// - `POST /api/admin/vehicles/:id/status` - Change status

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{concurrent_change, non_blank, ActionResponse, ListResponse, Pagination, StatusChangeRequest},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use fleetdesk_shared::{
    auth::{authorization::require_admin, session::Session},
    models::vehicle::{CreateVehicle, UpdateVehicle, Vehicle, VehicleStatus},
    status::StatusMachine,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// `?status=` filter
#[derive(Debug, Default, Deserialize)]
pub struct VehicleQuery {
    pub status: Option<VehicleStatus>,
}

/// Create vehicle request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 32, message = "Plate number must be 1-32 characters"))]
    pub plate_number: String,

    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: String,

    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: String,

    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: Option<i32>,

    #[validate(range(exclusive_min = 0.0, message = "Capacity must be positive"))]
    pub capacity_kg: Option<f64>,
}

/// Update vehicle request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 32, message = "Plate number must be 1-32 characters"))]
    pub plate_number: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Make must be 1-100 characters"))]
    pub make: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Model must be 1-100 characters"))]
    pub model: Option<String>,

    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: Option<i32>,

    #[validate(range(exclusive_min = 0.0, message = "Capacity must be positive"))]
    pub capacity_kg: Option<f64>,
}

/// Plate numbers are stored trimmed and uppercase
fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

async fn find_vehicle(state: &AppState, id: Uuid) -> ApiResult<Vehicle> {
    Vehicle::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))
}

/// Lists vehicles by plate number
pub async fn list_vehicles(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<VehicleQuery>,
) -> ApiResult<Json<ListResponse<Vehicle>>> {
    require_admin(&session)?;

    let vehicles = Vehicle::list(&state.db, query.status, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(vehicles, page))
}

/// Gets one vehicle
pub async fn get_vehicle(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vehicle>> {
    require_admin(&session)?;

    Ok(Json(find_vehicle(&state, id).await?))
}

/// Registers a vehicle
///
/// # Errors
///
/// - `409 Conflict`: Plate number already exists
pub async fn create_vehicle(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateVehicleRequest>,
) -> ApiResult<Json<ActionResponse<Vehicle>>> {
    require_admin(&session)?;
    req.validate()?;

    let vehicle = Vehicle::create(
        &state.db,
        CreateVehicle {
            plate_number: normalize_plate(&req.plate_number),
            make: req.make.trim().to_string(),
            model: req.model.trim().to_string(),
            year: req.year,
            capacity_kg: req.capacity_kg,
        },
    )
    .await?;

    tracing::info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "Vehicle created");

    Ok(ActionResponse::ok("Vehicle created", vehicle))
}

/// Updates a vehicle's descriptive fields
pub async fn update_vehicle(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVehicleRequest>,
) -> ApiResult<Json<ActionResponse<Vehicle>>> {
    require_admin(&session)?;
    req.validate()?;

    let vehicle = Vehicle::update(
        &state.db,
        id,
        UpdateVehicle {
            plate_number: req.plate_number.as_deref().map(normalize_plate),
            make: non_blank(req.make),
            model: non_blank(req.model),
            year: req.year,
            capacity_kg: req.capacity_kg,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Vehicle not found".to_string()))?;

    tracing::info!(vehicle_id = %id, "Vehicle updated");

    Ok(ActionResponse::ok("Vehicle updated", vehicle))
}

/// Deletes a vehicle
///
/// # Errors
///
/// - `409 Conflict`: Trips still reference the vehicle
pub async fn delete_vehicle(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    if !Vehicle::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Vehicle not found".to_string()));
    }

    tracing::info!(vehicle_id = %id, "Vehicle deleted");

    Ok(ActionResponse::done("Vehicle deleted"))
}

/// Changes a vehicle's status
///
/// # Errors
///
/// - `409 Conflict`: Transition not allowed, or the status changed concurrently
pub async fn update_vehicle_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest<VehicleStatus>>,
) -> ApiResult<Json<ActionResponse<Vehicle>>> {
    require_admin(&session)?;

    let vehicle = find_vehicle(&state, id).await?;
    vehicle.status.check_transition(req.status)?;

    let updated = Vehicle::transition(&state.db, id, vehicle.status, req.status)
        .await?
        .ok_or_else(|| concurrent_change(vehicle.status))?;

    tracing::info!(
        vehicle_id = %id,
        from = vehicle.status.as_str(),
        to = req.status.as_str(),
        "Vehicle status changed"
    );

    Ok(ActionResponse::ok(
        format!("Vehicle is now {}", req.status.as_str()),
        updated,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("  ab-123-cd "), "AB-123-CD");
    }

    #[test]
    fn test_create_validation() {
        let req = CreateVehicleRequest {
            plate_number: "AB-123-CD".to_string(),
            make: "Volvo".to_string(),
            model: "FH16".to_string(),
            year: Some(1850),
            capacity_kg: Some(-1.0),
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("year"));
        assert!(fields.contains_key("capacity_kg"));
        assert!(!fields.contains_key("make"));
    }
}
