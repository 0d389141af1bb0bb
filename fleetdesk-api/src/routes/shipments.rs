/// Shipments
///
/// # Endpoints
///
/// Admin:
/// - `GET /api/admin/shipments?status=&limit=&offset=` - List shipments
/// - `POST /api/admin/shipments` - Create a shipment (tracking number generated)
/// - `GET /api/admin/shipments/:id` - Get a shipment
/// - `PUT /api/admin/shipments/:id` - Update details or trip assignment
/// - `DELETE /api/admin/shipments/:id` - Delete a `PENDING` or `CANCELLED` shipment
/// - `POST /api/admin/shipments/:id/status` - Change status (client is emailed)
///
/// Client:
/// - `GET /api/client/shipments` - The caller's shipments
/// - `GET /api/client/shipments/:tracking_number` - Track one of them

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
use fleetdesk_shared::{
    auth::{
        authorization::{require_admin, require_role},
        session::Session,
    },
    integrations::email::EmailMessage,
    models::{
        client::ClientProfile,
        shipment::{is_valid_tracking_number, CreateShipment, Shipment, ShipmentStatus, UpdateShipment},
        trip::Trip,
        user::Role,
    },
    status::StatusMachine,
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

/// `?status=` filter
#[derive(Debug, Default, Deserialize)]
pub struct ShipmentQuery {
    pub status: Option<ShipmentStatus>,
}

/// Create shipment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateShipmentRequest {
    /// Client profile ID
    pub client_id: Uuid,
    pub trip_id: Option<Uuid>,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,

    #[validate(range(exclusive_min = 0.0, message = "Weight must be positive"))]
    pub weight_kg: Option<f64>,

    #[validate(length(min = 1, max = 255, message = "Origin must be 1-255 characters"))]
    pub origin: String,

    #[validate(length(min = 1, max = 255, message = "Destination must be 1-255 characters"))]
    pub destination: String,
}

/// Update shipment request
///
/// `trip_id` distinguishes absent (keep) from `null` (unassign).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateShipmentRequest {
    #[serde(default, deserialize_with = "present")]
    pub trip_id: Option<Option<Uuid>>,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,

    #[validate(range(exclusive_min = 0.0, message = "Weight must be positive"))]
    pub weight_kg: Option<f64>,

    #[validate(length(min = 1, max = 255, message = "Origin must be 1-255 characters"))]
    pub origin: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Destination must be 1-255 characters"))]
    pub destination: Option<String>,
}

/// Marks a field that was present in the body, even as `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

async fn find_shipment(state: &AppState, id: Uuid) -> ApiResult<Shipment> {
    Shipment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shipment not found".to_string()))
}

async fn check_trip_exists(state: &AppState, trip_id: Uuid) -> ApiResult<()> {
    Trip::find_by_id(&state.db, trip_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::invalid_field("trip_id", "Trip not found"))
}

async fn own_client_profile(state: &AppState, session: &Session) -> ApiResult<ClientProfile> {
    require_role(session, &[Role::Client])?;

    ClientProfile::find_by_user_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client profile not found".to_string()))
}

/// Lists shipments, newest first
pub async fn list_shipments(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<ShipmentQuery>,
) -> ApiResult<Json<ListResponse<Shipment>>> {
    require_admin(&session)?;

    let shipments = Shipment::list(&state.db, query.status, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(shipments, page))
}

/// Gets one shipment
pub async fn get_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Shipment>> {
    require_admin(&session)?;

    Ok(Json(find_shipment(&state, id).await?))
}

/// Creates a shipment in `PENDING` status
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown client or trip, or invalid fields
pub async fn create_shipment(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateShipmentRequest>,
) -> ApiResult<Json<ActionResponse<Shipment>>> {
    require_admin(&session)?;
    req.validate()?;

    if ClientProfile::find_by_id(&state.db, req.client_id).await?.is_none() {
        return Err(ApiError::invalid_field("client_id", "Client not found"));
    }
    if let Some(trip_id) = req.trip_id {
        check_trip_exists(&state, trip_id).await?;
    }

    let shipment = Shipment::create(
        &state.db,
        CreateShipment {
            client_id: req.client_id,
            trip_id: req.trip_id,
            description: req.description.trim().to_string(),
            weight_kg: req.weight_kg,
            origin: req.origin.trim().to_string(),
            destination: req.destination.trim().to_string(),
        },
    )
    .await?;

    tracing::info!(
        shipment_id = %shipment.id,
        tracking_number = %shipment.tracking_number,
        "Shipment created"
    );

    Ok(ActionResponse::ok("Shipment created", shipment))
}

/// Updates a shipment that is still in progress
///
/// # Errors
///
/// - `409 Conflict`: The shipment is `DELIVERED` or `CANCELLED`
pub async fn update_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateShipmentRequest>,
) -> ApiResult<Json<ActionResponse<Shipment>>> {
    require_admin(&session)?;
    req.validate()?;

    let shipment = find_shipment(&state, id).await?;
    if shipment.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Shipment is {} and can no longer be edited",
            shipment.status.as_str()
        )));
    }

    if let Some(Some(trip_id)) = req.trip_id {
        check_trip_exists(&state, trip_id).await?;
    }

    let updated = Shipment::update(
        &state.db,
        id,
        UpdateShipment {
            trip_id: req.trip_id,
            description: non_blank(req.description),
            weight_kg: req.weight_kg,
            origin: non_blank(req.origin),
            destination: non_blank(req.destination),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Shipment not found".to_string()))?;

    tracing::info!(shipment_id = %id, "Shipment updated");

    Ok(ActionResponse::ok("Shipment updated", updated))
}

/// Deletes a shipment that never moved or was called off
pub async fn delete_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    let shipment = find_shipment(&state, id).await?;
    if !matches!(
        shipment.status,
        ShipmentStatus::Pending | ShipmentStatus::Cancelled
    ) {
        return Err(ApiError::Conflict(format!(
            "Shipment is {} and cannot be deleted",
            shipment.status.as_str()
        )));
    }

    Shipment::delete(&state.db, id).await?;

    tracing::info!(shipment_id = %id, "Shipment deleted");

    Ok(ActionResponse::done("Shipment deleted"))
}

/// Changes a shipment's status and emails the client
///
/// # Errors
///
/// - `409 Conflict`: Transition not allowed, or the status changed concurrently
pub async fn update_shipment_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest<ShipmentStatus>>,
) -> ApiResult<Json<ActionResponse<Shipment>>> {
    require_admin(&session)?;

    let shipment = find_shipment(&state, id).await?;
    shipment.status.check_transition(req.status)?;

    let updated = Shipment::transition(&state.db, id, shipment.status, req.status)
        .await?
        .ok_or_else(|| concurrent_change(shipment.status))?;

    tracing::info!(
        shipment_id = %id,
        from = shipment.status.as_str(),
        to = req.status.as_str(),
        "Shipment status changed"
    );

    notify(
        &state,
        ClientProfile::contact_email(&state.db, updated.client_id),
        |to| EmailMessage::shipment_status(to, &updated.tracking_number, req.status.as_str()),
    )
    .await;

    Ok(ActionResponse::ok(
        format!("Shipment is now {}", req.status.as_str()),
        updated,
    ))
}

/// The caller's shipments, newest first
pub async fn list_own_shipments(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Shipment>>> {
    let profile = own_client_profile(&state, &session).await?;

    Ok(Json(Shipment::list_for_client(&state.db, profile.id).await?))
}

/// Tracks one of the caller's shipments
///
/// Shipments owned by other clients are reported as not found.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tracking number or not the caller's shipment
/// - `422 Unprocessable Entity`: Malformed tracking number
pub async fn track_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(tracking_number): Path<String>,
) -> ApiResult<Json<Shipment>> {
    let profile = own_client_profile(&state, &session).await?;

    let tracking_number = tracking_number.trim().to_uppercase();
    if !is_valid_tracking_number(&tracking_number) {
        return Err(ApiError::invalid_field(
            "tracking_number",
            "Tracking numbers look like SHP-XXXXXXXXXX",
        ));
    }

    let shipment =
        Shipment::find_by_tracking_number_and_client(&state.db, &tracking_number, profile.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Shipment not found".to_string()))?;

    Ok(Json(shipment))
}
