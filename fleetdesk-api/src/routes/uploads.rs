/// Signed image-host uploads
///
/// # Endpoints
///
/// - `POST /api/uploads/signature` - Sign an upload into an allowed folder
///
/// The browser uploads straight to the image host with the returned
/// parameters; files never pass through this service.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use chrono::Utc;
use fleetdesk_shared::{
    auth::{authorization::require_role, session::Session},
    integrations::uploads::SignedUpload,
    models::user::Role,
};
use serde::Deserialize;

/// Upload signature request
#[derive(Debug, Deserialize)]
pub struct SignUploadRequest {
    /// One of `receipts`, `vehicles`, `documents`
    pub folder: String,
}

/// Signs upload parameters for the caller
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin or driver
/// - `422 Unprocessable Entity`: Folder not allowed
/// - `503 Service Unavailable`: Image host not configured
pub async fn sign_upload(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SignUploadRequest>,
) -> ApiResult<Json<SignedUpload>> {
    require_role(&session, &[Role::Admin, Role::Driver])?;

    let signer = state.uploads.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Uploads are not configured".to_string())
    })?;

    let signed = signer.sign(req.folder.trim(), Utc::now().timestamp())?;

    tracing::debug!(user_id = %session.user_id, folder = %signed.folder, "Upload signed");

    Ok(Json(signed))
}
