/// Error handling for the API server
///
/// Every handler returns [`ApiResult<T>`]. [`ApiError`] maps to an HTTP status
/// and the failure envelope:
///
/// ```json
/// { "success": false, "error": "invalid_transition", "message": "Trip is COMPLETED and can no longer change status" }
/// ```
///
/// Library errors from `fleetdesk-shared` convert with `?`. Internal and
/// database details are logged, never returned.
///
/// # Example
///
/// ```no_run
/// use fleetdesk_api::error::{ApiError, ApiResult};
/// use axum::Json;
///
/// async fn handler(found: bool) -> ApiResult<Json<&'static str>> {
///     if !found {
///         return Err(ApiError::NotFound("Vehicle not found".to_string()));
///     }
///     Ok(Json("ok"))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleetdesk_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, password::PasswordError},
    integrations::{email::EmailError, uploads::UploadError, webhook::WebhookError},
    status::TransitionError,
};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. duplicate plate number or concurrent status change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status change not in the transition table (409)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Unprocessable entity (422)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Service unavailable (503), e.g. uploads not configured
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Error code (e.g. "forbidden", "invalid_transition")
    pub error: String,

    /// Human-readable message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "invalid_transition", msg, None)
            }
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Postgres SQLSTATE for unique violations
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign-key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or_default().to_string();

                match db_err.code().as_deref() {
                    Some(UNIQUE_VIOLATION) if constraint.contains("email") => {
                        ApiError::Conflict("Email already exists".to_string())
                    }
                    Some(UNIQUE_VIOLATION) if constraint.contains("plate_number") => {
                        ApiError::Conflict("Plate number already exists".to_string())
                    }
                    Some(UNIQUE_VIOLATION) => {
                        ApiError::Conflict(format!("Duplicate value ({})", constraint))
                    }
                    Some(FOREIGN_KEY_VIOLATION) => ApiError::Conflict(format!(
                        "Record is referenced by or references another record ({})",
                        constraint
                    )),
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::InvalidTransition(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::invalid_field("folder", err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidPayload(_) => ApiError::BadRequest(err.to_string()),
            WebhookError::InvalidSecret => ApiError::InternalError(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdesk_shared::models::trip::TripStatus;
    use fleetdesk_shared::models::user::Role;
    use fleetdesk_shared::status::StatusMachine;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 2, message = "Too short"))]
        name: String,
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::invalid_field("email", "taken");
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
    }

    #[tokio::test]
    async fn test_failure_envelope() {
        let (status, body) = body_json(ApiError::Forbidden("nope".to_string())).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["message"], "nope");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_transition_error_maps_to_conflict() {
        let err: ApiError = TripStatus::Completed
            .check_transition(TripStatus::Ongoing)
            .unwrap_err()
            .into();
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_transition");
        assert!(body["message"].as_str().unwrap().contains("COMPLETED"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) =
            body_json(ApiError::InternalError("password=hunter2".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("hunter2"));
    }

    #[test]
    fn test_authz_error_is_forbidden() {
        let err: ApiError = AuthzError::InsufficientRole {
            actual: Role::Client,
        }
        .into();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_row_not_found_is_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_validator_errors() {
        let sample = Sample {
            email: "not-an-email".to_string(),
            name: "x".to_string(),
        };

        let err: ApiError = sample.validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Invalid email format");
                assert_eq!(details[1].field, "name");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_webhook_errors() {
        let err: ApiError = WebhookError::InvalidSignature.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err: ApiError = WebhookError::TimestampOutOfTolerance.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
