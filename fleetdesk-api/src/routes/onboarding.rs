/// Role selection for new accounts
///
/// `POST /api/onboarding` lets a signed-in user without a role become a driver
/// or a client. The role and the matching profile are written in one
/// transaction; a user never ends up with a role and no profile. Administrators
/// are only created by other administrators.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::token_response, non_blank},
};
use axum::{extract::State, response::Response, Json};
use fleetdesk_shared::{
    auth::session::Session,
    models::{
        client::{ClientProfile, CreateClientProfile},
        driver::{CreateDriverProfile, DriverProfile},
        user::{Role, User},
    },
};
use serde::Deserialize;
use validator::Validate;

/// Onboarding request
///
/// Drivers must provide `license_number` and `phone`; client fields are all
/// optional.
#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    pub role: Role,

    #[validate(length(max = 50, message = "License number must be at most 50 characters"))]
    pub license_number: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Company name must be at most 200 characters"))]
    pub company_name: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
}

/// Profile to create for the chosen role
#[derive(Debug, PartialEq, Eq)]
enum NewProfile {
    Driver { license_number: String, phone: String },
    Client {
        company_name: Option<String>,
        phone: Option<String>,
        address: Option<String>,
    },
}

impl OnboardingRequest {
    fn into_profile(self) -> ApiResult<NewProfile> {
        match self.role {
            Role::Driver => {
                let license_number = non_blank(self.license_number).ok_or_else(|| {
                    ApiError::invalid_field("license_number", "License number is required")
                })?;
                let phone = non_blank(self.phone)
                    .ok_or_else(|| ApiError::invalid_field("phone", "Phone is required"))?;

                Ok(NewProfile::Driver {
                    license_number,
                    phone,
                })
            }
            Role::Client => Ok(NewProfile::Client {
                company_name: non_blank(self.company_name),
                phone: non_blank(self.phone),
                address: non_blank(self.address),
            }),
            Role::Admin => Err(ApiError::Forbidden(
                "The admin role cannot be self-selected".to_string(),
            )),
        }
    }
}

/// Assigns the caller's role and creates their profile
///
/// Returns fresh tokens carrying the new role.
///
/// # Errors
///
/// - `403 Forbidden`: `admin` requested
/// - `409 Conflict`: The caller already has a role
/// - `422 Unprocessable Entity`: Missing driver details
pub async fn complete_onboarding(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<OnboardingRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    if session.role.is_some() {
        return Err(ApiError::Conflict("Role already assigned".to_string()));
    }

    let role = req.role;
    let profile = req.into_profile()?;

    let mut tx = state.db.begin().await?;

    let user = User::assign_initial_role(&mut *tx, session.user_id, role)
        .await?
        .ok_or_else(|| ApiError::Conflict("Role already assigned".to_string()))?;

    match profile {
        NewProfile::Driver {
            license_number,
            phone,
        } => {
            DriverProfile::create(
                &mut *tx,
                CreateDriverProfile {
                    user_id: user.id,
                    license_number,
                    phone,
                },
            )
            .await?;
        }
        NewProfile::Client {
            company_name,
            phone,
            address,
        } => {
            ClientProfile::create(
                &mut *tx,
                CreateClientProfile {
                    user_id: user.id,
                    company_name,
                    phone,
                    address,
                },
            )
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(user_id = %user.id, role = %role, "Onboarding completed");

    token_response(&state, user, "Onboarding completed")
}
