/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-up, sign-in, token refresh
/// - `onboarding`: Role selection for new accounts
/// - `account`: The caller's own account
/// - `pages`: Role dashboard shells and list pages
/// - `users`, `drivers`, `vehicles`, `trips`, `shipments`, `expenses`: entity management
/// - `uploads`: Signed image-host uploads
/// - `webhooks`: Identity-provider lifecycle events

pub mod account;
pub mod auth;
pub mod drivers;
pub mod expenses;
pub mod health;
pub mod onboarding;
pub mod pages;
pub mod shipments;
pub mod trips;
pub mod uploads;
pub mod users;
pub mod vehicles;
pub mod webhooks;

use axum::Json;
use fleetdesk_shared::{
    auth::session::Session,
    integrations::email::{dispatch_email, EmailMessage},
    models::user::User,
    status::StatusMachine,
};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Envelope returned by mutating actions
///
/// ```json
/// { "success": true, "message": "Vehicle created", "data": { ... } }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResponse<T> {
    /// Successful action carrying `data`
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ActionResponse<()> {
    /// Successful action without a payload
    pub fn done(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Page size, clamped to `1..=100` (default 50)
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// One page of a list
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, page: Pagination) -> Json<Self> {
        Json(Self {
            items,
            limit: page.limit(),
            offset: page.offset(),
        })
    }
}

/// Status change request body shared by every transition action
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest<S> {
    pub status: S,
}

/// Loads the stored account behind a session
///
/// A valid token for a deleted account is rejected as unauthorized.
pub(crate) async fn current_user(state: &AppState, session: &Session) -> ApiResult<User> {
    User::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))
}

/// Error for a conditional status write that found the status already changed
pub(crate) fn concurrent_change<S: StatusMachine>(from: S) -> ApiError {
    ApiError::Conflict(format!(
        "{} is no longer {}; it was changed by another request",
        S::ENTITY,
        from.as_str()
    ))
}

/// Emails the recipient found by `lookup` after a write has persisted
///
/// A failed lookup is logged and dropped: the action already succeeded and
/// must still report success.
pub(crate) async fn notify<L>(
    state: &AppState,
    lookup: L,
    message: impl FnOnce(&str) -> EmailMessage,
) where
    L: Future<Output = Result<Option<String>, sqlx::Error>>,
{
    match lookup.await {
        Ok(Some(email)) => dispatch_email(state.email.clone(), message(&email)),
        Ok(None) => tracing::debug!("Notification skipped, recipient not found"),
        Err(e) => tracing::warn!(error = %e, "Notification skipped, recipient lookup failed"),
    }
}

/// Treats blank optional strings as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
