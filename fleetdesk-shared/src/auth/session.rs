/// Session resolution for incoming requests
///
/// A session is read from an HS256 access token, taken from the
/// `Authorization: Bearer <token>` header or, failing that, the `__session`
/// cookie. Anything that does not validate as an access token (garbage,
/// expired, refresh token, wrong issuer) resolves to "no session": the access
/// gate then treats the caller as signed out.
///
/// The access gate middleware stores the resolved [`Session`] in request
/// extensions; handlers take it as an extractor argument.
///
/// # Example
///
/// ```no_run
/// use fleetdesk_shared::auth::session::Session;
///
/// async fn whoami(session: Session) -> String {
///     format!("user {} ({:?})", session.user_id, session.role)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims};
use crate::models::user::Role;

/// Name of the cookie carrying the access token for page requests
pub const SESSION_COOKIE: &str = "__session";

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,

    /// `None` until onboarding completes
    pub role: Option<Role>,

    pub must_change_password: bool,
}

impl Session {
    /// Whether the caller holds one of `roles`
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.map_or(false, |role| roles.contains(&role))
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            must_change_password: claims.must_change_password,
        }
    }
}

/// Extracts the raw token from the Authorization header or the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| session_cookie(headers))
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Resolves the caller's session from request headers
///
/// Returns `None` when no token is present or the token is not a valid access
/// token.
pub fn resolve_session(headers: &HeaderMap, secret: &str) -> Option<Session> {
    let token = extract_token(headers)?;

    match validate_access_token(token, secret) {
        Ok(claims) => Some(claims.into()),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            None
        }
    }
}

/// Rejection when a handler needs a session that the request does not carry
#[derive(Debug)]
pub struct MissingSession;

impl IntoResponse for MissingSession {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": "unauthorized",
            "message": "Sign in to continue",
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(MissingSession)
    }
}
