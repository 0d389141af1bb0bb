/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/sign-up` - Create an account (no role until onboarding)
/// - `POST /api/auth/sign-in` - Verify credentials and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for a new access token
///
/// Sign-up and sign-in also set the `__session` cookie so page routes behind
/// the access gate work from a browser.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, ActionResponse},
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use fleetdesk_shared::{
    auth::{
        jwt::{self, Claims, TokenPair, TokenType},
        password,
        session::SESSION_COOKIE,
    },
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength separately
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Tokens plus the account they were issued for
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,

    /// Where the client should go next
    pub redirect_to: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h) carrying the current role
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// `Set-Cookie` value carrying an access token
pub(crate) fn session_cookie(access_token: &str, expires_in: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, access_token, expires_in
    );

    if secure {
        cookie.push_str("; Secure");
    }

    cookie
}

/// Where a freshly authenticated user lands
pub(crate) fn landing_path(user: &User) -> String {
    match user.role {
        Some(role) => role.home_path().to_string(),
        None => fleetdesk_shared::gate::ONBOARDING_PATH.to_string(),
    }
}

/// Builds the token response with the session cookie attached
pub(crate) fn token_response(
    state: &AppState,
    user: User,
    message: &str,
) -> ApiResult<Response> {
    let tokens = jwt::issue_token_pair(&user, state.jwt_secret())?;
    let cookie = session_cookie(
        &tokens.access_token,
        tokens.expires_in,
        state.config.api.production,
    );

    let body = AuthResponse {
        redirect_to: landing_path(&user),
        user,
        tokens,
    };

    Ok(([(header::SET_COOKIE, cookie)], ActionResponse::ok(message, body)).into_response())
}

/// Creates an account
///
/// The account has no role; the gate sends it to `/onboarding` until the user
/// picks one.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or weak password
/// - `409 Conflict`: Email already exists
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            name: non_blank(req.name),
            role: None,
            password_hash: Some(password_hash),
            must_change_password: false,
            external_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Account created");

    token_response(&state, user, "Account created")
}

/// Verifies credentials and issues tokens
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email, wrong password, or an account without
///   a local password
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    if !password::verify_password(&req.password, hash)? {
        tracing::info!(user_id = %user.id, "Sign-in rejected");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "Signed in");

    token_response(&state, user, "Signed in")
}

/// Issues a new access token for a refresh token
///
/// The role and password flag are re-read from the database, so role changes
/// take effect at the next refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the account no
///   longer exists
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Response> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    let access = Claims::for_user(&user, TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;
    let expires_in = TokenType::Access.default_expiration().num_seconds();

    let cookie = session_cookie(&access_token, expires_in, state.config.api.production);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }),
    )
        .into_response())
}
