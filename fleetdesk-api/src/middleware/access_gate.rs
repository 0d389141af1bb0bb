/// Access gate middleware
///
/// Runs in front of every route. It resolves the caller's session from the
/// `Authorization: Bearer` header or the `__session` cookie, evaluates the
/// request path against the [`AccessTable`](fleetdesk_shared::gate::AccessTable)
/// in [`AppState`], and either:
///
/// - answers `307 Temporary Redirect` to sign-in, onboarding or the caller's
///   role home, or
/// - inserts the [`Session`] into request extensions (when there is one) and
///   calls the inner service.
///
/// Paths no rule matches pass through untouched.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use fleetdesk_shared::auth::session::{resolve_session, Session};

use crate::app::AppState;

/// Gate middleware, installed with `axum::middleware::from_fn_with_state`
pub async fn access_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session: Option<Session> = resolve_session(req.headers(), state.jwt_secret());
    let path = req.uri().path().to_string();

    let decision = state.access.evaluate(&path, session.as_ref());

    if let Some(location) = decision.location() {
        tracing::debug!(
            path = %path,
            user_id = ?session.as_ref().map(|s| s.user_id),
            location = %location,
            "Access gate redirect"
        );
        return Redirect::temporary(&location).into_response();
    }

    if let Some(session) = session {
        req.extensions_mut().insert(session);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use fleetdesk_shared::auth::jwt::{create_token, Claims, TokenType};
    use fleetdesk_shared::models::user::Role;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn whoami(session: Option<Session>) -> String {
        match session.and_then(|s| s.role) {
            Some(role) => role.to_string(),
            None => "anonymous".to_string(),
        }
    }

    fn app() -> (Router, Config) {
        let config = Config::for_tests("postgres://localhost/fleetdesk_test");
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        let state = AppState::new(pool, config.clone()).unwrap();

        let router = Router::new()
            .route("/admin/dashboard", get(whoami))
            .route("/public", get(whoami))
            .layer(axum::middleware::from_fn_with_state(state.clone(), access_gate))
            .with_state(state);

        (router, config)
    }

    fn token(config: &Config, role: Option<Role>) -> String {
        let claims = Claims::new(Uuid::new_v4(), role, false, TokenType::Access);
        create_token(&claims, &config.jwt.secret).unwrap()
    }

    async fn get_path(router: Router, path: &str, token: Option<&str>) -> (StatusCode, Option<String>, String) {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, location, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn test_redirects_use_307() {
        let (router, config) = app();
        let driver = token(&config, Some(Role::Driver));

        let (status, location, _) = get_path(router, "/admin/dashboard", Some(&driver)).await;

        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/driver/dashboard"));
    }

    #[tokio::test]
    async fn test_allowed_request_carries_session() {
        let (router, config) = app();
        let admin = token(&config, Some(Role::Admin));

        let (status, _, body) = get_path(router, "/admin/dashboard", Some(&admin)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn test_unmatched_path_passes_through() {
        let (router, config) = app();

        let (status, _, body) = get_path(router.clone(), "/public", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let client = token(&config, Some(Role::Client));
        let (_, _, body) = get_path(router, "/public", Some(&client)).await;
        assert_eq!(body, "client");
    }

    #[tokio::test]
    async fn test_invalid_token_is_treated_as_signed_out() {
        let (router, _) = app();

        let (status, location, _) =
            get_path(router, "/admin/dashboard", Some("not-a-token")).await;

        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location.as_deref(),
            Some("/sign-in?redirect_url=%2Fadmin%2Fdashboard")
        );
    }
}
