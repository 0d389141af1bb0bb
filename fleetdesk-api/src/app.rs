/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use fleetdesk_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = fleetdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::access_gate::access_gate};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use fleetdesk_shared::{
    gate::AccessTable,
    integrations::{
        email::{EmailSender, HttpEmailSender, LogEmailSender},
        uploads::UploadSigner,
        webhook::WebhookVerifier,
    },
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Route access rules evaluated by the gate
    pub access: Arc<AccessTable>,

    /// Outgoing email
    pub email: Arc<dyn EmailSender>,

    /// Signs browser uploads; `None` when the image host is not configured
    pub uploads: Option<Arc<UploadSigner>>,

    /// Verifies identity-provider webhooks; `None` when no secret is configured
    pub webhooks: Option<Arc<WebhookVerifier>>,
}

impl AppState {
    /// Creates application state from configuration
    ///
    /// # Errors
    ///
    /// Fails if the access table, the email client or the webhook secret
    /// cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let email: Arc<dyn EmailSender> = match &config.email.api {
            Some((url, key)) => Arc::new(HttpEmailSender::new(url, key.clone(), config.email.from.clone())?),
            None => {
                tracing::warn!("EMAIL_API_URL not set, emails will only be logged");
                Arc::new(LogEmailSender::new(config.email.from.clone()))
            }
        };

        let uploads = config.uploads.as_ref().map(|uploads| {
            Arc::new(UploadSigner::new(
                uploads.cloud_name.clone(),
                uploads.api_key.clone(),
                uploads.api_secret.clone(),
            ))
        });

        let webhooks = config
            .identity
            .webhook_secret
            .as_deref()
            .map(WebhookVerifier::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            db,
            access: Arc::new(AccessTable::standard()?),
            config: Arc::new(config),
            email,
            uploads,
            webhooks,
        })
    }

    /// Replaces the email sender
    pub fn with_email_sender(mut self, email: Arc<dyn EmailSender>) -> Self {
        self.email = email;
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health                              public
/// /sign-in, /onboarding, /dashboard    pages
/// /admin/*, /driver/*, /client/*       role pages (JSON shells)
/// /api/auth/*                          sign-up, sign-in, refresh (public)
/// /api/onboarding                      role selection
/// /api/account/*                       any signed-in role
/// /api/admin/*                         entity management (admin)
/// /api/trips/:id/status                trip transitions (admin, driver)
/// /api/driver/*, /api/client/*         own trips / own shipments
/// /api/uploads/signature               signed uploads (admin, driver)
/// /api/webhooks/identity               identity-provider events (public, signed)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. Access gate (redirects or attaches the [`Session`](fleetdesk_shared::auth::session::Session))
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let page_routes = Router::new()
        .route("/sign-in", get(routes::pages::sign_in))
        .route("/onboarding", get(routes::pages::onboarding))
        .route("/dashboard", get(routes::pages::dashboard))
        .route("/admin/dashboard", get(routes::pages::admin_dashboard))
        .route("/admin/users", get(routes::pages::admin_users))
        .route("/admin/drivers", get(routes::pages::admin_drivers))
        .route("/admin/vehicles", get(routes::pages::admin_vehicles))
        .route("/admin/trips", get(routes::pages::admin_trips))
        .route("/admin/shipments", get(routes::pages::admin_shipments))
        .route("/admin/expenses", get(routes::pages::admin_expenses))
        .route("/driver/dashboard", get(routes::pages::driver_dashboard))
        .route("/driver/trips", get(routes::pages::driver_trips))
        .route("/client/dashboard", get(routes::pages::client_dashboard))
        .route("/client/shipments", get(routes::pages::client_shipments));

    let auth_routes = Router::new()
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-in", post(routes::auth::sign_in))
        .route("/refresh", post(routes::auth::refresh));

    let account_routes = Router::new()
        .route("/me", get(routes::account::me))
        .route("/password", post(routes::account::change_password))
        .route(
            "/password-flag/clear",
            post(routes::account::clear_password_flag),
        );

    let admin_routes = Router::new()
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/users/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/drivers",
            get(routes::drivers::list_drivers).post(routes::drivers::create_driver),
        )
        .route(
            "/drivers/:id",
            get(routes::drivers::get_driver)
                .put(routes::drivers::update_driver)
                .delete(routes::drivers::delete_driver),
        )
        .route(
            "/drivers/:id/status",
            post(routes::drivers::update_driver_status),
        )
        .route(
            "/vehicles",
            get(routes::vehicles::list_vehicles).post(routes::vehicles::create_vehicle),
        )
        .route(
            "/vehicles/:id",
            get(routes::vehicles::get_vehicle)
                .put(routes::vehicles::update_vehicle)
                .delete(routes::vehicles::delete_vehicle),
        )
        .route(
            "/vehicles/:id/status",
            post(routes::vehicles::update_vehicle_status),
        )
        .route(
            "/trips",
            get(routes::trips::list_trips).post(routes::trips::create_trip),
        )
        .route(
            "/trips/:id",
            get(routes::trips::get_trip)
                .put(routes::trips::update_trip)
                .delete(routes::trips::delete_trip),
        )
        .route(
            "/shipments",
            get(routes::shipments::list_shipments).post(routes::shipments::create_shipment),
        )
        .route(
            "/shipments/:id",
            get(routes::shipments::get_shipment)
                .put(routes::shipments::update_shipment)
                .delete(routes::shipments::delete_shipment),
        )
        .route(
            "/shipments/:id/status",
            post(routes::shipments::update_shipment_status),
        )
        .route(
            "/expenses",
            get(routes::expenses::list_expenses).post(routes::expenses::create_expense),
        )
        .route(
            "/expenses/:id",
            get(routes::expenses::get_expense)
                .put(routes::expenses::update_expense)
                .delete(routes::expenses::delete_expense),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/onboarding", post(routes::onboarding::complete_onboarding))
        .nest("/account", account_routes)
        .nest("/admin", admin_routes)
        .route("/trips/:id/status", post(routes::trips::update_trip_status))
        .route("/driver/trips", get(routes::trips::list_own_trips))
        .route("/client/shipments", get(routes::shipments::list_own_shipments))
        .route(
            "/client/shipments/:tracking_number",
            get(routes::shipments::track_shipment),
        )
        .route("/uploads/signature", post(routes::uploads::sign_upload))
        .route("/webhooks/identity", post(routes::webhooks::identity_webhook));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.is_empty() && !state.config.api.production {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(page_routes)
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            access_gate,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
