/// Page routes
///
/// Pages are JSON payloads for a front end to render. Each role page wraps
/// its content in the caller's [`DashboardShell`]: a header plus the sidebar
/// links their role may follow.
///
/// # Routes
///
/// - `GET /sign-in?redirect_url=` - Sign-in form description
/// - `GET /onboarding` - Roles a new account may pick
/// - `GET /dashboard` - Redirects to the caller's role home
/// - `GET /admin/dashboard` - Counts across the fleet
/// - `GET /admin/{users,drivers,vehicles,trips,shipments,expenses}` - First page of each list
/// - `GET /driver/dashboard`, `GET /driver/trips` - The driver's trips
/// - `GET /client/dashboard`, `GET /client/shipments` - The client's shipments
///
/// The access gate has already sent callers with the wrong role elsewhere;
/// handlers still check the role before loading anything.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{current_user, Pagination},
};
use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use fleetdesk_shared::{
    auth::{authorization::require_role, session::Session},
    gate::ONBOARDING_PATH,
    models::{
        client::ClientProfile,
        driver::{DriverProfile, DriverSummary},
        expense::{Expense, ExpenseFilter},
        shipment::{Shipment, ShipmentCounts},
        trip::{Trip, TripCounts, TripFilter},
        user::{Role, User},
        vehicle::{Vehicle, VehicleCounts},
    },
    navigation::DashboardShell,
    status::StatusMachine,
};
use serde::{Deserialize, Serialize};

/// A role page: shell plus content
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub shell: DashboardShell,
    pub content: T,
}

/// `?redirect_url=` on the sign-in page
#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    pub redirect_url: Option<String>,
}

/// Sign-in page payload
#[derive(Debug, Serialize)]
pub struct SignInPage {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: &'static [&'static str],

    /// Where to go after signing in (same-site paths only)
    pub redirect_url: Option<String>,
}

/// Onboarding page payload
#[derive(Debug, Serialize)]
pub struct OnboardingPage {
    pub action: &'static str,
    pub roles: &'static [Role],
}

/// Admin overview
#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub users: i64,
    pub drivers: i64,
    pub vehicles: VehicleCounts,
    pub trips: TripCounts,
    pub shipments: ShipmentCounts,
    pub expense_total_cents: i64,
}

/// Driver overview
#[derive(Debug, Serialize)]
pub struct DriverOverview {
    pub profile: DriverProfile,

    /// `ONGOING` first, then `PLANNED`
    pub current_trips: Vec<Trip>,
}

/// Client overview
#[derive(Debug, Serialize)]
pub struct ClientOverview {
    pub profile: ClientProfile,

    /// Shipments not yet delivered or cancelled
    pub open_shipments: Vec<Shipment>,
}

/// Keeps only same-site paths, so the sign-in page cannot bounce users to
/// another host
fn local_redirect(value: Option<String>) -> Option<String> {
    value.filter(|url| {
        url.starts_with('/') && !matches!(url.as_bytes().get(1), Some(b'/' | b'\\'))
    })
}

/// Builds the shell for a caller who must hold `role`
async fn shell(
    state: &AppState,
    session: &Session,
    role: Role,
    title: &str,
) -> ApiResult<DashboardShell> {
    require_role(session, &[role])?;
    let user = current_user(state, session).await?;

    Ok(DashboardShell::new(role, title, &user))
}

async fn own_driver_profile(state: &AppState, session: &Session) -> ApiResult<DriverProfile> {
    DriverProfile::find_by_user_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Driver profile not found".to_string()))
}

async fn own_client_profile(state: &AppState, session: &Session) -> ApiResult<ClientProfile> {
    ClientProfile::find_by_user_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client profile not found".to_string()))
}

/// Describes how to sign in
pub async fn sign_in(Query(query): Query<SignInQuery>) -> Json<SignInPage> {
    Json(SignInPage {
        action: "/api/auth/sign-in",
        method: "POST",
        fields: &["email", "password"],
        redirect_url: local_redirect(query.redirect_url),
    })
}

/// Lists the roles a new account may choose
///
/// Only role-less sessions get here; the gate sends everyone else home.
pub async fn onboarding(_session: Session) -> Json<OnboardingPage> {
    Json(OnboardingPage {
        action: "/api/onboarding",
        roles: Role::SELF_SERVICE,
    })
}

/// Sends the caller to their role's home page
pub async fn dashboard(session: Session) -> Redirect {
    match session.role {
        Some(role) => Redirect::temporary(role.home_path()),
        None => Redirect::temporary(ONBOARDING_PATH),
    }
}

/// Fleet-wide counts
pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Page<AdminOverview>>> {
    let shell = shell(&state, &session, Role::Admin, "Overview").await?;

    let (users, drivers, vehicles, trips, shipments, expense_total_cents) = futures::try_join!(
        User::count(&state.db),
        DriverProfile::count(&state.db),
        Vehicle::count_by_status(&state.db),
        Trip::count_by_status(&state.db),
        Shipment::count_by_status(&state.db),
        Expense::total_cents(&state.db),
    )?;

    Ok(Json(Page {
        shell,
        content: AdminOverview {
            users,
            drivers,
            vehicles,
            trips,
            shipments,
            expense_total_cents,
        },
    }))
}

pub async fn admin_users(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<User>>>> {
    let shell = shell(&state, &session, Role::Admin, "Users").await?;
    let content = User::list(&state.db, None, page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

pub async fn admin_drivers(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<DriverSummary>>>> {
    let shell = shell(&state, &session, Role::Admin, "Drivers").await?;
    let content = DriverProfile::list(&state.db, None, page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

pub async fn admin_vehicles(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<Vehicle>>>> {
    let shell = shell(&state, &session, Role::Admin, "Vehicles").await?;
    let content = Vehicle::list(&state.db, None, page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

pub async fn admin_trips(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<Trip>>>> {
    let shell = shell(&state, &session, Role::Admin, "Trips").await?;
    let content =
        Trip::list(&state.db, TripFilter::default(), page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

pub async fn admin_shipments(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<Shipment>>>> {
    let shell = shell(&state, &session, Role::Admin, "Shipments").await?;
    let content = Shipment::list(&state.db, None, page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

pub async fn admin_expenses(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Page<Vec<Expense>>>> {
    let shell = shell(&state, &session, Role::Admin, "Expenses").await?;
    let content =
        Expense::list(&state.db, ExpenseFilter::default(), page.limit(), page.offset()).await?;

    Ok(Json(Page { shell, content }))
}

/// The driver's profile and unfinished trips
pub async fn driver_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Page<DriverOverview>>> {
    let shell = shell(&state, &session, Role::Driver, "Overview").await?;
    let profile = own_driver_profile(&state, &session).await?;

    let current_trips = Trip::list_for_driver(&state.db, profile.id)
        .await?
        .into_iter()
        .filter(|trip| !trip.status.is_terminal())
        .collect();

    Ok(Json(Page {
        shell,
        content: DriverOverview {
            profile,
            current_trips,
        },
    }))
}

/// Every trip assigned to the driver
pub async fn driver_trips(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Page<Vec<Trip>>>> {
    let shell = shell(&state, &session, Role::Driver, "My Trips").await?;
    let profile = own_driver_profile(&state, &session).await?;
    let content = Trip::list_for_driver(&state.db, profile.id).await?;

    Ok(Json(Page { shell, content }))
}

/// The client's profile and open shipments
pub async fn client_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Page<ClientOverview>>> {
    let shell = shell(&state, &session, Role::Client, "Overview").await?;
    let profile = own_client_profile(&state, &session).await?;

    let open_shipments = Shipment::list_for_client(&state.db, profile.id)
        .await?
        .into_iter()
        .filter(|shipment| !shipment.status.is_terminal())
        .collect();

    Ok(Json(Page {
        shell,
        content: ClientOverview {
            profile,
            open_shipments,
        },
    }))
}

/// Every shipment the client owns
pub async fn client_shipments(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Page<Vec<Shipment>>>> {
    let shell = shell(&state, &session, Role::Client, "My Shipments").await?;
    let profile = own_client_profile(&state, &session).await?;
    let content = Shipment::list_for_client(&state.db, profile.id).await?;

    Ok(Json(Page { shell, content }))
}
