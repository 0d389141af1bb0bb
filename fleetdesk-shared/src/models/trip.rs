/// Trip model and database operations
///
/// A trip assigns one driver and one vehicle to a journey between two places.
///
/// # State Machine
///
/// ```text
/// PLANNED → ONGOING → COMPLETED
/// PLANNED → CANCELLED
/// ONGOING → CANCELLED
/// ```
///
/// `COMPLETED` and `CANCELLED` are terminal. Status writes are conditional on
/// the status that was read (`WHERE id = $1 AND status = $2`), so a concurrent
/// change makes the second writer fail instead of silently overwriting.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE trip_status AS ENUM ('PLANNED', 'ONGOING', 'COMPLETED', 'CANCELLED');
///
/// CREATE TABLE trips (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     driver_id UUID NOT NULL REFERENCES driver_profiles(id) ON DELETE RESTRICT,
///     vehicle_id UUID NOT NULL REFERENCES vehicles(id) ON DELETE RESTRICT,
///     origin VARCHAR(255) NOT NULL,
///     destination VARCHAR(255) NOT NULL,
///     scheduled_at TIMESTAMPTZ NOT NULL,
///     started_at TIMESTAMPTZ,
///     ended_at TIMESTAMPTZ,
///     distance_km DOUBLE PRECISION,
///     notes TEXT,
///     status trip_status NOT NULL DEFAULT 'PLANNED',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use fleetdesk_shared::models::trip::{Trip, TripStatus};
/// use fleetdesk_shared::status::StatusMachine;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, trip_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let trip = Trip::find_by_id(&pool, trip_id).await?.ok_or("missing")?;
/// trip.status.check_transition(TripStatus::Ongoing)?;
/// Trip::transition(&pool, trip.id, trip.status, TripStatus::Ongoing).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::status::StatusMachine;

/// Trip lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Scheduled, not started
    Planned,

    /// Driver is on the road
    Ongoing,

    /// Arrived
    Completed,

    /// Called off before completion
    Cancelled,
}

impl StatusMachine for TripStatus {
    const ENTITY: &'static str = "Trip";
    const ALL: &'static [Self] = &[
        TripStatus::Planned,
        TripStatus::Ongoing,
        TripStatus::Completed,
        TripStatus::Cancelled,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planned => "PLANNED",
            TripStatus::Ongoing => "ONGOING",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            TripStatus::Planned => &[TripStatus::Ongoing, TripStatus::Cancelled],
            TripStatus::Ongoing => &[TripStatus::Completed, TripStatus::Cancelled],
            TripStatus::Completed | TripStatus::Cancelled => &[],
        }
    }
}

impl TripStatus {
    /// Whether the trip's details (route, schedule, assignment) can still be edited
    pub fn is_editable(&self) -> bool {
        matches!(self, TripStatus::Planned)
    }

    /// Whether the trip can be deleted without losing operational history
    pub fn is_deletable(&self) -> bool {
        matches!(self, TripStatus::Planned | TripStatus::Cancelled)
    }
}

/// Trip
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trip {
    pub id: Uuid,

    /// Assigned driver profile
    pub driver_id: Uuid,

    /// Assigned vehicle
    pub vehicle_id: Uuid,

    pub origin: String,
    pub destination: String,
    pub scheduled_at: DateTime<Utc>,

    /// Set when the trip becomes ONGOING
    pub started_at: Option<DateTime<Utc>>,

    /// Set when the trip becomes COMPLETED or CANCELLED
    pub ended_at: Option<DateTime<Utc>>,

    pub distance_km: Option<f64>,
    pub notes: Option<String>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrip {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub scheduled_at: DateTime<Utc>,
    pub distance_km: Option<f64>,
    pub notes: Option<String>,
}

/// Input for updating a planned trip
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTrip {
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub distance_km: Option<f64>,
    pub notes: Option<String>,
}

/// Filter for trip listings
#[derive(Debug, Clone, Copy, Default)]
pub struct TripFilter {
    pub status: Option<TripStatus>,
    pub driver_id: Option<Uuid>,
}

/// Number of trips per status
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TripCounts {
    pub planned: i64,
    pub ongoing: i64,
    pub completed: i64,
    pub cancelled: i64,
}

const TRIP_COLUMNS: &str = "id, driver_id, vehicle_id, origin, destination, scheduled_at, \
                            started_at, ended_at, distance_km, notes, status, created_at, updated_at";

impl Trip {
    /// Creates a trip in `PLANNED` status
    pub async fn create(pool: &PgPool, data: CreateTrip) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO trips (driver_id, vehicle_id, origin, destination, scheduled_at, distance_km, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TRIP_COLUMNS
        );

        sqlx::query_as::<_, Trip>(&query)
            .bind(data.driver_id)
            .bind(data.vehicle_id)
            .bind(data.origin)
            .bind(data.destination)
            .bind(data.scheduled_at)
            .bind(data.distance_km)
            .bind(data.notes)
            .fetch_one(pool)
            .await
    }

    /// Finds a trip by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS);

        sqlx::query_as::<_, Trip>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a trip's details while it is still `PLANNED`
    ///
    /// Returns `None` if the trip does not exist or has left `PLANNED`.
    pub async fn update_planned(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTrip,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE trips \
             SET driver_id = COALESCE($2, driver_id), \
                 vehicle_id = COALESCE($3, vehicle_id), \
                 origin = COALESCE($4, origin), \
                 destination = COALESCE($5, destination), \
                 scheduled_at = COALESCE($6, scheduled_at), \
                 distance_km = COALESCE($7, distance_km), \
                 notes = COALESCE($8, notes), \
                 updated_at = NOW() \
             WHERE id = $1 AND status = 'PLANNED' RETURNING {}",
            TRIP_COLUMNS
        );

        sqlx::query_as::<_, Trip>(&query)
            .bind(id)
            .bind(data.driver_id)
            .bind(data.vehicle_id)
            .bind(data.origin)
            .bind(data.destination)
            .bind(data.scheduled_at)
            .bind(data.distance_km)
            .bind(data.notes)
            .fetch_optional(pool)
            .await
    }

    /// Moves the trip from `from` to `to`, stamping start/end times
    ///
    /// The caller validates the pair with [`StatusMachine::check_transition`]
    /// first. Returns `None` if the stored status is no longer `from`.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE trips \
             SET status = $3, \
                 started_at = CASE WHEN $3::trip_status = 'ONGOING' THEN NOW() ELSE started_at END, \
                 ended_at = CASE WHEN $3::trip_status IN ('COMPLETED', 'CANCELLED') THEN NOW() ELSE ended_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            TRIP_COLUMNS
        );

        sqlx::query_as::<_, Trip>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a trip
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists trips, latest schedule first
    pub async fn list(
        pool: &PgPool,
        filter: TripFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM trips \
             WHERE ($1::trip_status IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR driver_id = $2) \
             ORDER BY scheduled_at DESC LIMIT $3 OFFSET $4",
            TRIP_COLUMNS
        );

        sqlx::query_as::<_, Trip>(&query)
            .bind(filter.status)
            .bind(filter.driver_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Lists a driver's trips: active ones first, then by schedule
    pub async fn list_for_driver(pool: &PgPool, driver_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM trips WHERE driver_id = $1 \
             ORDER BY CASE status WHEN 'ONGOING' THEN 0 WHEN 'PLANNED' THEN 1 ELSE 2 END, \
                      scheduled_at DESC",
            TRIP_COLUMNS
        );

        sqlx::query_as::<_, Trip>(&query)
            .bind(driver_id)
            .fetch_all(pool)
            .await
    }

    /// Counts trips per status
    pub async fn count_by_status(pool: &PgPool) -> Result<TripCounts, sqlx::Error> {
        let rows: Vec<(TripStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM trips GROUP BY status")
                .fetch_all(pool)
                .await?;

        let mut counts = TripCounts::default();
        for (status, count) in rows {
            match status {
                TripStatus::Planned => counts.planned = count,
                TripStatus::Ongoing => counts.ongoing = count,
                TripStatus::Completed => counts.completed = count,
                TripStatus::Cancelled => counts.cancelled = count,
            }
        }

        Ok(counts)
    }
}
