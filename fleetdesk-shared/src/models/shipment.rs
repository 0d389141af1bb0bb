/// Shipment model and database operations
///
/// Shipments belong to a client and may ride on a trip. Clients look them up
/// by tracking number.
///
/// # State Machine
///
/// ```text
/// PENDING → IN_TRANSIT → DELIVERED
/// PENDING → CANCELLED
/// IN_TRANSIT → CANCELLED
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE shipment_status AS ENUM ('PENDING', 'IN_TRANSIT', 'DELIVERED', 'CANCELLED');
///
/// CREATE TABLE shipments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tracking_number VARCHAR(32) NOT NULL UNIQUE,
///     client_id UUID NOT NULL REFERENCES client_profiles(id) ON DELETE CASCADE,
///     trip_id UUID REFERENCES trips(id) ON DELETE SET NULL,
///     description TEXT NOT NULL,
///     weight_kg DOUBLE PRECISION,
///     origin VARCHAR(255) NOT NULL,
///     destination VARCHAR(255) NOT NULL,
///     status shipment_status NOT NULL DEFAULT 'PENDING',
///     delivered_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::status::StatusMachine;

/// Tracking number prefix
pub const TRACKING_PREFIX: &str = "SHP-";

/// Random characters after the prefix
const TRACKING_SUFFIX_LEN: usize = 10;

/// Shipment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl StatusMachine for ShipmentStatus {
    const ENTITY: &'static str = "Shipment";
    const ALL: &'static [Self] = &[
        ShipmentStatus::Pending,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Cancelled,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "PENDING",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            ShipmentStatus::Pending => &[ShipmentStatus::InTransit, ShipmentStatus::Cancelled],
            ShipmentStatus::InTransit => &[ShipmentStatus::Delivered, ShipmentStatus::Cancelled],
            ShipmentStatus::Delivered | ShipmentStatus::Cancelled => &[],
        }
    }
}

/// Shipment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shipment {
    pub id: Uuid,
    pub tracking_number: String,

    /// Owning client profile
    pub client_id: Uuid,

    /// Trip carrying the shipment, once assigned
    pub trip_id: Option<Uuid>,

    pub description: String,
    pub weight_kg: Option<f64>,
    pub origin: String,
    pub destination: String,
    pub status: ShipmentStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a shipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShipment {
    pub client_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub description: String,
    pub weight_kg: Option<f64>,
    pub origin: String,
    pub destination: String,
}

/// Input for updating a shipment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateShipment {
    /// New trip assignment (use Some(None) to unassign)
    pub trip_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// Number of shipments per status
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShipmentCounts {
    pub pending: i64,
    pub in_transit: i64,
    pub delivered: i64,
    pub cancelled: i64,
}

/// Generates a tracking number like `SHP-7KQ2M9XA1B`
pub fn generate_tracking_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRACKING_SUFFIX_LEN)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();

    format!("{}{}", TRACKING_PREFIX, suffix)
}

/// Checks the shape of a tracking number before hitting the database
pub fn is_valid_tracking_number(value: &str) -> bool {
    value
        .strip_prefix(TRACKING_PREFIX)
        .map(|suffix| {
            suffix.len() == TRACKING_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        })
        .unwrap_or(false)
}

const SHIPMENT_COLUMNS: &str = "id, tracking_number, client_id, trip_id, description, weight_kg, \
                                origin, destination, status, delivered_at, created_at, updated_at";

impl Shipment {
    /// Creates a shipment in `PENDING` status with a fresh tracking number
    pub async fn create(pool: &PgPool, data: CreateShipment) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO shipments (tracking_number, client_id, trip_id, description, weight_kg, origin, destination) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(generate_tracking_number())
            .bind(data.client_id)
            .bind(data.trip_id)
            .bind(data.description)
            .bind(data.weight_kg)
            .bind(data.origin)
            .bind(data.destination)
            .fetch_one(pool)
            .await
    }

    /// Finds a shipment by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM shipments WHERE id = $1", SHIPMENT_COLUMNS);

        sqlx::query_as::<_, Shipment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a shipment by tracking number, scoped to a client
    pub async fn find_by_tracking_number_and_client(
        pool: &PgPool,
        tracking_number: &str,
        client_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM shipments WHERE tracking_number = $1 AND client_id = $2",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(tracking_number)
            .bind(client_id)
            .fetch_optional(pool)
            .await
    }

    /// Updates descriptive fields and trip assignment
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateShipment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (set_trip, trip_id) = match data.trip_id {
            Some(trip_id) => (true, trip_id),
            None => (false, None),
        };

        let query = format!(
            "UPDATE shipments \
             SET trip_id = CASE WHEN $2 THEN $3 ELSE trip_id END, \
                 description = COALESCE($4, description), \
                 weight_kg = COALESCE($5, weight_kg), \
                 origin = COALESCE($6, origin), \
                 destination = COALESCE($7, destination), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(id)
            .bind(set_trip)
            .bind(trip_id)
            .bind(data.description)
            .bind(data.weight_kg)
            .bind(data.origin)
            .bind(data.destination)
            .fetch_optional(pool)
            .await
    }

    /// Moves the shipment from `from` to `to`, stamping delivery time
    ///
    /// Returns `None` if the stored status is no longer `from`.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE shipments \
             SET status = $3, \
                 delivered_at = CASE WHEN $3::shipment_status = 'DELIVERED' THEN NOW() ELSE delivered_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a shipment
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shipments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists shipments, newest first, optionally by status
    pub async fn list(
        pool: &PgPool,
        status: Option<ShipmentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM shipments \
             WHERE ($1::shipment_status IS NULL OR status = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Lists a client's shipments, newest first
    pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM shipments WHERE client_id = $1 ORDER BY created_at DESC",
            SHIPMENT_COLUMNS
        );

        sqlx::query_as::<_, Shipment>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }

    /// Counts shipments per status
    pub async fn count_by_status(pool: &PgPool) -> Result<ShipmentCounts, sqlx::Error> {
        let rows: Vec<(ShipmentStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM shipments GROUP BY status")
                .fetch_all(pool)
                .await?;

        let mut counts = ShipmentCounts::default();
        for (status, count) in rows {
            match status {
                ShipmentStatus::Pending => counts.pending = count,
                ShipmentStatus::InTransit => counts.in_transit = count,
                ShipmentStatus::Delivered => counts.delivered = count,
                ShipmentStatus::Cancelled => counts.cancelled = count,
            }
        }

        Ok(counts)
    }
}
