/// Vehicle model and database operations
///
/// # State Machine
///
/// ```text
/// ACTIVE ⇄ IN_MAINTENANCE
/// ACTIVE         → INACTIVE
/// IN_MAINTENANCE → INACTIVE
/// ```
///
/// Only `ACTIVE` vehicles can be assigned to new trips.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE vehicle_status AS ENUM ('ACTIVE', 'IN_MAINTENANCE', 'INACTIVE');
///
/// CREATE TABLE vehicles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     plate_number VARCHAR(32) NOT NULL UNIQUE,
///     make VARCHAR(100) NOT NULL,
///     model VARCHAR(100) NOT NULL,
///     year INTEGER,
///     capacity_kg DOUBLE PRECISION,
///     status vehicle_status NOT NULL DEFAULT 'ACTIVE',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::status::StatusMachine;

/// Vehicle operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vehicle_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    /// In service
    Active,

    /// Temporarily out of service
    InMaintenance,

    /// Retired
    Inactive,
}

impl StatusMachine for VehicleStatus {
    const ENTITY: &'static str = "Vehicle";
    const ALL: &'static [Self] = &[
        VehicleStatus::Active,
        VehicleStatus::InMaintenance,
        VehicleStatus::Inactive,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::InMaintenance => "IN_MAINTENANCE",
            VehicleStatus::Inactive => "INACTIVE",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            VehicleStatus::Active => &[VehicleStatus::InMaintenance, VehicleStatus::Inactive],
            VehicleStatus::InMaintenance => &[VehicleStatus::Active, VehicleStatus::Inactive],
            VehicleStatus::Inactive => &[],
        }
    }
}

/// Vehicle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub capacity_kg: Option<f64>,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVehicle {
    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub capacity_kg: Option<f64>,
}

/// Input for updating a vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub plate_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub capacity_kg: Option<f64>,
}

/// Number of vehicles per status
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleCounts {
    pub active: i64,
    pub in_maintenance: i64,
    pub inactive: i64,
}

const VEHICLE_COLUMNS: &str =
    "id, plate_number, make, model, year, capacity_kg, status, created_at, updated_at";

impl Vehicle {
    /// Creates a vehicle in `ACTIVE` status
    pub async fn create(pool: &PgPool, data: CreateVehicle) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO vehicles (plate_number, make, model, year, capacity_kg) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            VEHICLE_COLUMNS
        );

        sqlx::query_as::<_, Vehicle>(&query)
            .bind(data.plate_number)
            .bind(data.make)
            .bind(data.model)
            .bind(data.year)
            .bind(data.capacity_kg)
            .fetch_one(pool)
            .await
    }

    /// Finds a vehicle by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS);

        sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates descriptive fields; status changes go through [`Vehicle::transition`]
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateVehicle,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE vehicles \
             SET plate_number = COALESCE($2, plate_number), \
                 make = COALESCE($3, make), \
                 model = COALESCE($4, model), \
                 year = COALESCE($5, year), \
                 capacity_kg = COALESCE($6, capacity_kg), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            VEHICLE_COLUMNS
        );

        sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .bind(data.plate_number)
            .bind(data.make)
            .bind(data.model)
            .bind(data.year)
            .bind(data.capacity_kg)
            .fetch_optional(pool)
            .await
    }

    /// Moves the vehicle from `from` to `to`
    ///
    /// Returns `None` if the stored status is no longer `from`.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: VehicleStatus,
        to: VehicleStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE vehicles SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            VEHICLE_COLUMNS
        );

        sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a vehicle
    ///
    /// Fails with a foreign-key violation while trips still reference it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists vehicles by plate number, optionally filtered by status
    pub async fn list(
        pool: &PgPool,
        status: Option<VehicleStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM vehicles \
             WHERE ($1::vehicle_status IS NULL OR status = $1) \
             ORDER BY plate_number LIMIT $2 OFFSET $3",
            VEHICLE_COLUMNS
        );

        sqlx::query_as::<_, Vehicle>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counts vehicles per status
    pub async fn count_by_status(pool: &PgPool) -> Result<VehicleCounts, sqlx::Error> {
        let rows: Vec<(VehicleStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM vehicles GROUP BY status")
                .fetch_all(pool)
                .await?;

        let mut counts = VehicleCounts::default();
        for (status, count) in rows {
            match status {
                VehicleStatus::Active => counts.active = count,
                VehicleStatus::InMaintenance => counts.in_maintenance = count,
                VehicleStatus::Inactive => counts.inactive = count,
            }
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_status_transitions() {
        assert!(VehicleStatus::Active.can_transition_to(VehicleStatus::InMaintenance));
        assert!(VehicleStatus::InMaintenance.can_transition_to(VehicleStatus::Active));
        assert!(VehicleStatus::Active.can_transition_to(VehicleStatus::Inactive));
        assert!(VehicleStatus::InMaintenance.can_transition_to(VehicleStatus::Inactive));

        // Retired vehicles stay retired
        assert!(VehicleStatus::Inactive.is_terminal());
        assert!(!VehicleStatus::Inactive.can_transition_to(VehicleStatus::Active));
    }

    #[test]
    fn test_vehicle_status_as_str() {
        assert_eq!(VehicleStatus::Active.as_str(), "ACTIVE");
        assert_eq!(VehicleStatus::InMaintenance.as_str(), "IN_MAINTENANCE");
        assert_eq!(VehicleStatus::Inactive.as_str(), "INACTIVE");
    }

    #[test]
    fn test_vehicle_status_serde_matches_as_str() {
        for status in VehicleStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
