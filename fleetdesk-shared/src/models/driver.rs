/// Driver profile model and database operations
///
/// A driver profile extends a `User` whose role is `driver` with licensing and
/// contact details and an availability status.
///
/// # State Machine
///
/// ```text
/// AVAILABLE ⇄ ON_LEAVE
/// AVAILABLE → INACTIVE
/// ON_LEAVE  → INACTIVE
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE driver_status AS ENUM ('AVAILABLE', 'ON_LEAVE', 'INACTIVE');
///
/// CREATE TABLE driver_profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     license_number VARCHAR(64) NOT NULL,
///     phone VARCHAR(32) NOT NULL,
///     status driver_status NOT NULL DEFAULT 'AVAILABLE',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::status::StatusMachine;

/// Driver availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "driver_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    /// Can be assigned trips
    Available,

    /// Temporarily unavailable
    OnLeave,

    /// No longer driving for the fleet
    Inactive,
}

impl StatusMachine for DriverStatus {
    const ENTITY: &'static str = "Driver";
    const ALL: &'static [Self] = &[
        DriverStatus::Available,
        DriverStatus::OnLeave,
        DriverStatus::Inactive,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Available => "AVAILABLE",
            DriverStatus::OnLeave => "ON_LEAVE",
            DriverStatus::Inactive => "INACTIVE",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            DriverStatus::Available => &[DriverStatus::OnLeave, DriverStatus::Inactive],
            DriverStatus::OnLeave => &[DriverStatus::Available, DriverStatus::Inactive],
            DriverStatus::Inactive => &[],
        }
    }
}

/// Driver profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverProfile {
    pub id: Uuid,

    /// Owning user account
    pub user_id: Uuid,

    pub license_number: String,
    pub phone: String,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Driver profile joined with its user's name and email, for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub license_number: String,
    pub phone: String,
    pub status: DriverStatus,
}

/// Input for creating a driver profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDriverProfile {
    pub user_id: Uuid,
    pub license_number: String,
    pub phone: String,
}

/// Input for updating a driver profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDriverProfile {
    pub license_number: Option<String>,
    pub phone: Option<String>,
}

const DRIVER_COLUMNS: &str = "id, user_id, license_number, phone, status, created_at, updated_at";

impl DriverProfile {
    /// Creates a profile on an existing connection or transaction
    pub async fn create<'c, E>(executor: E, data: CreateDriverProfile) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'c, Database = Postgres>,
    {
        let query = format!(
            "INSERT INTO driver_profiles (user_id, license_number, phone) \
             VALUES ($1, $2, $3) RETURNING {}",
            DRIVER_COLUMNS
        );

        sqlx::query_as::<_, DriverProfile>(&query)
            .bind(data.user_id)
            .bind(data.license_number)
            .bind(data.phone)
            .fetch_one(executor)
            .await
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM driver_profiles WHERE id = $1", DRIVER_COLUMNS);

        sqlx::query_as::<_, DriverProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the profile belonging to a user
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM driver_profiles WHERE user_id = $1",
            DRIVER_COLUMNS
        );

        sqlx::query_as::<_, DriverProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Updates licensing/contact details
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateDriverProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE driver_profiles \
             SET license_number = COALESCE($2, license_number), \
                 phone = COALESCE($3, phone), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            DRIVER_COLUMNS
        );

        sqlx::query_as::<_, DriverProfile>(&query)
            .bind(id)
            .bind(data.license_number)
            .bind(data.phone)
            .fetch_optional(pool)
            .await
    }

    /// Moves the profile from `from` to `to`
    ///
    /// Returns `None` if the stored status is no longer `from`.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: DriverStatus,
        to: DriverStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE driver_profiles SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {}",
            DRIVER_COLUMNS
        );

        sqlx::query_as::<_, DriverProfile>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Lists drivers with their account details, optionally by status
    pub async fn list(
        pool: &PgPool,
        status: Option<DriverStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DriverSummary>, sqlx::Error> {
        sqlx::query_as::<_, DriverSummary>(
            r#"
            SELECT d.id, d.user_id, u.name, u.email, d.license_number, d.phone, d.status
            FROM driver_profiles d
            JOIN users u ON u.id = d.user_id
            WHERE ($1::driver_status IS NULL OR d.status = $1)
            ORDER BY u.name NULLS LAST, u.email
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts driver profiles
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM driver_profiles")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_status_transitions() {
        assert!(DriverStatus::Available.can_transition_to(DriverStatus::OnLeave));
        assert!(DriverStatus::OnLeave.can_transition_to(DriverStatus::Available));
        assert!(DriverStatus::Available.can_transition_to(DriverStatus::Inactive));
        assert!(DriverStatus::OnLeave.can_transition_to(DriverStatus::Inactive));

        assert!(DriverStatus::Inactive.is_terminal());
        assert!(!DriverStatus::Inactive.can_transition_to(DriverStatus::Available));
    }

    #[test]
    fn test_driver_status_serde() {
        assert_eq!(
            serde_json::to_string(&DriverStatus::OnLeave).unwrap(),
            "\"ON_LEAVE\""
        );
    }
}
