/// Client profile model and database operations
///
/// A client profile extends a `User` whose role is `client`. Shipments belong
/// to client profiles.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE client_profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     company_name VARCHAR(255),
///     phone VARCHAR(32),
///     address TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Client profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateClientProfile {
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

const CLIENT_COLUMNS: &str = "id, user_id, company_name, phone, address, created_at, updated_at";

impl ClientProfile {
    /// Creates a profile on an existing connection or transaction
    pub async fn create<'c, E>(executor: E, data: CreateClientProfile) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'c, Database = Postgres>,
    {
        let query = format!(
            "INSERT INTO client_profiles (user_id, company_name, phone, address) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            CLIENT_COLUMNS
        );

        sqlx::query_as::<_, ClientProfile>(&query)
            .bind(data.user_id)
            .bind(data.company_name)
            .bind(data.phone)
            .bind(data.address)
            .fetch_one(executor)
            .await
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM client_profiles WHERE id = $1", CLIENT_COLUMNS);

        sqlx::query_as::<_, ClientProfile>(&query)
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
            "SELECT {} FROM client_profiles WHERE user_id = $1",
            CLIENT_COLUMNS
        );

        sqlx::query_as::<_, ClientProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Email address of the user owning a client profile
    pub async fn contact_email(pool: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT u.email
            FROM client_profiles c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(email,)| email))
    }
}
