/// User model and database operations
///
/// Every person who can sign in is a `User`. The `role` column drives the
/// access gate: it is `NULL` until the user completes onboarding (or until an
/// administrator assigns one), after which it is one of `admin`, `driver`,
/// `client`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'driver', 'client');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     role user_role,
///     password_hash VARCHAR(255),
///     must_change_password BOOLEAN NOT NULL DEFAULT FALSE,
///     external_id VARCHAR(255) UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX idx_users_email_lower ON users (LOWER(email));
/// ```
///
/// # Example
///
/// ```no_run
/// use fleetdesk_shared::models::user::{CreateUser, Role, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "dispatch@example.com".to_string(),
///     name: Some("Dispatch".to_string()),
///     role: Some(Role::Admin),
///     password_hash: Some("$argon2id$...".to_string()),
///     must_change_password: true,
///     external_id: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Application roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages every entity
    Admin,

    /// Drives assigned trips and advances their status
    Driver,

    /// Owns shipments and tracks them
    Client,
}

impl Role {
    /// All roles, for building "any role" access rules
    pub const ALL: &'static [Role] = &[Role::Admin, Role::Driver, Role::Client];

    /// Roles a user may pick for themselves during onboarding
    pub const SELF_SERVICE: &'static [Role] = &[Role::Driver, Role::Client];

    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Driver => "driver",
            Role::Client => "client",
        }
    }

    /// Landing page for this role
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Driver => "/driver/dashboard",
            Role::Client => "/client/dashboard",
        }
    }

    /// Whether a user can choose this role without an administrator
    pub fn is_self_service(&self) -> bool {
        Self::SELF_SERVICE.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model representing an account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (case-insensitive, unique)
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Role; `None` until onboarding completes
    pub role: Option<Role>,

    /// Argon2id password hash (`None` for identity-provider accounts)
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Set when an administrator issued a temporary password
    pub must_change_password: bool,

    /// Identity-provider user ID, for webhook synchronisation
    pub external_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<Role>,

    /// Argon2id hash (NOT plaintext)
    pub password_hash: Option<String>,

    pub must_change_password: bool,
    pub external_id: Option<String>,
}

/// Input for updating an existing user
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,

    /// New display name (use Some(None) to clear)
    pub name: Option<Option<String>>,

    pub role: Option<Role>,
}

const USER_COLUMNS: &str = "id, email, name, role, password_hash, must_change_password, \
                            external_id, created_at, updated_at, last_login_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email (or external ID) already exists or the
    /// database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        Self::create_with(pool, data).await
    }

    /// Creates a user on an existing connection or transaction
    pub async fn create_with<'c, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'c, Database = Postgres>,
    {
        let query = format!(
            "INSERT INTO users (email, name, role, password_hash, must_change_password, external_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.name)
            .bind(data.role)
            .bind(data.password_hash)
            .bind(data.must_change_password)
            .bind(data.external_id)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by identity-provider ID
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE external_id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always bumped.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        q.fetch_optional(pool).await
    }

    /// Assigns a role on an existing connection or transaction
    ///
    /// Only succeeds while the user has no role yet; returns `None` otherwise.
    pub async fn assign_initial_role<'c, E>(
        executor: E,
        id: Uuid,
        role: Role,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'c, Database = Postgres>,
    {
        let query = format!(
            "UPDATE users SET role = $2, updated_at = NOW() \
             WHERE id = $1 AND role IS NULL RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(role)
            .fetch_optional(executor)
            .await
    }

    /// Links an unlinked account to an identity-provider ID
    ///
    /// Returns `None` when the account is gone or already linked.
    pub async fn link_external_id(
        pool: &PgPool,
        id: Uuid,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET external_id = $2, updated_at = NOW() \
             WHERE id = $1 AND external_id IS NULL RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the password hash and clears the temporary-password flag
    pub async fn set_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                must_change_password = FALSE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the temporary-password flag
    pub async fn clear_password_flag(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET must_change_password = FALSE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user; driver/client profiles go with it (CASCADE)
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by identity-provider ID
    pub async fn delete_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = $1")
            .bind(external_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users, newest first, optionally filtered by role
    pub async fn list(
        pool: &PgPool,
        role: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users \
             WHERE ($1::user_role IS NULL OR role = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counts users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
