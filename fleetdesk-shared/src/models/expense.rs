/// Expense model and database operations
///
/// Expenses record money spent on a trip and/or a vehicle. Amounts are stored
/// in integer cents.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE expense_category AS ENUM ('FUEL', 'MAINTENANCE', 'TOLL', 'OTHER');
///
/// CREATE TABLE expenses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     trip_id UUID REFERENCES trips(id) ON DELETE SET NULL,
///     vehicle_id UUID REFERENCES vehicles(id) ON DELETE SET NULL,
///     category expense_category NOT NULL,
///     amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
///     description TEXT,
///     receipt_url VARCHAR(512),
///     incurred_on DATE NOT NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "expense_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Fuel,
    Maintenance,
    Toll,
    Other,
}

/// Expense
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub trip_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub description: Option<String>,

    /// Image-host URL of the uploaded receipt
    pub receipt_url: Option<String>,

    pub incurred_on: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpense {
    pub trip_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub incurred_on: NaiveDate,
    pub created_by: Option<Uuid>,
}

/// Input for updating an expense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpense {
    pub category: Option<ExpenseCategory>,
    pub amount_cents: Option<i64>,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub incurred_on: Option<NaiveDate>,
}

/// Filter for expense listings
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseFilter {
    pub trip_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

const EXPENSE_COLUMNS: &str = "id, trip_id, vehicle_id, category, amount_cents, description, \
                               receipt_url, incurred_on, created_by, created_at, updated_at";

impl Expense {
    /// Creates an expense
    pub async fn create(pool: &PgPool, data: CreateExpense) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO expenses (trip_id, vehicle_id, category, amount_cents, description, receipt_url, incurred_on, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            EXPENSE_COLUMNS
        );

        sqlx::query_as::<_, Expense>(&query)
            .bind(data.trip_id)
            .bind(data.vehicle_id)
            .bind(data.category)
            .bind(data.amount_cents)
            .bind(data.description)
            .bind(data.receipt_url)
            .bind(data.incurred_on)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds an expense by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM expenses WHERE id = $1", EXPENSE_COLUMNS);

        sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates an expense
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateExpense,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE expenses \
             SET category = COALESCE($2, category), \
                 amount_cents = COALESCE($3, amount_cents), \
                 description = COALESCE($4, description), \
                 receipt_url = COALESCE($5, receipt_url), \
                 incurred_on = COALESCE($6, incurred_on), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            EXPENSE_COLUMNS
        );

        sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .bind(data.category)
            .bind(data.amount_cents)
            .bind(data.description)
            .bind(data.receipt_url)
            .bind(data.incurred_on)
            .fetch_optional(pool)
            .await
    }

    /// Deletes an expense
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists expenses, most recent first
    pub async fn list(
        pool: &PgPool,
        filter: ExpenseFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM expenses \
             WHERE ($1::uuid IS NULL OR trip_id = $1) \
               AND ($2::uuid IS NULL OR vehicle_id = $2) \
             ORDER BY incurred_on DESC, created_at DESC LIMIT $3 OFFSET $4",
            EXPENSE_COLUMNS
        );

        sqlx::query_as::<_, Expense>(&query)
            .bind(filter.trip_id)
            .bind(filter.vehicle_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Sums all expenses, in cents
    pub async fn total_cents(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM expenses")
                .fetch_one(pool)
                .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_category_serde() {
        assert_eq!(
            serde_json::to_string(&ExpenseCategory::Maintenance).unwrap(),
            "\"MAINTENANCE\""
        );
        let category: ExpenseCategory = serde_json::from_str("\"TOLL\"").unwrap();
        assert_eq!(category, ExpenseCategory::Toll);
    }

    #[test]
    fn test_expense_filter_default() {
        let filter = ExpenseFilter::default();
        assert!(filter.trip_id.is_none());
        assert!(filter.vehicle_id.is_none());
    }
}
