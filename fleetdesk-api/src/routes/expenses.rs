/// Expense tracking (admin)
///
/// # Endpoints
///
/// - `GET /api/admin/expenses?trip_id=&vehicle_id=&limit=&offset=` - List expenses
/// - `POST /api/admin/expenses` - Record an expense
/// - `GET /api/admin/expenses/:id` - Get an expense
/// - `PUT /api/admin/expenses/:id` - Update an expense
/// - `DELETE /api/admin/expenses/:id` - Delete an expense
///
/// Amounts are integer cents and must be positive.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, ActionResponse, ListResponse, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use fleetdesk_shared::{
    auth::{authorization::require_admin, session::Session},
    models::{
        expense::{CreateExpense, Expense, ExpenseCategory, ExpenseFilter, UpdateExpense},
        trip::Trip,
        vehicle::Vehicle,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// `?trip_id=&vehicle_id=` filter
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub trip_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

/// Create expense request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    pub trip_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub category: ExpenseCategory,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount_cents: i64,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(url(message = "Receipt must be a URL"))]
    pub receipt_url: Option<String>,

    /// `YYYY-MM-DD`
    pub incurred_on: NaiveDate,
}

/// Update expense request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    pub category: Option<ExpenseCategory>,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount_cents: Option<i64>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(url(message = "Receipt must be a URL"))]
    pub receipt_url: Option<String>,

    pub incurred_on: Option<NaiveDate>,
}

async fn find_expense(state: &AppState, id: Uuid) -> ApiResult<Expense> {
    Expense::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))
}

/// Rejects references to trips or vehicles that do not exist
async fn check_references(
    state: &AppState,
    trip_id: Option<Uuid>,
    vehicle_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(trip_id) = trip_id {
        if Trip::find_by_id(&state.db, trip_id).await?.is_none() {
            return Err(ApiError::invalid_field("trip_id", "Trip not found"));
        }
    }

    if let Some(vehicle_id) = vehicle_id {
        if Vehicle::find_by_id(&state.db, vehicle_id).await?.is_none() {
            return Err(ApiError::invalid_field("vehicle_id", "Vehicle not found"));
        }
    }

    Ok(())
}

/// Lists expenses, most recent first
pub async fn list_expenses(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<Pagination>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Json<ListResponse<Expense>>> {
    require_admin(&session)?;

    let filter = ExpenseFilter {
        trip_id: query.trip_id,
        vehicle_id: query.vehicle_id,
    };
    let expenses = Expense::list(&state.db, filter, page.limit(), page.offset()).await?;

    Ok(ListResponse::new(expenses, page))
}

/// Gets one expense
pub async fn get_expense(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Expense>> {
    require_admin(&session)?;

    Ok(Json(find_expense(&state, id).await?))
}

/// Records an expense against a trip and/or vehicle
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Non-positive amount, or unknown trip or vehicle
pub async fn create_expense(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateExpenseRequest>,
) -> ApiResult<Json<ActionResponse<Expense>>> {
    require_admin(&session)?;
    req.validate()?;

    check_references(&state, req.trip_id, req.vehicle_id).await?;

    let expense = Expense::create(
        &state.db,
        CreateExpense {
            trip_id: req.trip_id,
            vehicle_id: req.vehicle_id,
            category: req.category,
            amount_cents: req.amount_cents,
            description: non_blank(req.description),
            receipt_url: non_blank(req.receipt_url),
            incurred_on: req.incurred_on,
            created_by: Some(session.user_id),
        },
    )
    .await?;

    tracing::info!(
        expense_id = %expense.id,
        amount_cents = expense.amount_cents,
        "Expense recorded"
    );

    Ok(ActionResponse::ok("Expense recorded", expense))
}

/// Updates an expense
pub async fn update_expense(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateExpenseRequest>,
) -> ApiResult<Json<ActionResponse<Expense>>> {
    require_admin(&session)?;
    req.validate()?;

    let expense = Expense::update(
        &state.db,
        id,
        UpdateExpense {
            category: req.category,
            amount_cents: req.amount_cents,
            description: non_blank(req.description),
            receipt_url: non_blank(req.receipt_url),
            incurred_on: req.incurred_on,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    tracing::info!(expense_id = %id, "Expense updated");

    Ok(ActionResponse::ok("Expense updated", expense))
}

/// Deletes an expense
pub async fn delete_expense(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionResponse<()>>> {
    require_admin(&session)?;

    if !Expense::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Expense not found".to_string()));
    }

    tracing::info!(expense_id = %id, "Expense deleted");

    Ok(ActionResponse::done("Expense deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"category":"FUEL","amount_cents":0,"incurred_on":"2026-03-14"}"#,
        )
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount_cents"));
    }

    #[test]
    fn test_request_parses_category_and_date() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"category":"TOLL","amount_cents":1250,"incurred_on":"2026-03-14",
                "receipt_url":"https://res.example.com/receipts/1.jpg"}"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.category, ExpenseCategory::Toll);
        assert_eq!(req.incurred_on, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn test_update_rejects_bad_receipt_url() {
        let req = UpdateExpenseRequest {
            category: None,
            amount_cents: Some(-5),
            description: None,
            receipt_url: Some("not a url".to_string()),
            incurred_on: None,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("amount_cents"));
        assert!(fields.contains_key("receipt_url"));
    }
}
