//! Expenses feeding the financial summary.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use aquaroute_core::{Action, Expense, Resource};
use aquaroute_db::NewExpense;

use crate::error::ApiResult;
use crate::extract::CurrentActor;
use crate::handlers::DateRange;
use crate::state::AppState;

pub async fn list_expenses(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<Vec<Expense>>> {
    actor.ensure(Action::Read, Resource::Finance)?;

    let range = range.checked()?;
    Ok(Json(
        state
            .db
            .expenses()
            .list_between(range.from, range.to)
            .await?,
    ))
}

pub async fn record_expense(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<NewExpense>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    actor.ensure(Action::Create, Resource::Finance)?;

    let expense = state.db.expenses().record(input, &actor.id).await?;
    info!(
        category = %expense.category,
        amount = %expense.amount,
        actor = %actor.id,
        "Expense recorded"
    );
    Ok((StatusCode::CREATED, Json(expense)))
}
