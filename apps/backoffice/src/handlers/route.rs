//! # Delivery Route Handlers
//!
//! ```text
//!            ┌──────────── complete ──► Completed (bottles_lent += deliver − collect)
//!            │
//!  Pending ──┼──────────── cancel ────► Cancelled (stock returned)
//!            │
//!            └──────────── delete ────► gone      (stock returned)
//! ```
//!
//! Creation and edits go through the session handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use aquaroute_core::{Action, DeliveryRoute, Resource, RouteWithItems};

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentActor;
use crate::handlers::DateRange;
use crate::state::AppState;

/// Either `?date=` (one day's run sheet) or `?from=&to=`.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// One day's stops in sequence order, or every route in a date range.
pub async fn list_routes(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<RouteQuery>,
) -> ApiResult<Json<Vec<DeliveryRoute>>> {
    actor.ensure(Action::Read, Resource::Route)?;

    let routes = match query {
        RouteQuery {
            date: Some(date), ..
        } => state.db.routes().list_by_date(date).await?,
        RouteQuery {
            from: Some(from),
            to: Some(to),
            ..
        } => {
            let range = DateRange { from, to }.checked()?;
            state.db.routes().list_between(range.from, range.to).await?
        }
        _ => return Err(ApiError::validation("Pass either date or from and to")),
    };
    Ok(Json(routes))
}

pub async fn get_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<RouteWithItems>> {
    actor.ensure(Action::Read, Resource::Route)?;
    Ok(Json(state.db.routes().get(&id).await?))
}

/// Marks the stop delivered and moves the customer's bottle counter.
pub async fn complete_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveryRoute>> {
    actor.ensure(Action::Update, Resource::Route)?;
    Ok(Json(state.db.routes().complete(&id, &actor.id).await?))
}

pub async fn cancel_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveryRoute>> {
    actor.ensure(Action::Update, Resource::Route)?;
    Ok(Json(state.db.routes().cancel(&id, &actor.id).await?))
}

pub async fn delete_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    actor.ensure(Action::Delete, Resource::Route)?;

    state.db.routes().delete(&id, &actor.id).await?;
    info!(id = %id, actor = %actor.id, "Route deleted");
    Ok(StatusCode::NO_CONTENT)
}
