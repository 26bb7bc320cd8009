//! Sales: lookup, cancel, settle payment. New sales and edits go through
//! the session handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use aquaroute_core::{Action, Order, OrderStatus, OrderWithItems, PaymentMethod, Resource};
use aquaroute_db::OrderFilter;

use crate::error::ApiResult;
use crate::extract::CurrentActor;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl From<OrderQuery> for OrderFilter {
    fn from(query: OrderQuery) -> Self {
        OrderFilter {
            customer_id: query.customer_id,
            status: query.status,
            from: query.from,
            to: query.to,
            limit: query.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub payment_method: PaymentMethod,
}

/// Newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    actor.ensure(Action::Read, Resource::Order)?;
    Ok(Json(state.db.orders().find(&query.into()).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderWithItems>> {
    actor.ensure(Action::Read, Resource::Order)?;
    Ok(Json(state.db.orders().get(&id).await?))
}

/// Cancels a confirmed order and returns its lines to stock.
pub async fn cancel_order(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    actor.ensure(Action::Update, Resource::Order)?;
    Ok(Json(state.db.orders().cancel(&id, &actor.id).await?))
}

/// Records how a pending sale was settled.
pub async fn set_payment(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<PaymentInput>,
) -> ApiResult<Json<Order>> {
    actor.ensure(Action::Update, Resource::Order)?;

    let order = state
        .db
        .orders()
        .set_payment(&id, input.payment_method)
        .await?;
    info!(
        order_number = %order.order_number,
        method = ?order.payment_method,
        actor = %actor.id,
        "Payment updated"
    );
    Ok(Json(order))
}
