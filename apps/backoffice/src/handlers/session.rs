//! # Session Cart Handlers
//!
//! Builds a sale or route one click at a time, then hands the finished cart
//! to the finalizer.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/sessions/{id}/order                                          │
//! │                                                                         │
//! │  1. lock session (held until the end)                                  │
//! │  2. plan_order(customer, cart, method, channel, notes)                 │
//! │        └── MissingCustomer / EmptyCart ──► 400, cart kept              │
//! │  3. db.orders().finalize(&plan)   or   .edit(order_id, &plan)          │
//! │        └── InsufficientStock ──► 409, cart kept                        │
//! │  4. clear cart + customer, drop session                                │
//! │  5. 201 { order, items }                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is read before the session lock is taken, so the availability cap
//! applied while building is advisory. The finalizer checks again inside
//! its transaction.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use aquaroute_core::finalize::{plan_order, plan_route};
use aquaroute_core::{
    Action, BottleLedger, BottleSnapshot, CartBuilder, CartLine, CoreError, DeliveryStatus,
    OrderStatus, OrderWithItems, PaymentMethod, Resource, RouteDetails, RouteWithItems,
    SalesChannel,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentActor;
use crate::handlers::non_blank;
use crate::state::{AppState, EditTarget, SessionCart, SessionView, SharedSession};

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddLineInput {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuantityInput {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CustomerSelection {
    pub customer_id: String,
}

/// Route-form bottle figures. Omitted fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct BottleInput {
    pub to_collect: Option<i64>,
    pub to_deliver: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeOrderInput {
    pub payment_method: PaymentMethod,
    #[serde(default = "default_channel")]
    pub channel: SalesChannel,
    pub notes: Option<String>,
}

fn default_channel() -> SalesChannel {
    SalesChannel::InPerson
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRouteInput {
    pub payment_method: PaymentMethod,
    pub sequence: i64,
    pub delivery_date: NaiveDate,
    pub observation: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_session(state: &AppState, id: &str, actor: &CurrentActor) -> ApiResult<SharedSession> {
    state
        .sessions
        .get(id, &actor.id)
        .await
        .ok_or_else(|| ApiError::not_found("Session", id))
}

/// Merges stored lines into cart lines, keeping the captured prices.
async fn cart_from_items(
    state: &AppState,
    items: impl IntoIterator<Item = (String, i64, aquaroute_core::Money)>,
) -> ApiResult<(CartBuilder, HashMap<String, i64>)> {
    let mut lines: Vec<CartLine> = Vec::new();
    let mut held: HashMap<String, i64> = HashMap::new();

    for (product_id, quantity, unit_price) in items {
        *held.entry(product_id.clone()).or_insert(0) += quantity;
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += quantity;
            continue;
        }
        let product = state.db.products().get(&product_id).await?;
        lines.push(CartLine {
            product_id,
            code: product.code,
            name: product.name,
            unit_price,
            quantity,
            affects_bottle_deposit: product.affects_bottle_deposit,
        });
    }

    Ok((CartBuilder::from_lines(lines, state.config.tax_rate()), held))
}

// =============================================================================
// Session Lifecycle
// =============================================================================

/// Opens an empty cart for a new sale or route.
pub async fn create_session(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    actor.ensure(Action::Create, Resource::Order)?;

    let session = SessionCart::new(actor.id.clone(), state.config.tax_rate());
    let view = session.view();
    state.sessions.insert(session).await;

    debug!(session = %view.id, actor = %actor.id, "Session opened");
    Ok((StatusCode::CREATED, Json(view)))
}

/// Loads a confirmed order into a new session for editing.
pub async fn open_order_edit(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(order_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    actor.ensure(Action::Update, Resource::Order)?;

    let stored = state.db.orders().get(&order_id).await?;
    if stored.order.status != OrderStatus::Confirmed {
        return Err(CoreError::InvalidStatus {
            entity: "Order".to_string(),
            id: stored.order.order_number,
            status: format!("{:?}", stored.order.status).to_lowercase(),
            operation: "edit".to_string(),
        }
        .into());
    }

    let customer = state.db.customers().get(&stored.order.customer_id).await?;
    let (cart, held) = cart_from_items(
        &state,
        stored
            .items
            .into_iter()
            .map(|i| (i.product_id, i.quantity, i.unit_price)),
    )
    .await?;

    let mut session = SessionCart::new(actor.id.clone(), state.config.tax_rate());
    session.cart = cart;
    session.held = held;
    session.select_customer(customer);
    session.editing = Some(EditTarget::Order(order_id));

    let view = session.view();
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Loads a pending route into a new session for editing.
///
/// The bottle snapshot comes from the route, not from the customer's
/// current counters.
pub async fn open_route_edit(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(route_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    actor.ensure(Action::Update, Resource::Route)?;

    let stored = state.db.routes().get(&route_id).await?;
    let route = &stored.route;
    if route.delivery_status != DeliveryStatus::Pending {
        return Err(CoreError::InvalidStatus {
            entity: "Route".to_string(),
            id: route.route_number.clone(),
            status: format!("{:?}", route.delivery_status).to_lowercase(),
            operation: "edit".to_string(),
        }
        .into());
    }

    let customer = state.db.customers().get(&route.customer_id).await?;
    let ledger = BottleLedger {
        snapshot: BottleSnapshot {
            in_circulation: route.bottles_in_circulation,
            owned: route.bottles_owned,
        },
        to_deliver: route.bottles_to_deliver,
        to_collect: route.bottles_to_collect,
    };
    let (cart, held) = cart_from_items(
        &state,
        stored
            .items
            .iter()
            .map(|i| (i.product_id.clone(), i.quantity, i.unit_price))
            .collect::<Vec<_>>(),
    )
    .await?;

    let mut session = SessionCart::new(actor.id.clone(), state.config.tax_rate());
    session.cart = cart;
    session.held = held;
    session.customer = Some(customer);
    session.ledger = ledger;
    session.editing = Some(EditTarget::Route(route_id));

    let view = session.view();
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;
    let session = shared.lock().await;
    Ok(Json(session.view()))
}

/// Abandons the session. Nothing was written, so nothing is undone.
pub async fn discard_session(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    load_session(&state, &id, &actor).await?;
    state.sessions.remove(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cart Mutations
// =============================================================================

/// Adds one unit. Silently does nothing when no stock is left.
pub async fn add_line(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<AddLineInput>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;

    let product = state.db.products().get(&input.product_id).await?;
    if !product.is_active {
        return Err(ApiError::validation(format!(
            "Product {} is not active",
            product.code
        )));
    }
    let on_hand = state.db.inventory().on_hand(&product.id).await?;

    let mut session = shared.lock().await;
    let available = session.available(&product.id, on_hand);
    let change = session.cart.add_line(&product, available)?;
    if change.is_none() {
        debug!(code = %product.code, available, "No stock left to add");
    }
    session.record(change);

    Ok(Json(session.view()))
}

/// Sets a line's quantity, capped at available stock. Below 1 is ignored.
pub async fn set_line_quantity(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, product_id)): Path<(String, String)>,
    Json(input): Json<QuantityInput>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;
    let on_hand = state.db.inventory().on_hand(&product_id).await?;

    let mut session = shared.lock().await;
    let available = session.available(&product_id, on_hand);
    let change = session
        .cart
        .set_line_quantity(&product_id, input.quantity, available);
    session.record(change);

    Ok(Json(session.view()))
}

pub async fn remove_line(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, product_id)): Path<(String, String)>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;

    let mut session = shared.lock().await;
    let change = session.cart.remove_line(&product_id);
    session.record(change);

    Ok(Json(session.view()))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;

    let mut session = shared.lock().await;
    session.clear_lines();

    Ok(Json(session.view()))
}

/// Selects the customer and snapshots their bottle counters.
pub async fn select_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<CustomerSelection>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;
    let customer = state.db.customers().get(&input.customer_id).await?;

    let mut session = shared.lock().await;
    if session.editing.is_some() {
        return Err(ApiError::validation(
            "The customer of a saved order or route cannot be changed",
        ));
    }
    session.select_customer(customer);

    Ok(Json(session.view()))
}

/// Bottles to collect (and an optional override of bottles to deliver).
/// Negative values are clamped to 0.
pub async fn set_bottles(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<BottleInput>,
) -> ApiResult<Json<SessionView>> {
    let shared = load_session(&state, &id, &actor).await?;

    let mut session = shared.lock().await;
    if let Some(collect) = input.to_collect {
        session.ledger.set_to_collect(collect);
    }
    if let Some(deliver) = input.to_deliver {
        session.ledger.set_to_deliver(deliver);
    }

    Ok(Json(session.view()))
}

// =============================================================================
// Finalize
// =============================================================================

/// Saves the cart as a sale, or rewrites the order the session was opened on.
pub async fn finalize_order(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<FinalizeOrderInput>,
) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    let shared = load_session(&state, &id, &actor).await?;
    let mut session = shared.lock().await;

    let editing = match &session.editing {
        None => None,
        Some(EditTarget::Order(order_id)) => Some(order_id.clone()),
        Some(EditTarget::Route(_)) => {
            return Err(ApiError::validation(
                "This session edits a route; finalize it as a route",
            ))
        }
    };
    let action = if editing.is_some() {
        Action::Update
    } else {
        Action::Create
    };
    actor.ensure(action, Resource::Order)?;

    let plan = plan_order(
        session.customer.as_ref(),
        &session.cart,
        input.payment_method,
        input.channel,
        non_blank(input.notes),
    )?;

    let (status, saved) = match editing {
        None => (
            StatusCode::CREATED,
            state.db.orders().finalize(&plan, &actor.id).await?,
        ),
        Some(order_id) => (
            StatusCode::OK,
            state.db.orders().edit(&order_id, &plan, &actor.id).await?,
        ),
    };

    session.clear_lines();
    session.customer = None;
    drop(session);
    state.sessions.remove(&id).await;

    info!(
        order_number = %saved.order.order_number,
        session = %id,
        actor = %actor.id,
        "Session finalized as order"
    );
    Ok((status, Json(saved)))
}

/// Saves the cart as a delivery route, or rewrites the route the session
/// was opened on.
pub async fn finalize_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<FinalizeRouteInput>,
) -> ApiResult<(StatusCode, Json<RouteWithItems>)> {
    let shared = load_session(&state, &id, &actor).await?;
    let mut session = shared.lock().await;

    let editing = match &session.editing {
        None => None,
        Some(EditTarget::Route(route_id)) => Some(route_id.clone()),
        Some(EditTarget::Order(_)) => {
            return Err(ApiError::validation(
                "This session edits an order; finalize it as an order",
            ))
        }
    };
    let action = if editing.is_some() {
        Action::Update
    } else {
        Action::Create
    };
    actor.ensure(action, Resource::Route)?;

    let plan = plan_route(
        session.customer.as_ref(),
        &session.cart,
        input.payment_method,
        RouteDetails {
            sequence: input.sequence,
            delivery_date: input.delivery_date,
            ledger: session.ledger,
            observation: non_blank(input.observation),
        },
    )?;

    let (status, saved) = match editing {
        None => (
            StatusCode::CREATED,
            state.db.routes().finalize(&plan, &actor.id).await?,
        ),
        Some(route_id) => (
            StatusCode::OK,
            state.db.routes().edit(&route_id, &plan, &actor.id).await?,
        ),
    };

    session.clear_lines();
    session.customer = None;
    drop(session);
    state.sessions.remove(&id).await;

    info!(
        route_number = %saved.route.route_number,
        session = %id,
        actor = %actor.id,
        "Session finalized as route"
    );
    Ok((status, Json(saved)))
}
