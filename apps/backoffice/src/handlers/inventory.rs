//! # Inventory Handlers
//!
//! Stock levels, manual movements and alert thresholds.
//!
//! ```text
//! POST /api/inventory/movements  { product_id, delta: +24, notes: "Truck 3" }
//!        │
//!        ▼
//! NewMovement::adjustment ──► InventoryRepository::apply_movement
//!        │                          (floor-checked, one transaction)
//!        ▼
//! 201 { kind: "adjustment", previous_quantity: 10, new_quantity: 34, ... }
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use aquaroute_core::{Action, InventoryAlert, InventoryMovement, Resource};
use aquaroute_db::{NewMovement, ProductStock};

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentActor;
use crate::handlers::non_blank;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct MovementInput {
    pub product_id: String,
    /// Signed change. Negative writes stock off.
    pub delta: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AlertInput {
    pub min_quantity: i64,
    pub alert_quantity: i64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

pub async fn stock_levels(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<Vec<ProductStock>>> {
    actor.ensure(Action::Read, Resource::Inventory)?;
    Ok(Json(state.db.inventory().stock_levels().await?))
}

/// Records a manual count correction or receipt. A note is required.
pub async fn record_movement(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<MovementInput>,
) -> ApiResult<(StatusCode, Json<InventoryMovement>)> {
    actor.ensure(Action::Create, Resource::Inventory)?;

    if input.delta == 0 {
        return Err(ApiError::validation("delta must not be zero"));
    }
    let notes = non_blank(input.notes)
        .ok_or_else(|| ApiError::validation("A note is required for manual movements"))?;

    // Unknown products surface as 404 before anything is written
    state.db.products().get(&input.product_id).await?;

    let movement = state
        .db
        .inventory()
        .apply_movement(NewMovement::adjustment(
            input.product_id,
            input.delta,
            Some(notes),
            actor.id.clone(),
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(movement)))
}

/// Newest first.
pub async fn movement_history(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(product_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<InventoryMovement>>> {
    actor.ensure(Action::Read, Resource::Inventory)?;

    let history = state
        .db
        .inventory()
        .movements_for_product(&product_id, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(history))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<Vec<InventoryAlert>>> {
    actor.ensure(Action::Read, Resource::Inventory)?;
    Ok(Json(state.db.inventory().list_alerts().await?))
}

pub async fn upsert_alert(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(product_id): Path<String>,
    Json(input): Json<AlertInput>,
) -> ApiResult<Json<InventoryAlert>> {
    actor.ensure(Action::Update, Resource::Inventory)?;

    state.db.products().get(&product_id).await?;
    let alert = state
        .db
        .inventory()
        .upsert_alert(
            &product_id,
            input.min_quantity,
            input.alert_quantity,
            input.enabled,
        )
        .await?;
    Ok(Json(alert))
}
