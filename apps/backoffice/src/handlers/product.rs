//! Catalog maintenance.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use aquaroute_core::{Action, Money, Product, ProductCategory, Resource};
use aquaroute_db::repository::product::generate_product_id;

use crate::error::ApiResult;
use crate::extract::CurrentActor;
use crate::handlers::non_blank;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    /// Tax-exclusive, in pesos.
    pub price: Money,
    #[serde(default)]
    pub affects_bottle_deposit: bool,
    /// Ignored on create.
    pub is_active: Option<bool>,
}

pub async fn list_products(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    actor.ensure(Action::Read, Resource::Product)?;
    Ok(Json(state.db.products().list(query.active_only).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    actor.ensure(Action::Read, Resource::Product)?;
    Ok(Json(state.db.products().get(&id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    actor.ensure(Action::Create, Resource::Product)?;

    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        code: input.code,
        name: input.name,
        description: non_blank(input.description),
        category: input.category,
        price: input.price,
        is_active: true,
        affects_bottle_deposit: input.affects_bottle_deposit,
        created_at: now,
        updated_at: now,
    };

    let product = state.db.products().insert(&product).await?;
    info!(code = %product.code, actor = %actor.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Price changes only reach carts opened afterwards.
pub async fn update_product(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    actor.ensure(Action::Update, Resource::Product)?;

    let mut product = state.db.products().get(&id).await?;
    product.code = input.code;
    product.name = input.name;
    product.description = non_blank(input.description);
    product.category = input.category;
    product.price = input.price;
    product.affects_bottle_deposit = input.affects_bottle_deposit;
    if let Some(active) = input.is_active {
        product.is_active = active;
    }

    Ok(Json(state.db.products().update(&product).await?))
}

/// Products are never removed, only hidden from new carts.
pub async fn deactivate_product(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    actor.ensure(Action::Delete, Resource::Product)?;

    state.db.products().deactivate(&id).await?;
    info!(id = %id, actor = %actor.id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}
