//! Customer records: list, search, create, update, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use aquaroute_core::{Action, Customer, CustomerKind, Resource};
use aquaroute_db::repository::customer::generate_customer_id;

use crate::error::ApiResult;
use crate::extract::CurrentActor;
use crate::handlers::non_blank;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    /// Name, code or RUT fragment.
    pub q: Option<String>,
    pub limit: Option<u32>,
}

/// Editable customer fields, as the customer form posts them.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub tax_id: Option<String>,
    pub name: String,
    pub kind: CustomerKind,
    pub street: String,
    pub street_number: String,
    pub district: String,
    pub city: String,
    pub reference: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub comments: Option<String>,
    #[serde(default)]
    pub bottles_owned: i64,
    #[serde(default)]
    pub bottles_lent: i64,
}

impl CustomerInput {
    fn apply(self, customer: &mut Customer) {
        customer.tax_id = non_blank(self.tax_id);
        customer.name = self.name;
        customer.kind = self.kind;
        customer.street = self.street;
        customer.street_number = self.street_number;
        customer.district = self.district;
        customer.city = self.city;
        customer.reference = non_blank(self.reference);
        customer.phone = non_blank(self.phone);
        customer.email = non_blank(self.email);
        customer.contact = non_blank(self.contact);
        customer.comments = non_blank(self.comments);
        customer.bottles_owned = self.bottles_owned;
        customer.bottles_lent = self.bottles_lent;
    }

    fn into_customer(self) -> Customer {
        let now = Utc::now();
        let mut customer = Customer {
            id: generate_customer_id(),
            code: String::new(),
            tax_id: None,
            name: String::new(),
            kind: self.kind,
            street: String::new(),
            street_number: String::new(),
            district: String::new(),
            city: String::new(),
            reference: None,
            phone: None,
            email: None,
            contact: None,
            comments: None,
            bottles_owned: 0,
            bottles_lent: 0,
            created_at: now,
            updated_at: now,
        };
        self.apply(&mut customer);
        customer
    }
}

pub async fn list_customers(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    actor.ensure(Action::Read, Resource::Customer)?;

    let customers = match query.q {
        Some(q) => {
            debug!(q = %q, "search_customers");
            state
                .db
                .customers()
                .search(&q, query.limit.unwrap_or(20))
                .await?
        }
        None => state.db.customers().list().await?,
    };
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    actor.ensure(Action::Read, Resource::Customer)?;
    Ok(Json(state.db.customers().get(&id).await?))
}

/// Creates a customer with the next `CLInnn` code.
pub async fn create_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    actor.ensure(Action::Create, Resource::Customer)?;

    let customer = state.db.customers().insert(input.into_customer()).await?;
    info!(code = %customer.code, actor = %actor.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    actor.ensure(Action::Update, Resource::Customer)?;

    let mut customer = state.db.customers().get(&id).await?;
    input.apply(&mut customer);
    Ok(Json(state.db.customers().update(customer).await?))
}

/// Fails with 409 while orders or routes still reference the customer.
pub async fn delete_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    actor.ensure(Action::Delete, Resource::Customer)?;

    state.db.customers().delete(&id).await?;
    info!(id = %id, actor = %actor.id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
