//! Read models for the dashboard.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use aquaroute_core::reports::{
    CustomerRanking, DeliveryMetrics, FinancialSummary, LowStockAlert, Period, PeriodSales,
    ProductRanking, TOP_LIMIT,
};
use aquaroute_core::{Action, Resource};

use crate::error::ApiResult;
use crate::extract::CurrentActor;
use crate::handlers::DateRange;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default = "default_period")]
    pub period: Period,
}

fn default_period() -> Period {
    Period::Day
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub limit: Option<usize>,
}

impl RankingQuery {
    fn range(&self) -> ApiResult<DateRange> {
        DateRange {
            from: self.from,
            to: self.to,
        }
        .checked()
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(TOP_LIMIT)
    }
}

pub async fn sales_by_period(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<SalesQuery>,
) -> ApiResult<Json<Vec<PeriodSales>>> {
    actor.ensure(Action::Read, Resource::Report)?;

    let range = DateRange {
        from: query.from,
        to: query.to,
    }
    .checked()?;
    let sales = state
        .db
        .reports()
        .sales_by_period(range.from, range.to, query.period)
        .await?;
    Ok(Json(sales))
}

pub async fn top_products(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<RankingQuery>,
) -> ApiResult<Json<Vec<ProductRanking>>> {
    actor.ensure(Action::Read, Resource::Report)?;

    let range = query.range()?;
    let ranking = state
        .db
        .reports()
        .top_products(range.from, range.to, query.limit())
        .await?;
    Ok(Json(ranking))
}

pub async fn top_customers(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<RankingQuery>,
) -> ApiResult<Json<Vec<CustomerRanking>>> {
    actor.ensure(Action::Read, Resource::Report)?;

    let range = query.range()?;
    let ranking = state
        .db
        .reports()
        .top_customers(range.from, range.to, query.limit())
        .await?;
    Ok(Json(ranking))
}

pub async fn delivery_metrics(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<DeliveryMetrics>> {
    actor.ensure(Action::Read, Resource::Report)?;

    let range = range.checked()?;
    Ok(Json(
        state
            .db
            .reports()
            .delivery_metrics(range.from, range.to)
            .await?,
    ))
}

/// Income against expenses. Needs finance read access as well.
pub async fn financial_summary(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<FinancialSummary>> {
    actor.ensure(Action::Read, Resource::Report)?;
    actor.ensure(Action::Read, Resource::Finance)?;

    let range = range.checked()?;
    Ok(Json(
        state
            .db
            .reports()
            .financial_summary(range.from, range.to)
            .await?,
    ))
}

pub async fn low_stock(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<Vec<LowStockAlert>>> {
    actor.ensure(Action::Read, Resource::Report)?;
    Ok(Json(state.db.reports().low_stock().await?))
}
