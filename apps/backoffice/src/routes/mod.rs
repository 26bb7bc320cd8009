//! # Route Table
//!
//! ```text
//! /health                                   GET
//! /api/customers                            GET (?q=&limit=)  POST
//! /api/customers/{id}                       GET  PUT  DELETE
//! /api/products                             GET (?active_only=)  POST
//! /api/products/{id}                        GET  PUT  DELETE (deactivate)
//! /api/inventory/stock                      GET
//! /api/inventory/movements                  POST
//! /api/inventory/products/{id}/movements    GET (?limit=)
//! /api/inventory/alerts                     GET
//! /api/inventory/alerts/{product_id}        PUT
//! /api/sessions                             POST
//! /api/sessions/{id}                        GET  DELETE
//! /api/sessions/{id}/lines                  POST
//! /api/sessions/{id}/lines/{product_id}     PUT  DELETE
//! /api/sessions/{id}/clear                  POST
//! /api/sessions/{id}/customer               PUT
//! /api/sessions/{id}/bottles                PUT
//! /api/sessions/{id}/order                  POST
//! /api/sessions/{id}/route                  POST
//! /api/orders                               GET (?customer_id=&status=&from=&to=&limit=)
//! /api/orders/{id}                          GET
//! /api/orders/{id}/session                  POST (open for edit)
//! /api/orders/{id}/cancel                   POST
//! /api/orders/{id}/payment                  PUT
//! /api/routes                               GET (?date= | ?from=&to=)
//! /api/routes/{id}                          GET  DELETE
//! /api/routes/{id}/session                  POST (open for edit)
//! /api/routes/{id}/complete                 POST
//! /api/routes/{id}/cancel                   POST
//! /api/expenses                             GET (?from=&to=)  POST
//! /api/reports/sales                        GET (?from=&to=&period=)
//! /api/reports/top-products                 GET (?from=&to=&limit=)
//! /api/reports/top-customers                GET (?from=&to=&limit=)
//! /api/reports/deliveries                   GET (?from=&to=)
//! /api/reports/financial                    GET (?from=&to=)
//! /api/reports/low-stock                    GET
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{customer, expense, health, inventory, order, product, report, route, session};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/customers", customer_routes())
        .nest("/products", product_routes())
        .nest("/inventory", inventory_routes())
        .nest("/sessions", session_routes())
        .nest("/orders", order_routes())
        .nest("/routes", route_routes())
        .nest("/expenses", expense_routes())
        .nest("/reports", report_routes())
}

/// Full application router with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .with_state(state)
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(customer::list_customers).post(customer::create_customer),
        )
        .route(
            "/{id}",
            get(customer::get_customer)
                .put(customer::update_customer)
                .delete(customer::delete_customer),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(product::list_products).post(product::create_product))
        .route(
            "/{id}",
            get(product::get_product)
                .put(product::update_product)
                .delete(product::deactivate_product),
        )
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(inventory::stock_levels))
        .route("/movements", post(inventory::record_movement))
        .route(
            "/products/{id}/movements",
            get(inventory::movement_history),
        )
        .route("/alerts", get(inventory::list_alerts))
        .route("/alerts/{product_id}", put(inventory::upsert_alert))
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(session::create_session))
        .route(
            "/{id}",
            get(session::get_session).delete(session::discard_session),
        )
        .route("/{id}/lines", post(session::add_line))
        .route(
            "/{id}/lines/{product_id}",
            put(session::set_line_quantity).delete(session::remove_line),
        )
        .route("/{id}/clear", post(session::clear_cart))
        .route("/{id}/customer", put(session::select_customer))
        .route("/{id}/bottles", put(session::set_bottles))
        .route("/{id}/order", post(session::finalize_order))
        .route("/{id}/route", post(session::finalize_route))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(order::list_orders))
        .route("/{id}", get(order::get_order))
        .route("/{id}/session", post(session::open_order_edit))
        .route("/{id}/cancel", post(order::cancel_order))
        .route("/{id}/payment", put(order::set_payment))
}

fn route_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(route::list_routes))
        .route("/{id}", get(route::get_route).delete(route::delete_route))
        .route("/{id}/session", post(session::open_route_edit))
        .route("/{id}/complete", post(route::complete_route))
        .route("/{id}/cancel", post(route::cancel_route))
}

fn expense_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(expense::list_expenses).post(expense::record_expense),
    )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(report::sales_by_period))
        .route("/top-products", get(report::top_products))
        .route("/top-customers", get(report::top_customers))
        .route("/deliveries", get(report::delivery_metrics))
        .route("/financial", get(report::financial_summary))
        .route("/low-stock", get(report::low_stock))
}
