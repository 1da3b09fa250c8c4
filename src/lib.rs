// src/lib.rs

use axum::{
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o roteador completo da API (com Swagger UI).
pub fn build_router(app_state: AppState) -> Router {
    let warehouse_routes = Router::new()
        .route(
            "/",
            post(handlers::warehouses::create_warehouse).get(handlers::warehouses::list_warehouses),
        )
        .route("/{warehouse_id}", get(handlers::warehouses::get_warehouse))
        .route(
            "/{warehouse_id}/activation",
            post(handlers::warehouses::set_warehouse_activation),
        )
        .route("/{warehouse_id}/summary", get(handlers::warehouses::get_warehouse_summary));

    let inventory_routes = Router::new()
        .route("/", post(handlers::inventory::initialize_inventory))
        // Rotas estáticas convivem com `/{inventory_id}`: o matchit prioriza o literal
        .route("/low-stock", get(handlers::inventory::get_low_stock_items))
        .route("/expiring-batches", get(handlers::inventory::get_expiring_batches))
        .route("/{inventory_id}", get(handlers::inventory::get_inventory))
        .route(
            "/{inventory_id}/settings",
            patch(handlers::inventory::update_inventory_settings),
        )
        .route("/{inventory_id}/stock-in", post(handlers::inventory::stock_in))
        .route("/{inventory_id}/stock-out", post(handlers::inventory::stock_out))
        .route(
            "/{inventory_id}/reservations",
            post(handlers::inventory::reserve_inventory).get(handlers::inventory::list_reservations),
        )
        .route("/{inventory_id}/adjustments", post(handlers::inventory::adjust_inventory))
        .route("/{inventory_id}/damages", post(handlers::inventory::record_damage))
        .route("/{inventory_id}/batches", get(handlers::inventory::list_batches))
        .route("/{inventory_id}/history", get(handlers::inventory::get_inventory_history))
        .route("/{inventory_id}/audit", get(handlers::inventory::audit_inventory));

    let reservation_routes = Router::new()
        .route("/{reservation_id}", get(handlers::reservations::get_reservation))
        .route(
            "/{reservation_id}/release",
            post(handlers::reservations::release_reservation),
        )
        .route(
            "/{reservation_id}/fulfill",
            post(handlers::reservations::fulfill_reservation),
        );

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/products/{product_id}/inventory",
            get(handlers::inventory::get_product_inventory),
        )
        .nest("/api/warehouses", warehouse_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/reservations", reservation_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
