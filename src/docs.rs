// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::{common, handlers, middleware::actor::ACTOR_ID_HEADER, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,

        // --- Warehouses ---
        handlers::warehouses::create_warehouse,
        handlers::warehouses::list_warehouses,
        handlers::warehouses::get_warehouse,
        handlers::warehouses::set_warehouse_activation,
        handlers::warehouses::get_warehouse_summary,

        // --- Inventory ---
        handlers::inventory::initialize_inventory,
        handlers::inventory::get_inventory,
        handlers::inventory::update_inventory_settings,
        handlers::inventory::stock_in,
        handlers::inventory::stock_out,
        handlers::inventory::adjust_inventory,
        handlers::inventory::record_damage,
        handlers::inventory::list_batches,
        handlers::inventory::get_inventory_history,
        handlers::inventory::audit_inventory,
        handlers::inventory::get_low_stock_items,
        handlers::inventory::get_expiring_batches,
        handlers::inventory::get_product_inventory,

        // --- Reservations ---
        handlers::inventory::reserve_inventory,
        handlers::inventory::list_reservations,
        handlers::reservations::get_reservation,
        handlers::reservations::release_reservation,
        handlers::reservations::fulfill_reservation,
    ),
    components(
        schemas(
            common::error::ErrorKind,

            // --- Warehouses ---
            models::warehouse::WarehouseType,
            models::warehouse::Warehouse,
            models::warehouse::WarehouseRef,
            models::warehouse::CreateWarehouse,
            models::warehouse::WarehouseInventorySummary,

            // --- Inventory ---
            models::inventory::StockStatus,
            models::inventory::Inventory,
            models::inventory::InventoryView,
            models::inventory::InventoryDetail,
            models::inventory::ProductInventory,
            models::inventory::ReservationStatus,
            models::inventory::Reservation,
            models::inventory::Batch,
            models::inventory::InventoryChange,
            models::inventory::StockReceipt,
            models::inventory::ReservationChange,
            models::inventory::DamageRecord,
            models::inventory::Fulfillment,

            // --- History ---
            models::history::HistoryEventType,
            models::history::HistoryEntry,
            models::history::HistoryPage,
            models::history::AuditReport,

            // --- Payloads ---
            handlers::warehouses::SetActivationPayload,
            handlers::inventory::InitializeInventoryPayload,
            handlers::inventory::UpdateSettingsPayload,
            handlers::inventory::StockInPayload,
            handlers::inventory::StockOutPayload,
            handlers::inventory::ReservePayload,
            handlers::inventory::AdjustPayload,
            handlers::inventory::DamagePayload,
            handlers::reservations::ReleaseReservationPayload,
            handlers::reservations::FulfillReservationPayload,
        )
    ),
    tags(
        (name = "System", description = "Saúde do serviço"),
        (name = "Warehouses", description = "Cadastro de Armazéns e Resumos"),
        (name = "Inventory", description = "Saldos, Movimentações, Lotes e Histórico"),
        (name = "Reservations", description = "Reservas de Estoque para Pedidos")
    ),
    modifiers(&ActorHeaderAddon)
)]
pub struct ApiDoc;

struct ActorHeaderAddon;

impl utoipa::Modify for ActorHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "actor_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACTOR_ID_HEADER))),
        );
    }
}
