// src/services/warehouse_service.rs

use std::sync::Arc;

use chrono::{Days, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::{
        inventory::{Batch, InventoryDetail, InventoryView, ProductInventory, Reservation, ReservationStatus},
        warehouse::{CreateWarehouse, Warehouse, WarehouseInventorySummary, WarehouseRef},
    },
};

/// Horizonte máximo da consulta de vencimentos (dez anos).
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

/// Consultas de leitura e o cadastro de armazéns.
///
/// Nada aqui trava linhas: as leituras enxergam o último estado confirmado.
#[derive(Clone)]
pub struct WarehouseService {
    store: Arc<dyn LedgerStore>,
}

impl WarehouseService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // --- CADASTRO DE ARMAZÉNS ---
    #[instrument(skip(self, payload), fields(code = %payload.code), err(level = "warn"))]
    pub async fn create_warehouse(&self, payload: CreateWarehouse) -> Result<Warehouse, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            code: payload.code.trim().to_uppercase(),
            warehouse_type: payload.warehouse_type,
            max_capacity: payload.max_capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_warehouse(&warehouse).await?;

        info!(warehouse_id = %warehouse.id, "armazém criado");
        Ok(warehouse)
    }

    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> Result<Warehouse, AppError> {
        self.store
            .find_warehouse(warehouse_id)
            .await?
            .ok_or(AppError::WarehouseNotFound(warehouse_id))
    }

    pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, AppError> {
        self.store.list_warehouses().await
    }

    #[instrument(skip(self), err(level = "warn"))]
    pub async fn set_warehouse_active(&self, warehouse_id: Uuid, active: bool) -> Result<Warehouse, AppError> {
        let warehouse = self
            .store
            .set_warehouse_active(warehouse_id, active)
            .await?
            .ok_or(AppError::WarehouseNotFound(warehouse_id))?;

        info!(active, "situação do armazém alterada");
        Ok(warehouse)
    }

    // --- LEITURAS DE ESTOQUE ---

    /// Linha de estoque com os derivados e o armazém embutido.
    pub async fn get_inventory(&self, inventory_id: Uuid) -> Result<InventoryDetail, AppError> {
        let inventory = self
            .store
            .find_inventory(inventory_id)
            .await?
            .ok_or(AppError::InventoryNotFound(inventory_id))?;

        // O armazém nunca é apagado, então a ausência aqui é corrupção
        let warehouse = self
            .store
            .find_warehouse(inventory.warehouse_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "estoque {} aponta para armazém inexistente {}",
                    inventory.id,
                    inventory.warehouse_id
                ))
            })?;

        Ok(InventoryDetail {
            warehouse: WarehouseRef::from(&warehouse),
            inventory: inventory.into(),
        })
    }

    /// Saldo do produto em todos os armazéns. Produto sem estoque devolve totais zerados.
    pub async fn get_product_inventory(&self, product_id: Uuid) -> Result<ProductInventory, AppError> {
        let locations: Vec<InventoryView> = self
            .store
            .list_product_inventory(product_id)
            .await?
            .into_iter()
            .map(InventoryView::from)
            .collect();

        Ok(ProductInventory {
            product_id,
            total_on_hand: locations.iter().map(|l| l.quantity_on_hand).sum(),
            total_available: locations.iter().map(|l| l.quantity_available).sum(),
            locations,
        })
    }

    pub async fn get_low_stock_items(&self, warehouse_id: Option<Uuid>) -> Result<Vec<InventoryView>, AppError> {
        let rows = self.store.list_low_stock(warehouse_id).await?;
        Ok(rows.into_iter().map(InventoryView::from).collect())
    }

    pub async fn get_warehouse_inventory_summary(
        &self,
        warehouse_id: Uuid,
    ) -> Result<WarehouseInventorySummary, AppError> {
        // Armazém inexistente é 404; armazém vazio é resumo zerado
        self.get_warehouse(warehouse_id).await?;
        self.store.warehouse_summary(warehouse_id).await
    }

    /// Lotes com validade entre hoje e hoje + `days`, inclusive.
    pub async fn get_expiring_batches(&self, days: i64) -> Result<Vec<Batch>, AppError> {
        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
            return Err(AppError::invalid_field(
                "days",
                "range",
                format!("O prazo deve estar entre 0 e {MAX_EXPIRY_WINDOW_DAYS} dias."),
            ));
        }

        let today = Utc::now().date_naive();
        let until = today
            .checked_add_days(Days::new(days as u64))
            .ok_or_else(|| AppError::invalid_field("days", "range", "Prazo fora do calendário."))?;

        self.store.list_expiring_batches(today, until).await
    }

    pub async fn list_batches(&self, inventory_id: Uuid) -> Result<Vec<Batch>, AppError> {
        self.ensure_inventory(inventory_id).await?;
        self.store.list_batches(inventory_id).await
    }

    // --- RESERVAS ---
    pub async fn get_reservation(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        self.store
            .find_reservation(reservation_id)
            .await?
            .ok_or(AppError::ReservationNotFound(reservation_id))
    }

    pub async fn list_reservations(
        &self,
        inventory_id: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, AppError> {
        self.ensure_inventory(inventory_id).await?;
        self.store.list_reservations(inventory_id, status).await
    }

    async fn ensure_inventory(&self, inventory_id: Uuid) -> Result<(), AppError> {
        match self.store.find_inventory(inventory_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::InventoryNotFound(inventory_id)),
        }
    }
}
