// src/db/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        history::{HistoryEntry, NewHistoryEntry},
        inventory::{Batch, Inventory, Reservation, ReservationStatus},
        warehouse::{Warehouse, WarehouseInventorySummary},
    },
};

/// Armazenamento do livro-razão de estoque.
///
/// As leituras daqui não seguram bloqueio nenhum e podem enxergar dados
/// ligeiramente defasados. Toda escrita passa por [`LedgerTx`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Abre uma transação. Descartar o handle sem `commit` desfaz tudo.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, AppError>;

    // --- Armazéns ---
    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<(), AppError>;
    async fn find_warehouse(&self, id: Uuid) -> Result<Option<Warehouse>, AppError>;
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, AppError>;
    async fn set_warehouse_active(&self, id: Uuid, active: bool) -> Result<Option<Warehouse>, AppError>;

    // --- Consultas de estoque ---
    async fn find_inventory(&self, id: Uuid) -> Result<Option<Inventory>, AppError>;
    async fn list_product_inventory(&self, product_id: Uuid) -> Result<Vec<Inventory>, AppError>;
    async fn list_low_stock(&self, warehouse_id: Option<Uuid>) -> Result<Vec<Inventory>, AppError>;
    async fn warehouse_summary(&self, warehouse_id: Uuid) -> Result<WarehouseInventorySummary, AppError>;
    async fn list_expiring_batches(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Batch>, AppError>;
    async fn list_batches(&self, inventory_id: Uuid) -> Result<Vec<Batch>, AppError>;
    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    async fn list_reservations(
        &self,
        inventory_id: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, AppError>;

    // --- Histórico ---
    /// Página mais recente primeiro, mais o total para a paginação.
    async fn list_history(
        &self,
        inventory_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<HistoryEntry>, i64), AppError>;
    /// Histórico completo em ordem de criação.
    async fn full_history(&self, inventory_id: Uuid) -> Result<Vec<HistoryEntry>, AppError>;
}

/// Handle de uma única transação.
///
/// `lock_inventory` adquire o bloqueio de linha e o mantém até `commit` ou
/// até o handle ser descartado. Esperar além do limite configurado devolve
/// `AppError::ConcurrencyTimeout`.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_warehouse(&mut self, id: Uuid) -> Result<Option<Warehouse>, AppError>;

    /// Falha com `DuplicateInventory` se o par (produto, armazém) já existe.
    async fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError>;
    async fn lock_inventory(&mut self, id: Uuid) -> Result<Option<Inventory>, AppError>;
    async fn update_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError>;

    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError>;
    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError>;

    async fn find_batch(&mut self, id: Uuid) -> Result<Option<Batch>, AppError>;
    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), AppError>;
    async fn update_batch(&mut self, batch: &Batch) -> Result<(), AppError>;

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<HistoryEntry, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
