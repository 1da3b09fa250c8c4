// src/db/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        store::{LedgerStore, LedgerTx},
        InventoryRepository, WarehouseRepository,
    },
    models::{
        history::{HistoryEntry, NewHistoryEntry},
        inventory::{Batch, Inventory, Reservation, ReservationStatus},
        warehouse::{Warehouse, WarehouseInventorySummary},
    },
};

/// Livro-razão sobre PostgreSQL. Os bloqueios de linha são `SELECT ... FOR UPDATE`
/// e a espera é limitada por `lock_timeout` em cada transação.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Duration,
    inventory_repo: InventoryRepository,
    warehouse_repo: WarehouseRepository,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool,
            lock_timeout,
            inventory_repo: InventoryRepository,
            warehouse_repo: WarehouseRepository,
        }
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
    inventory_repo: InventoryRepository,
    warehouse_repo: WarehouseRepository,
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Vale só para esta transação (is_local = true)
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgLedgerTx {
            tx,
            inventory_repo: self.inventory_repo,
            warehouse_repo: self.warehouse_repo,
        }))
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<(), AppError> {
        self.warehouse_repo.insert(&self.pool, warehouse).await
    }

    async fn find_warehouse(&self, id: Uuid) -> Result<Option<Warehouse>, AppError> {
        self.warehouse_repo.find_by_id(&self.pool, id).await
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, AppError> {
        self.warehouse_repo.list(&self.pool).await
    }

    async fn set_warehouse_active(&self, id: Uuid, active: bool) -> Result<Option<Warehouse>, AppError> {
        self.warehouse_repo.set_active(&self.pool, id, active).await
    }

    async fn find_inventory(&self, id: Uuid) -> Result<Option<Inventory>, AppError> {
        self.inventory_repo.find_inventory(&self.pool, id).await
    }

    async fn list_product_inventory(&self, product_id: Uuid) -> Result<Vec<Inventory>, AppError> {
        self.inventory_repo.list_by_product(&self.pool, product_id).await
    }

    async fn list_low_stock(&self, warehouse_id: Option<Uuid>) -> Result<Vec<Inventory>, AppError> {
        self.inventory_repo.list_low_stock(&self.pool, warehouse_id).await
    }

    async fn warehouse_summary(&self, warehouse_id: Uuid) -> Result<WarehouseInventorySummary, AppError> {
        self.warehouse_repo.inventory_summary(&self.pool, warehouse_id).await
    }

    async fn list_expiring_batches(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Batch>, AppError> {
        self.inventory_repo.list_expiring_batches(&self.pool, from, until).await
    }

    async fn list_batches(&self, inventory_id: Uuid) -> Result<Vec<Batch>, AppError> {
        self.inventory_repo.list_batches(&self.pool, inventory_id).await
    }

    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        self.inventory_repo.find_reservation(&self.pool, id, false).await
    }

    async fn list_reservations(
        &self,
        inventory_id: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, AppError> {
        self.inventory_repo.list_reservations(&self.pool, inventory_id, status).await
    }

    async fn list_history(
        &self,
        inventory_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<HistoryEntry>, i64), AppError> {
        let entries = self.inventory_repo.list_history(&self.pool, inventory_id, limit, offset).await?;
        let total = self.inventory_repo.count_history(&self.pool, inventory_id).await?;
        Ok((entries, total))
    }

    async fn full_history(&self, inventory_id: Uuid) -> Result<Vec<HistoryEntry>, AppError> {
        self.inventory_repo.full_history(&self.pool, inventory_id).await
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_warehouse(&mut self, id: Uuid) -> Result<Option<Warehouse>, AppError> {
        self.warehouse_repo.find_for_share(&mut *self.tx, id).await
    }

    async fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError> {
        self.inventory_repo.insert_inventory(&mut *self.tx, inventory).await
    }

    async fn lock_inventory(&mut self, id: Uuid) -> Result<Option<Inventory>, AppError> {
        self.inventory_repo.lock_inventory(&mut *self.tx, id).await
    }

    async fn update_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError> {
        self.inventory_repo.update_inventory(&mut *self.tx, inventory).await
    }

    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        self.inventory_repo.find_reservation(&mut *self.tx, id, true).await
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        self.inventory_repo.insert_reservation(&mut *self.tx, reservation).await
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        self.inventory_repo.update_reservation(&mut *self.tx, reservation).await
    }

    async fn find_batch(&mut self, id: Uuid) -> Result<Option<Batch>, AppError> {
        self.inventory_repo.lock_batch(&mut *self.tx, id).await
    }

    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), AppError> {
        self.inventory_repo.insert_batch(&mut *self.tx, batch).await
    }

    async fn update_batch(&mut self, batch: &Batch) -> Result<(), AppError> {
        self.inventory_repo.update_batch(&mut *self.tx, batch).await
    }

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<HistoryEntry, AppError> {
        self.inventory_repo.append_history(&mut *self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
