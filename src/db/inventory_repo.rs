// src/db/inventory_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        history::{HistoryEntry, NewHistoryEntry},
        inventory::{Batch, Inventory, Reservation, ReservationStatus},
    },
};

const PRODUCT_WAREHOUSE_KEY: &str = "inventories_product_warehouse_key";

#[derive(Clone, Copy, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    // ---
    // Saldos (inventories)
    // ---

    /// Cria o saldo do par (produto, armazém). A constraint única garante que só existe um.
    pub async fn insert_inventory<'e, E>(&self, executor: E, inv: &Inventory) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventories (
                id, product_id, warehouse_id,
                quantity_on_hand, quantity_reserved, quantity_defective,
                reorder_level, reorder_quantity, cost_per_unit, stock_status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(inv.id)
        .bind(inv.product_id)
        .bind(inv.warehouse_id)
        .bind(inv.quantity_on_hand)
        .bind(inv.quantity_reserved)
        .bind(inv.quantity_defective)
        .bind(inv.reorder_level)
        .bind(inv.reorder_quantity)
        .bind(inv.cost_per_unit)
        .bind(inv.stock_status)
        .bind(inv.created_at)
        .bind(inv.updated_at)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation()
                    && db_err.constraint().unwrap_or_default() == PRODUCT_WAREHOUSE_KEY
                {
                    return AppError::DuplicateInventory {
                        product_id: inv.product_id,
                        warehouse_id: inv.warehouse_id,
                    };
                }
            }
            e.into()
        })?;

        Ok(())
    }

    pub async fn find_inventory<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inv = sqlx::query_as::<_, Inventory>("SELECT * FROM inventories WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(inv)
    }

    /// Trava a linha até o fim da transação (SELECT ... FOR UPDATE).
    pub async fn lock_inventory<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inv = sqlx::query_as::<_, Inventory>("SELECT * FROM inventories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(inv)
    }

    pub async fn update_inventory<'e, E>(&self, executor: E, inv: &Inventory) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE inventories
            SET quantity_on_hand = $2,
                quantity_reserved = $3,
                quantity_defective = $4,
                reorder_level = $5,
                reorder_quantity = $6,
                cost_per_unit = $7,
                stock_status = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(inv.id)
        .bind(inv.quantity_on_hand)
        .bind(inv.quantity_reserved)
        .bind(inv.quantity_defective)
        .bind(inv.reorder_level)
        .bind(inv.reorder_quantity)
        .bind(inv.cost_per_unit)
        .bind(inv.stock_status)
        .bind(inv.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_by_product<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Vec<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Inventory>(
            "SELECT * FROM inventories WHERE product_id = $1 ORDER BY created_at ASC",
        )
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Itens no ponto de reposição ou abaixo dele, opcionalmente de um armazém.
    pub async fn list_low_stock<'e, E>(
        &self,
        executor: E,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT * FROM inventories
            WHERE quantity_on_hand <= reorder_level
              AND ($1::uuid IS NULL OR warehouse_id = $1)
            ORDER BY quantity_on_hand ASC, created_at ASC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Reservas
    // ---

    pub async fn insert_reservation<'e, E>(&self, executor: E, r: &Reservation) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventory_reservations (
                id, inventory_id, order_id, quantity, reserved_price,
                status, created_at, released_at, release_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(r.id)
        .bind(r.inventory_id)
        .bind(r.order_id)
        .bind(r.quantity)
        .bind(r.reserved_price)
        .bind(r.status)
        .bind(r.created_at)
        .bind(r.released_at)
        .bind(&r.release_reason)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_reservation<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM inventory_reservations WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT * FROM inventory_reservations WHERE id = $1"
        };
        let r = sqlx::query_as::<_, Reservation>(sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(r)
    }

    pub async fn update_reservation<'e, E>(&self, executor: E, r: &Reservation) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE inventory_reservations
            SET status = $2, released_at = $3, release_reason = $4
            WHERE id = $1
            "#,
        )
        .bind(r.id)
        .bind(r.status)
        .bind(r.released_at)
        .bind(&r.release_reason)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_reservations<'e, E>(
        &self,
        executor: E,
        inventory_id: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM inventory_reservations
            WHERE inventory_id = $1
              AND ($2::reservation_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(inventory_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Lotes
    // ---

    pub async fn insert_batch<'e, E>(&self, executor: E, b: &Batch) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventory_batches (
                id, inventory_id, batch_number, quantity, remaining_quantity,
                cost_per_unit, received_date, supplier, reference, expiry_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(b.id)
        .bind(b.inventory_id)
        .bind(&b.batch_number)
        .bind(b.quantity)
        .bind(b.remaining_quantity)
        .bind(b.cost_per_unit)
        .bind(b.received_date)
        .bind(&b.supplier)
        .bind(&b.reference)
        .bind(b.expiry_date)
        .bind(b.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn lock_batch<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let b = sqlx::query_as::<_, Batch>("SELECT * FROM inventory_batches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(b)
    }

    /// Só a quantidade rastreável muda depois da entrada.
    pub async fn update_batch<'e, E>(&self, executor: E, b: &Batch) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE inventory_batches SET remaining_quantity = $2 WHERE id = $1")
            .bind(b.id)
            .bind(b.remaining_quantity)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_batches<'e, E>(&self, executor: E, inventory_id: Uuid) -> Result<Vec<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Batch>(
            "SELECT * FROM inventory_batches WHERE inventory_id = $1 ORDER BY received_date ASC, created_at ASC",
        )
        .bind(inventory_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn list_expiring_batches<'e, E>(
        &self,
        executor: E,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM inventory_batches
            WHERE expiry_date IS NOT NULL
              AND expiry_date BETWEEN $1 AND $2
            ORDER BY expiry_date ASC, batch_number ASC
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Histórico (livro-razão)
    // ---

    /// Registra uma movimentação no livro-razão (auditoria).
    pub async fn append_history<'e, E>(&self, executor: E, entry: NewHistoryEntry) -> Result<HistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stored = sqlx::query_as::<_, HistoryEntry>(
            r#"
            INSERT INTO inventory_history (
                inventory_id, event_type, quantity_delta, quantity_before, quantity_after,
                reason, actor_id, order_id, reservation_id, batch_id, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(entry.inventory_id)
        .bind(entry.event_type)
        .bind(entry.quantity_delta)
        .bind(entry.quantity_before)
        .bind(entry.quantity_after)
        .bind(&entry.reason)
        .bind(entry.actor_id)
        .bind(entry.order_id)
        .bind(entry.reservation_id)
        .bind(entry.batch_id)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .fetch_one(executor)
        .await?;
        Ok(stored)
    }

    pub async fn list_history<'e, E>(
        &self,
        executor: E,
        inventory_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT * FROM inventory_history
            WHERE inventory_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(inventory_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn count_history<'e, E>(&self, executor: E, inventory_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_history WHERE inventory_id = $1")
            .bind(inventory_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    pub async fn full_history<'e, E>(&self, executor: E, inventory_id: Uuid) -> Result<Vec<HistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            "SELECT * FROM inventory_history WHERE inventory_id = $1 ORDER BY id ASC",
        )
        .bind(inventory_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
