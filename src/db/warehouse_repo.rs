// src/db/warehouse_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::warehouse::{Warehouse, WarehouseInventorySummary},
};

// O repositório de armazéns. As funções recebem o executor (pool ou transação)
// para poderem rodar dentro ou fora do bloqueio.
#[derive(Clone, Copy, Default)]
pub struct WarehouseRepository;

impl WarehouseRepository {
    pub async fn insert<'e, E>(&self, executor: E, warehouse: &Warehouse) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO warehouses (id, name, code, warehouse_type, max_capacity, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.code)
        .bind(warehouse.warehouse_type)
        .bind(warehouse.max_capacity)
        .bind(warehouse.is_active)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(executor)
        .await
        .map_err(|e| {
            // Converte violação de unicidade do código em um erro amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::WarehouseCodeAlreadyExists(warehouse.code.clone());
                }
            }
            e.into()
        })?;

        Ok(())
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(warehouse)
    }

    /// Leitura com `FOR SHARE`: impede a desativação enquanto a transação vive.
    pub async fn find_for_share<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(warehouse)
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouses = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses ORDER BY code ASC")
            .fetch_all(executor)
            .await?;
        Ok(warehouses)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        active: bool,
    ) -> Result<Option<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(executor)
        .await?;
        Ok(warehouse)
    }

    pub async fn inventory_summary<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
    ) -> Result<WarehouseInventorySummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Agregação sem bloqueio: pode refletir escritas em andamento com atraso.
        let summary = sqlx::query_as::<_, WarehouseInventorySummary>(
            r#"
            SELECT
                $1::uuid AS warehouse_id,
                COUNT(DISTINCT product_id) AS total_items,
                COALESCE(SUM(quantity_on_hand), 0)::BIGINT AS total_quantity,
                COALESCE(SUM(quantity_reserved), 0)::BIGINT AS total_reserved,
                COALESCE(SUM(quantity_defective), 0)::BIGINT AS total_defective,
                COALESCE(SUM(quantity_on_hand * cost_per_unit), 0)::NUMERIC AS total_value,
                COUNT(*) FILTER (WHERE quantity_on_hand <= reorder_level) AS low_stock_items
            FROM inventories
            WHERE warehouse_id = $1
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(executor)
        .await?;
        Ok(summary)
    }
}
