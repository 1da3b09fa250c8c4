// src/models/warehouse.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "warehouse_type", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum WarehouseType {
    Primary,
    Secondary,
    Regional,
    Distribution,
}

// --- Armazém (local físico) ---
// Nunca é apagado: as linhas de estoque apontam para ele. Só é desativado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub warehouse_type: WarehouseType,
    pub max_capacity: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resumo do armazém embutido nas consultas de estoque.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRef {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub warehouse_type: WarehouseType,
    pub is_active: bool,
}

impl From<&Warehouse> for WarehouseRef {
    fn from(w: &Warehouse) -> Self {
        Self {
            id: w.id,
            name: w.name.clone(),
            code: w.code.clone(),
            warehouse_type: w.warehouse_type,
            is_active: w.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouse {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    #[schema(example = "Centro de Distribuição Sul")]
    pub name: String,

    #[validate(length(min = 1, max = 32, message = "O código é obrigatório."))]
    #[schema(example = "CD-SUL")]
    pub code: String,

    #[serde(rename = "type")]
    pub warehouse_type: WarehouseType,

    #[validate(range(min = 1, message = "A capacidade deve ser positiva."))]
    pub max_capacity: Option<i64>,
}

/// Resumo agregado do estoque de um armazém.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseInventorySummary {
    pub warehouse_id: Uuid,
    /// Produtos distintos com linha de estoque no armazém.
    pub total_items: i64,
    pub total_quantity: i64,
    pub total_reserved: i64,
    pub total_defective: i64,
    pub total_value: rust_decimal::Decimal,
    pub low_stock_items: i64,
}
