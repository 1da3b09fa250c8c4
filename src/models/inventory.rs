// src/models/inventory.rs

use std::ops::Deref;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    models::{history::HistoryEntry, warehouse::WarehouseRef},
};

// ---
// Validações customizadas
// ---
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_zero(val: i64) -> Result<(), ValidationError> {
    if val == 0 {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("O ajuste não pode ser zero.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_metadata(val: &Value) -> Result<(), ValidationError> {
    if !(val.is_object() || val.is_null()) {
        let mut err = ValidationError::new("object");
        err.message = Some("Os metadados devem ser um objeto JSON.".into());
        return Err(err);
    }
    Ok(())
}

// --- Situação do estoque ---
// `Backorder` está reservado para uso futuro: nenhuma operação o produz.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "stock_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    Backorder,
}

impl StockStatus {
    /// Regra única de derivação, aplicada após toda mudança de `quantity_on_hand`.
    pub fn derive(quantity_on_hand: i64) -> Self {
        if quantity_on_hand <= 0 {
            Self::OutOfStock
        } else {
            Self::InStock
        }
    }
}

// --- Saldo por (produto, armazém) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_defective: i64,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub cost_per_unit: Decimal,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    pub fn new(cmd: &InitializeInventory, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: cmd.product_id,
            warehouse_id: cmd.warehouse_id,
            quantity_on_hand: cmd.initial_quantity,
            quantity_reserved: 0,
            quantity_defective: 0,
            reorder_level: cmd.reorder_level,
            reorder_quantity: cmd.reorder_quantity,
            cost_per_unit: cmd.cost_per_unit,
            stock_status: StockStatus::derive(cmd.initial_quantity),
            created_at: now,
            updated_at: now,
        }
    }

    /// Físico menos reservado. Nunca é gravado.
    pub fn quantity_available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity_on_hand <= self.reorder_level
    }

    /// Único caminho para alterar o físico: a situação acompanha.
    pub fn set_on_hand(&mut self, quantity_on_hand: i64, now: DateTime<Utc>) {
        self.quantity_on_hand = quantity_on_hand;
        self.stock_status = StockStatus::derive(quantity_on_hand);
        self.updated_at = now;
    }

    pub fn set_reserved(&mut self, quantity_reserved: i64, now: DateTime<Utc>) {
        self.quantity_reserved = quantity_reserved;
        self.updated_at = now;
    }

    pub fn ensure_available(&self, requested: i64) -> Result<(), AppError> {
        let available = self.quantity_available();
        if requested > available {
            return Err(AppError::InsufficientStock { requested, available });
        }
        Ok(())
    }
}

/// Saldo com os campos derivados calculados na leitura.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub record: Inventory,
    pub quantity_available: i64,
    pub low_stock: bool,
}

impl From<Inventory> for InventoryView {
    fn from(record: Inventory) -> Self {
        Self {
            quantity_available: record.quantity_available(),
            low_stock: record.is_low_stock(),
            record,
        }
    }
}

impl Deref for InventoryView {
    type Target = Inventory;

    fn deref(&self) -> &Inventory {
        &self.record
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub inventory: InventoryView,
    pub warehouse: WarehouseRef,
}

/// Disponibilidade omnichannel de um produto em todos os armazéns.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInventory {
    pub product_id: Uuid,
    pub total_on_hand: i64,
    pub total_available: i64,
    pub locations: Vec<InventoryView>,
}

// --- Reservas ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub order_id: Uuid,
    pub quantity: i64,
    pub reserved_price: Decimal,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,
}

impl Reservation {
    /// active -> released, uma única vez.
    pub fn release(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status == ReservationStatus::Released {
            return Err(AppError::InvalidState(format!(
                "A reserva {} já foi liberada.",
                self.id
            )));
        }
        self.status = ReservationStatus::Released;
        self.released_at = Some(now);
        self.release_reason = Some(reason.to_string());
        Ok(())
    }
}

// --- Lotes (entradas rastreáveis) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub batch_number: String,
    pub quantity: i64,
    /// Unidades rastreáveis restantes (só as avarias descontam).
    pub remaining_quantity: i64,
    pub cost_per_unit: Decimal,
    pub received_date: DateTime<Utc>,
    pub supplier: Option<String>,
    pub reference: Option<String>,
    pub expiry_date: Option<NaiveDate>, // Data simples (Dia/Mês/Ano)
    pub created_at: DateTime<Utc>,
}

// =============================================================================
//  COMANDOS DO MOTOR
// =============================================================================

#[derive(Debug, Clone, Validate)]
pub struct InitializeInventory {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(range(min = 0, message = "A quantidade inicial não pode ser negativa."))]
    pub initial_quantity: i64,
    #[validate(range(min = 0, message = "O ponto de reposição não pode ser negativo."))]
    pub reorder_level: i64,
    #[validate(range(min = 0, message = "O lote de reposição não pode ser negativo."))]
    pub reorder_quantity: i64,
    #[validate(custom(function = "validate_not_negative"))]
    pub cost_per_unit: Decimal,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct StockIn {
    pub inventory_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade deve ser positiva."))]
    pub quantity: i64,
    #[validate(length(min = 1, max = 64, message = "O número do lote é obrigatório."))]
    pub batch_number: String,
    #[validate(custom(function = "validate_not_negative"))]
    pub cost_per_unit: Decimal,
    pub received_date: Option<DateTime<Utc>>,
    #[validate(length(max = 120))]
    pub supplier: Option<String>,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Value,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct StockOut {
    pub inventory_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade deve ser positiva."))]
    pub quantity: i64,
    #[validate(length(min = 1, max = 255, message = "O motivo é obrigatório."))]
    pub reason: String,
    pub order_id: Option<Uuid>,
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Value,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct ReserveInventory {
    pub inventory_id: Uuid,
    pub order_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade deve ser positiva."))]
    pub quantity: i64,
    #[validate(custom(function = "validate_not_negative"))]
    pub reserved_price: Decimal,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct UnreserveInventory {
    pub reservation_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "O motivo é obrigatório."))]
    pub reason: String,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct FulfillReservation {
    pub reservation_id: Uuid,
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Value,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct AdjustInventory {
    pub inventory_id: Uuid,
    #[validate(custom(function = "validate_non_zero"))]
    pub adjustment_quantity: i64,
    #[validate(length(min = 1, max = 255, message = "O motivo é obrigatório."))]
    pub reason: String,
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Value,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Validate)]
pub struct RecordDamage {
    pub inventory_id: Uuid,
    pub batch_id: Option<Uuid>,
    #[validate(range(min = 1, message = "A quantidade deve ser positiva."))]
    pub quantity: i64,
    #[validate(length(min = 1, max = 255, message = "O motivo é obrigatório."))]
    pub reason: String,
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Value,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = "validate_settings"))]
pub struct UpdateInventorySettings {
    pub inventory_id: Uuid,
    #[validate(range(min = 0, message = "O ponto de reposição não pode ser negativo."))]
    pub reorder_level: Option<i64>,
    #[validate(range(min = 0, message = "O lote de reposição não pode ser negativo."))]
    pub reorder_quantity: Option<i64>,
    pub cost_per_unit: Option<Decimal>,
}

fn validate_settings(cmd: &UpdateInventorySettings) -> Result<(), ValidationError> {
    if cmd.reorder_level.is_none() && cmd.reorder_quantity.is_none() && cmd.cost_per_unit.is_none() {
        let mut err = ValidationError::new("empty");
        err.message = Some("Informe ao menos um campo para atualizar.".into());
        return Err(err);
    }
    match &cmd.cost_per_unit {
        Some(cost) => validate_not_negative(cost),
        None => Ok(()),
    }
}

// =============================================================================
//  RESULTADOS DO MOTOR
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChange {
    pub inventory: InventoryView,
    pub entry: HistoryEntry,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockReceipt {
    pub inventory: InventoryView,
    pub batch: Batch,
    pub entry: HistoryEntry,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationChange {
    pub inventory: InventoryView,
    pub reservation: Reservation,
    pub entry: HistoryEntry,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DamageRecord {
    pub inventory: InventoryView,
    pub batch: Option<Batch>,
    pub entry: HistoryEntry,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub inventory: InventoryView,
    pub reservation: Reservation,
    pub entries: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    fn init_cmd(initial_quantity: i64) -> InitializeInventory {
        InitializeInventory {
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            initial_quantity,
            reorder_level: 10,
            reorder_quantity: 50,
            cost_per_unit: Decimal::new(250, 2),
            actor_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn status_is_derived_from_on_hand_only() {
        assert_eq!(StockStatus::derive(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(-3), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(1), StockStatus::InStock);
    }

    #[test]
    fn set_on_hand_keeps_status_in_sync() {
        let mut inv = Inventory::new(&init_cmd(5), Utc::now());
        assert_eq!(inv.stock_status, StockStatus::InStock);

        inv.set_on_hand(0, Utc::now());
        assert_eq!(inv.stock_status, StockStatus::OutOfStock);

        inv.set_on_hand(7, Utc::now());
        assert_eq!(inv.stock_status, StockStatus::InStock);
    }

    #[test]
    fn low_stock_is_inclusive_of_reorder_level() {
        let mut inv = Inventory::new(&init_cmd(11), Utc::now());
        assert!(!inv.is_low_stock());
        inv.set_on_hand(10, Utc::now());
        assert!(inv.is_low_stock());
    }

    #[test]
    fn ensure_available_reports_requested_and_available() {
        let mut inv = Inventory::new(&init_cmd(20), Utc::now());
        inv.set_reserved(15, Utc::now());

        assert!(inv.ensure_available(5).is_ok());
        match inv.ensure_available(6) {
            Err(AppError::InsufficientStock { requested, available }) => {
                assert_eq!((requested, available), (6, 5));
            }
            other => panic!("esperava InsufficientStock, veio {other:?}"),
        }
    }

    #[test]
    fn released_reservation_cannot_be_released_again() {
        let mut r = Reservation {
            id: Uuid::new_v4(),
            inventory_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            quantity: 3,
            reserved_price: Decimal::new(990, 2),
            status: ReservationStatus::Active,
            created_at: Utc::now(),
            released_at: None,
            release_reason: None,
        };

        r.release("cancelado", Utc::now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Released);
        assert!(r.released_at.is_some());
        assert!(matches!(r.release("de novo", Utc::now()), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn command_validation_rejects_bad_input() {
        let mut cmd = init_cmd(1);
        cmd.cost_per_unit = Decimal::NEGATIVE_ONE;
        assert!(cmd.validate().is_err());

        let mut adjust = AdjustInventory {
            inventory_id: Uuid::new_v4(),
            adjustment_quantity: 0,
            reason: "recontagem".into(),
            metadata: Value::Null,
            actor_id: Uuid::new_v4(),
        };
        let errors = adjust.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("adjustment_quantity"));
        adjust.adjustment_quantity = -4;
        assert!(adjust.validate().is_ok());

        let settings = UpdateInventorySettings {
            inventory_id: Uuid::new_v4(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
