// src/services/history_service.rs

use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::{
        history::{replay, AuditReport, HistoryPage},
        inventory::Inventory,
    },
};

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Trilha de auditoria: leitura paginada e conferência do saldo contra o histórico.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn LedgerStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Mais recentes primeiro. `total` conta todas as entradas da linha.
    pub async fn get_inventory_history(
        &self,
        inventory_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<HistoryPage, AppError> {
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(AppError::invalid_field(
                "limit",
                "range",
                format!("O limite deve estar entre 1 e {MAX_HISTORY_LIMIT}."),
            ));
        }
        if offset < 0 {
            return Err(AppError::invalid_field("offset", "range", "O deslocamento não pode ser negativo."));
        }

        self.find_inventory(inventory_id).await?;

        let (entries, total) = self.store.list_history(inventory_id, limit, offset).await?;
        Ok(HistoryPage { entries, total, limit, offset })
    }

    /// Reaplica o histórico desde zero e compara com o saldo gravado.
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn audit_inventory(&self, inventory_id: Uuid) -> Result<AuditReport, AppError> {
        let inventory = self.find_inventory(inventory_id).await?;
        let entries = self.store.full_history(inventory_id).await?;

        let (on_hand, reserved) = replay(&entries);
        let report = AuditReport {
            inventory_id,
            entries: entries.len(),
            reconstructed_on_hand: on_hand,
            stored_on_hand: inventory.quantity_on_hand,
            reconstructed_reserved: reserved,
            stored_reserved: inventory.quantity_reserved,
            consistent: on_hand == inventory.quantity_on_hand && reserved == inventory.quantity_reserved,
        };

        if !report.consistent {
            warn!(
                reconstructed_on_hand = on_hand,
                stored_on_hand = inventory.quantity_on_hand,
                reconstructed_reserved = reserved,
                stored_reserved = inventory.quantity_reserved,
                "saldo divergente do histórico"
            );
        }
        Ok(report)
    }

    async fn find_inventory(&self, inventory_id: Uuid) -> Result<Inventory, AppError> {
        self.store
            .find_inventory(inventory_id)
            .await?
            .ok_or(AppError::InventoryNotFound(inventory_id))
    }
}
