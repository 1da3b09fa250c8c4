// src/services/inventory_service.rs

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{LedgerStore, LedgerTx},
    models::{
        history::{HistoryEventType, NewHistoryEntry},
        inventory::{
            AdjustInventory, Batch, DamageRecord, FulfillReservation, InitializeInventory, Inventory,
            InventoryChange, InventoryView, RecordDamage, Reservation, ReservationChange,
            ReservationStatus, ReserveInventory, StockIn, StockOut, StockReceipt, Fulfillment,
            UnreserveInventory, UpdateInventorySettings,
        },
    },
};

/// Motor do livro-razão: toda mutação de quantidade passa por aqui.
///
/// Cada operação valida a entrada antes de abrir a transação, trava a linha
/// de estoque, aplica a mudança, grava o histórico e faz commit. Qualquer erro
/// depois do bloqueio descarta a transação inteira.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn LedgerStore>,
}

// Trava a linha ou devolve 404.
async fn lock_existing(tx: &mut dyn LedgerTx, inventory_id: Uuid) -> Result<Inventory, AppError> {
    tx.lock_inventory(inventory_id)
        .await?
        .ok_or(AppError::InventoryNotFound(inventory_id))
}

fn overflow(field: &'static str) -> AppError {
    AppError::invalid_field(field, "overflow", "A quantidade excede o limite suportado.")
}

impl InventoryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // --- INICIALIZAÇÃO ---
    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id, warehouse_id = %cmd.warehouse_id),
        err(level = "warn")
    )]
    pub async fn initialize_inventory(&self, cmd: InitializeInventory) -> Result<InventoryChange, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;

        let warehouse = tx
            .find_warehouse(cmd.warehouse_id)
            .await?
            .ok_or(AppError::WarehouseNotFound(cmd.warehouse_id))?;
        if !warehouse.is_active {
            return Err(AppError::invalid_field(
                "warehouse_id",
                "inactive",
                "O armazém está desativado.",
            ));
        }

        let inventory = Inventory::new(&cmd, Utc::now());
        tx.insert_inventory(&inventory).await?;

        let entry = tx
            .append_history(
                NewHistoryEntry::new(
                    inventory.id,
                    HistoryEventType::StockIn,
                    0,
                    inventory.quantity_on_hand,
                    cmd.actor_id,
                )
                .reason("Saldo inicial"),
            )
            .await?;

        tx.commit().await?;

        info!(inventory_id = %inventory.id, on_hand = inventory.quantity_on_hand, "estoque inicializado");
        Ok(InventoryChange { inventory: inventory.into(), entry })
    }

    // --- ENTRADA (STOCK IN) ---
    #[instrument(
        skip(self, cmd),
        fields(inventory_id = %cmd.inventory_id, quantity = cmd.quantity),
        err(level = "warn")
    )]
    pub async fn stock_in(&self, cmd: StockIn) -> Result<StockReceipt, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        let now = Utc::now();
        let before = inventory.quantity_on_hand;
        let after = before.checked_add(cmd.quantity).ok_or_else(|| overflow("quantity"))?;
        inventory.set_on_hand(after, now);

        let batch = Batch {
            id: Uuid::new_v4(),
            inventory_id: inventory.id,
            batch_number: cmd.batch_number.clone(),
            quantity: cmd.quantity,
            remaining_quantity: cmd.quantity,
            cost_per_unit: cmd.cost_per_unit,
            received_date: cmd.received_date.unwrap_or(now),
            supplier: cmd.supplier.clone(),
            reference: cmd.reference.clone(),
            expiry_date: cmd.expiry_date,
            created_at: now,
        };

        tx.update_inventory(&inventory).await?;
        tx.insert_batch(&batch).await?;

        let reason = match &cmd.reference {
            Some(reference) => format!("Entrada do lote {} ({})", batch.batch_number, reference),
            None => format!("Entrada do lote {}", batch.batch_number),
        };
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::StockIn, before, after, cmd.actor_id)
                    .reason(reason)
                    .batch(Some(batch.id))
                    .metadata(cmd.metadata),
            )
            .await?;

        tx.commit().await?;

        info!(batch_id = %batch.id, on_hand = after, "entrada registrada");
        Ok(StockReceipt { inventory: inventory.into(), batch, entry })
    }

    // --- SAÍDA DIRETA (STOCK OUT) ---
    #[instrument(
        skip(self, cmd),
        fields(inventory_id = %cmd.inventory_id, quantity = cmd.quantity),
        err(level = "warn")
    )]
    pub async fn stock_out(&self, cmd: StockOut) -> Result<InventoryChange, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        // Só o disponível (físico - reservado) pode sair sem reserva
        inventory.ensure_available(cmd.quantity)?;

        let before = inventory.quantity_on_hand;
        let after = before - cmd.quantity;
        inventory.set_on_hand(after, Utc::now());

        tx.update_inventory(&inventory).await?;
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::StockOut, before, after, cmd.actor_id)
                    .reason(cmd.reason)
                    .order(cmd.order_id)
                    .metadata(cmd.metadata),
            )
            .await?;

        tx.commit().await?;

        info!(on_hand = after, "saída registrada");
        Ok(InventoryChange { inventory: inventory.into(), entry })
    }

    // --- RESERVA ---
    #[instrument(
        skip(self, cmd),
        fields(inventory_id = %cmd.inventory_id, order_id = %cmd.order_id, quantity = cmd.quantity),
        err(level = "warn")
    )]
    pub async fn reserve_inventory(&self, cmd: ReserveInventory) -> Result<ReservationChange, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;

        // 1. Trava a linha: reservas concorrentes na mesma linha esperam aqui
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        // 2. Valida contra o saldo visto sob o bloqueio
        inventory.ensure_available(cmd.quantity)?;

        let now = Utc::now();
        let before = inventory.quantity_reserved;
        let after = before + cmd.quantity;
        inventory.set_reserved(after, now);

        let reservation = Reservation {
            id: Uuid::new_v4(),
            inventory_id: inventory.id,
            order_id: cmd.order_id,
            quantity: cmd.quantity,
            reserved_price: cmd.reserved_price,
            status: ReservationStatus::Active,
            created_at: now,
            released_at: None,
            release_reason: None,
        };

        // 3. Saldo, reserva e histórico no mesmo commit
        tx.update_inventory(&inventory).await?;
        tx.insert_reservation(&reservation).await?;
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::Reserve, before, after, cmd.actor_id)
                    .order(Some(cmd.order_id))
                    .reservation(reservation.id),
            )
            .await?;

        tx.commit().await?;

        info!(reservation_id = %reservation.id, reserved = after, "reserva criada");
        Ok(ReservationChange { inventory: inventory.into(), reservation, entry })
    }

    // --- LIBERAÇÃO DE RESERVA ---
    #[instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id), err(level = "warn"))]
    pub async fn unreserve_inventory(&self, cmd: UnreserveInventory) -> Result<ReservationChange, AppError> {
        cmd.validate()?;

        let (mut tx, mut inventory, mut reservation) = self.lock_reservation(cmd.reservation_id).await?;

        let now = Utc::now();
        reservation.release(&cmd.reason, now)?;

        let before = inventory.quantity_reserved;
        let after = released_balance(before, reservation.quantity)?;
        inventory.set_reserved(after, now);

        tx.update_inventory(&inventory).await?;
        tx.update_reservation(&reservation).await?;
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::Unreserve, before, after, cmd.actor_id)
                    .reason(cmd.reason)
                    .order(Some(reservation.order_id))
                    .reservation(reservation.id),
            )
            .await?;

        tx.commit().await?;

        info!(inventory_id = %inventory.id, reserved = after, "reserva liberada");
        Ok(ReservationChange { inventory: inventory.into(), reservation, entry })
    }

    // --- ATENDIMENTO (consome a reserva e baixa o físico) ---
    #[instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id), err(level = "warn"))]
    pub async fn fulfill_reservation(&self, cmd: FulfillReservation) -> Result<Fulfillment, AppError> {
        cmd.validate()?;

        let (mut tx, mut inventory, mut reservation) = self.lock_reservation(cmd.reservation_id).await?;

        let now = Utc::now();
        reservation.release("fulfilled", now)?;

        let reserved_before = inventory.quantity_reserved;
        let reserved_after = released_balance(reserved_before, reservation.quantity)?;
        let on_hand_before = inventory.quantity_on_hand;
        let on_hand_after = released_balance(on_hand_before, reservation.quantity)?;

        inventory.set_reserved(reserved_after, now);
        inventory.set_on_hand(on_hand_after, now);

        tx.update_inventory(&inventory).await?;
        tx.update_reservation(&reservation).await?;

        let release = tx
            .append_history(
                NewHistoryEntry::new(
                    inventory.id,
                    HistoryEventType::Unreserve,
                    reserved_before,
                    reserved_after,
                    cmd.actor_id,
                )
                .reason("Reserva consumida no atendimento")
                .order(Some(reservation.order_id))
                .reservation(reservation.id),
            )
            .await?;
        let shipment = tx
            .append_history(
                NewHistoryEntry::new(
                    inventory.id,
                    HistoryEventType::StockOut,
                    on_hand_before,
                    on_hand_after,
                    cmd.actor_id,
                )
                .reason(format!("Atendimento do pedido {}", reservation.order_id))
                .order(Some(reservation.order_id))
                .reservation(reservation.id)
                .metadata(cmd.metadata),
            )
            .await?;

        tx.commit().await?;

        info!(inventory_id = %inventory.id, on_hand = on_hand_after, "reserva atendida");
        Ok(Fulfillment {
            inventory: inventory.into(),
            reservation,
            entries: vec![release, shipment],
        })
    }

    // --- AJUSTE MANUAL (recontagem, quebra) ---
    #[instrument(
        skip(self, cmd),
        fields(inventory_id = %cmd.inventory_id, adjustment = cmd.adjustment_quantity),
        err(level = "warn")
    )]
    pub async fn adjust_inventory(&self, cmd: AdjustInventory) -> Result<InventoryChange, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        let before = inventory.quantity_on_hand;
        let after = before
            .checked_add(cmd.adjustment_quantity)
            .ok_or_else(|| overflow("adjustment_quantity"))?;

        if after < 0 {
            return Err(AppError::invalid_field(
                "adjustment_quantity",
                "negative_on_hand",
                format!("O ajuste deixaria o saldo negativo ({after})."),
            ));
        }
        // O ajuste nunca pode deixar o físico abaixo do que já foi prometido
        if after < inventory.quantity_reserved {
            return Err(AppError::invalid_field(
                "adjustment_quantity",
                "below_reserved",
                format!(
                    "O ajuste deixaria o saldo ({after}) abaixo do reservado ({}).",
                    inventory.quantity_reserved
                ),
            ));
        }

        inventory.set_on_hand(after, Utc::now());

        tx.update_inventory(&inventory).await?;
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::Adjust, before, after, cmd.actor_id)
                    .reason(cmd.reason)
                    .metadata(cmd.metadata),
            )
            .await?;

        tx.commit().await?;

        info!(on_hand = after, "ajuste registrado");
        Ok(InventoryChange { inventory: inventory.into(), entry })
    }

    // --- AVARIA ---
    #[instrument(
        skip(self, cmd),
        fields(inventory_id = %cmd.inventory_id, quantity = cmd.quantity),
        err(level = "warn")
    )]
    pub async fn record_damage(&self, cmd: RecordDamage) -> Result<DamageRecord, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        // 1. Resolve o lote antes de olhar saldo: lote de outra linha é 404
        let batch = match cmd.batch_id {
            Some(batch_id) => Some(
                tx.find_batch(batch_id)
                    .await?
                    .filter(|b| b.inventory_id == inventory.id)
                    .ok_or(AppError::BatchNotFound(batch_id))?,
            ),
            None => None,
        };

        // 2. Avaria não pode tirar unidades já prometidas a um pedido
        inventory.ensure_available(cmd.quantity)?;

        // 3. Baixa o restante do lote
        let batch = match batch {
            Some(mut batch) => {
                if cmd.quantity > batch.remaining_quantity {
                    return Err(AppError::InsufficientStock {
                        requested: cmd.quantity,
                        available: batch.remaining_quantity,
                    });
                }
                batch.remaining_quantity -= cmd.quantity;
                tx.update_batch(&batch).await?;
                Some(batch)
            }
            None => None,
        };

        let before = inventory.quantity_on_hand;
        let after = before - cmd.quantity;
        inventory.set_on_hand(after, Utc::now());
        inventory.quantity_defective += cmd.quantity;

        tx.update_inventory(&inventory).await?;
        let entry = tx
            .append_history(
                NewHistoryEntry::new(inventory.id, HistoryEventType::Damage, before, after, cmd.actor_id)
                    .reason(cmd.reason)
                    .batch(cmd.batch_id)
                    .metadata(cmd.metadata),
            )
            .await?;

        tx.commit().await?;

        info!(on_hand = after, defective = inventory.quantity_defective, "avaria registrada");
        Ok(DamageRecord { inventory: inventory.into(), batch, entry })
    }

    // --- PARÂMETROS DE REPOSIÇÃO / CUSTO ---
    // Não mexe em quantidades, então não gera histórico.
    #[instrument(skip(self, cmd), fields(inventory_id = %cmd.inventory_id), err(level = "warn"))]
    pub async fn update_inventory_settings(&self, cmd: UpdateInventorySettings) -> Result<InventoryView, AppError> {
        cmd.validate()?;

        let mut tx = self.store.begin().await?;
        let mut inventory = lock_existing(tx.as_mut(), cmd.inventory_id).await?;

        if let Some(level) = cmd.reorder_level {
            inventory.reorder_level = level;
        }
        if let Some(quantity) = cmd.reorder_quantity {
            inventory.reorder_quantity = quantity;
        }
        if let Some(cost) = cmd.cost_per_unit {
            inventory.cost_per_unit = cost;
        }
        inventory.updated_at = Utc::now();

        tx.update_inventory(&inventory).await?;
        tx.commit().await?;

        Ok(inventory.into())
    }

    /// Abre a transação, trava a linha dona da reserva e relê a reserva sob o bloqueio.
    async fn lock_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<(Box<dyn LedgerTx>, Inventory, Reservation), AppError> {
        // Leitura sem bloqueio só para descobrir a linha de estoque
        let peek = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or(AppError::ReservationNotFound(reservation_id))?;

        let mut tx = self.store.begin().await?;
        let inventory = lock_existing(tx.as_mut(), peek.inventory_id).await?;

        // Toda mudança de reserva passa pelo bloqueio da linha, então esta leitura é a definitiva
        let reservation = tx
            .find_reservation(reservation_id)
            .await?
            .ok_or(AppError::ReservationNotFound(reservation_id))?;

        Ok((tx, inventory, reservation))
    }
}

fn released_balance(current: i64, released: i64) -> Result<i64, AppError> {
    let after = current - released;
    if after < 0 {
        return Err(AppError::InternalServerError(anyhow::anyhow!(
            "saldo ficaria negativo ao liberar {released} de {current}"
        )));
    }
    Ok(after)
}
