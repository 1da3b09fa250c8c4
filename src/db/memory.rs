// src/db/memory.rs

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{LedgerStore, LedgerTx},
    models::{
        history::{HistoryEntry, NewHistoryEntry},
        inventory::{Batch, Inventory, Reservation, ReservationStatus},
        warehouse::{Warehouse, WarehouseInventorySummary},
    },
};

#[derive(Default)]
struct LedgerState {
    warehouses: HashMap<Uuid, Warehouse>,
    inventories: HashMap<Uuid, Inventory>,
    // Índice único (produto, armazém), incluindo inserções ainda não confirmadas.
    pairs: HashSet<(Uuid, Uuid)>,
    reservations: HashMap<Uuid, Reservation>,
    batches: HashMap<Uuid, Batch>,
    history: Vec<HistoryEntry>,
}

struct Shared {
    state: Mutex<LedgerState>,
    row_locks: Mutex<HashMap<Uuid, Arc<RowLock<()>>>>,
    history_seq: AtomicI64,
    lock_timeout: Duration,
}

impl Shared {
    fn state(&self) -> Result<MutexGuard<'_, LedgerState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("lock poisoned")))
    }

    fn row_lock(&self, id: Uuid) -> Result<Arc<RowLock<()>>, AppError> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("lock poisoned")))?;
        Ok(locks.entry(id).or_default().clone())
    }

    // Descarta mutexes de linha que ninguém mais segura nem espera.
    fn prune_row_locks(&self, ids: impl IntoIterator<Item = Uuid>) {
        if let Ok(mut locks) = self.row_locks.lock() {
            for id in ids {
                if locks.get(&id).is_some_and(|row| Arc::strong_count(row) == 1) {
                    locks.remove(&id);
                }
            }
        }
    }
}

/// Livro-razão em memória, para testes e desenvolvimento local.
///
/// Reproduz a disciplina do PostgreSQL: um mutex assíncrono por linha de
/// estoque, adquirido com tempo limite e mantido até o commit; as escritas da
/// transação ficam num rascunho e só aparecem para os outros no commit.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LedgerState::default()),
                row_locks: Mutex::new(HashMap::new()),
                history_seq: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }
}

pub struct InMemoryLedgerTx {
    shared: Arc<Shared>,
    guards: HashMap<Uuid, OwnedMutexGuard<()>>,
    claimed_pairs: Vec<(Uuid, Uuid)>,
    inventories: HashMap<Uuid, Inventory>,
    reservations: HashMap<Uuid, Reservation>,
    batches: HashMap<Uuid, Batch>,
    history: Vec<HistoryEntry>,
    committed: bool,
}

impl Drop for InMemoryLedgerTx {
    fn drop(&mut self) {
        // Rollback: devolve as chaves únicas reservadas; os guards soltam as linhas.
        if !self.committed && !self.claimed_pairs.is_empty() {
            if let Ok(mut state) = self.shared.state.lock() {
                for pair in &self.claimed_pairs {
                    state.pairs.remove(pair);
                }
            }
        }

        let released: Vec<Uuid> = self.guards.drain().map(|(id, _guard)| id).collect();
        self.shared.prune_row_locks(released);
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, AppError> {
        Ok(Box::new(InMemoryLedgerTx {
            shared: self.shared.clone(),
            guards: HashMap::new(),
            claimed_pairs: Vec::new(),
            inventories: HashMap::new(),
            reservations: HashMap::new(),
            batches: HashMap::new(),
            history: Vec::new(),
            committed: false,
        }))
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> Result<(), AppError> {
        let mut state = self.shared.state()?;
        if state.warehouses.values().any(|w| w.code == warehouse.code) {
            return Err(AppError::WarehouseCodeAlreadyExists(warehouse.code.clone()));
        }
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn find_warehouse(&self, id: Uuid) -> Result<Option<Warehouse>, AppError> {
        Ok(self.shared.state()?.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, AppError> {
        let mut warehouses: Vec<Warehouse> = self.shared.state()?.warehouses.values().cloned().collect();
        warehouses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(warehouses)
    }

    async fn set_warehouse_active(&self, id: Uuid, active: bool) -> Result<Option<Warehouse>, AppError> {
        let mut state = self.shared.state()?;
        Ok(state.warehouses.get_mut(&id).map(|w| {
            w.is_active = active;
            w.updated_at = Utc::now();
            w.clone()
        }))
    }

    async fn find_inventory(&self, id: Uuid) -> Result<Option<Inventory>, AppError> {
        Ok(self.shared.state()?.inventories.get(&id).cloned())
    }

    async fn list_product_inventory(&self, product_id: Uuid) -> Result<Vec<Inventory>, AppError> {
        let mut rows: Vec<Inventory> = self
            .shared
            .state()?
            .inventories
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.created_at);
        Ok(rows)
    }

    async fn list_low_stock(&self, warehouse_id: Option<Uuid>) -> Result<Vec<Inventory>, AppError> {
        let mut rows: Vec<Inventory> = self
            .shared
            .state()?
            .inventories
            .values()
            .filter(|i| i.is_low_stock())
            .filter(|i| warehouse_id.is_none_or(|w| i.warehouse_id == w))
            .cloned()
            .collect();
        rows.sort_by_key(|i| (i.quantity_on_hand, i.created_at));
        Ok(rows)
    }

    async fn warehouse_summary(&self, warehouse_id: Uuid) -> Result<WarehouseInventorySummary, AppError> {
        let state = self.shared.state()?;
        let rows: Vec<&Inventory> = state
            .inventories
            .values()
            .filter(|i| i.warehouse_id == warehouse_id)
            .collect();

        let products: HashSet<Uuid> = rows.iter().map(|i| i.product_id).collect();
        Ok(WarehouseInventorySummary {
            warehouse_id,
            total_items: products.len() as i64,
            total_quantity: rows.iter().map(|i| i.quantity_on_hand).sum(),
            total_reserved: rows.iter().map(|i| i.quantity_reserved).sum(),
            total_defective: rows.iter().map(|i| i.quantity_defective).sum(),
            total_value: rows
                .iter()
                .map(|i| Decimal::from(i.quantity_on_hand) * i.cost_per_unit)
                .sum(),
            low_stock_items: rows.iter().filter(|i| i.is_low_stock()).count() as i64,
        })
    }

    async fn list_expiring_batches(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Batch>, AppError> {
        let mut rows: Vec<Batch> = self
            .shared
            .state()?
            .batches
            .values()
            .filter(|b| b.expiry_date.is_some_and(|d| d >= from && d <= until))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.expiry_date, &a.batch_number).cmp(&(b.expiry_date, &b.batch_number)));
        Ok(rows)
    }

    async fn list_batches(&self, inventory_id: Uuid) -> Result<Vec<Batch>, AppError> {
        let mut rows: Vec<Batch> = self
            .shared
            .state()?
            .batches
            .values()
            .filter(|b| b.inventory_id == inventory_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.received_date, b.created_at));
        Ok(rows)
    }

    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.shared.state()?.reservations.get(&id).cloned())
    }

    async fn list_reservations(
        &self,
        inventory_id: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, AppError> {
        let mut rows: Vec<Reservation> = self
            .shared
            .state()?
            .reservations
            .values()
            .filter(|r| r.inventory_id == inventory_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_history(
        &self,
        inventory_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<HistoryEntry>, i64), AppError> {
        let state = self.shared.state()?;
        let mut rows: Vec<&HistoryEntry> = state
            .history
            .iter()
            .filter(|e| e.inventory_id == inventory_id)
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn full_history(&self, inventory_id: Uuid) -> Result<Vec<HistoryEntry>, AppError> {
        let mut rows: Vec<HistoryEntry> = self
            .shared
            .state()?
            .history
            .iter()
            .filter(|e| e.inventory_id == inventory_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn find_warehouse(&mut self, id: Uuid) -> Result<Option<Warehouse>, AppError> {
        Ok(self.shared.state()?.warehouses.get(&id).cloned())
    }

    async fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError> {
        let pair = (inventory.product_id, inventory.warehouse_id);
        {
            let mut state = self.shared.state()?;
            if !state.pairs.insert(pair) {
                return Err(AppError::DuplicateInventory {
                    product_id: inventory.product_id,
                    warehouse_id: inventory.warehouse_id,
                });
            }
        }
        self.claimed_pairs.push(pair);
        self.inventories.insert(inventory.id, inventory.clone());
        Ok(())
    }

    async fn lock_inventory(&mut self, id: Uuid) -> Result<Option<Inventory>, AppError> {
        if !self.guards.contains_key(&id) {
            let row = self.shared.row_lock(id)?;
            let acquired = tokio::time::timeout(self.shared.lock_timeout, row.lock_owned()).await;
            let guard = match acquired {
                Ok(guard) => guard,
                Err(_) => {
                    self.shared.prune_row_locks([id]);
                    return Err(AppError::ConcurrencyTimeout);
                }
            };
            self.guards.insert(id, guard);
        }

        if let Some(staged) = self.inventories.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.state()?.inventories.get(&id).cloned())
    }

    async fn update_inventory(&mut self, inventory: &Inventory) -> Result<(), AppError> {
        self.inventories.insert(inventory.id, inventory.clone());
        Ok(())
    }

    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        if let Some(staged) = self.reservations.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.state()?.reservations.get(&id).cloned())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn find_batch(&mut self, id: Uuid) -> Result<Option<Batch>, AppError> {
        if let Some(staged) = self.batches.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.state()?.batches.get(&id).cloned())
    }

    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), AppError> {
        self.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn update_batch(&mut self, batch: &Batch) -> Result<(), AppError> {
        self.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<HistoryEntry, AppError> {
        let id = self.shared.history_seq.fetch_add(1, Ordering::SeqCst);
        let stored = entry.into_entry(id);
        self.history.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut this = self;
        {
            let mut state = this.shared.state()?;
            state.inventories.extend(this.inventories.drain());
            state.reservations.extend(this.reservations.drain());
            state.batches.extend(this.batches.drain());
            state.history.append(&mut this.history);
        }
        this.committed = true;
        // Os guards caem junto com `self`, depois de tudo aplicado.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked_rows(store: &InMemoryLedgerStore) -> usize {
        store.shared.row_locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn row_locks_are_dropped_once_released() {
        let store = InMemoryLedgerStore::with_lock_timeout(Duration::from_millis(50));

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_inventory(Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(tracked_rows(&store), 1);
        drop(tx);
        assert_eq!(tracked_rows(&store), 0);

        let busy = Uuid::new_v4();
        let mut holder = store.begin().await.unwrap();
        holder.lock_inventory(busy).await.unwrap();

        let mut waiter = store.begin().await.unwrap();
        assert!(matches!(waiter.lock_inventory(busy).await, Err(AppError::ConcurrencyTimeout)));
        // O dono ainda segura a linha
        assert_eq!(tracked_rows(&store), 1);

        holder.commit().await.unwrap();
        drop(waiter);
        assert_eq!(tracked_rows(&store), 0);
    }
}
