#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use rust_decimal::Decimal;
use serde_json::Value;
use stock_ledger::{
    config::AppState,
    db::{InMemoryLedgerStore, LedgerStore},
    models::{
        inventory::{InitializeInventory, InventoryView, ReserveInventory, StockIn, StockOut},
        warehouse::{CreateWarehouse, Warehouse, WarehouseType},
    },
};
use uuid::Uuid;

pub struct Ledger {
    pub state: AppState,
    pub actor: Uuid,
}

pub fn ledger() -> Ledger {
    ledger_on(Arc::new(InMemoryLedgerStore::new()))
}

pub fn ledger_with_timeout(lock_timeout: Duration) -> (Ledger, InMemoryLedgerStore) {
    let store = InMemoryLedgerStore::with_lock_timeout(lock_timeout);
    (ledger_on(Arc::new(store.clone())), store)
}

pub fn ledger_on(store: Arc<dyn LedgerStore>) -> Ledger {
    Ledger {
        state: AppState::from_store(store),
        actor: Uuid::new_v4(),
    }
}

impl Ledger {
    pub async fn warehouse(&self, code: &str) -> Warehouse {
        self.state
            .warehouse_service
            .create_warehouse(CreateWarehouse {
                name: format!("Armazém {code}"),
                code: code.to_string(),
                warehouse_type: WarehouseType::Primary,
                max_capacity: None,
            })
            .await
            .unwrap()
    }

    pub fn init_cmd(&self, warehouse_id: Uuid, initial_quantity: i64, reorder_level: i64) -> InitializeInventory {
        InitializeInventory {
            product_id: Uuid::new_v4(),
            warehouse_id,
            initial_quantity,
            reorder_level,
            reorder_quantity: 50,
            cost_per_unit: Decimal::new(1000, 2),
            actor_id: self.actor,
        }
    }

    pub async fn inventory(&self, warehouse_id: Uuid, initial_quantity: i64, reorder_level: i64) -> InventoryView {
        self.state
            .inventory_service
            .initialize_inventory(self.init_cmd(warehouse_id, initial_quantity, reorder_level))
            .await
            .unwrap()
            .inventory
    }

    pub fn stock_in_cmd(&self, inventory_id: Uuid, quantity: i64, batch_number: &str) -> StockIn {
        StockIn {
            inventory_id,
            quantity,
            batch_number: batch_number.to_string(),
            cost_per_unit: Decimal::new(950, 2),
            received_date: None,
            supplier: Some("Fornecedor Sul".into()),
            reference: None,
            expiry_date: None,
            metadata: Value::Null,
            actor_id: self.actor,
        }
    }

    pub fn stock_out_cmd(&self, inventory_id: Uuid, quantity: i64) -> StockOut {
        StockOut {
            inventory_id,
            quantity,
            reason: "Venda".into(),
            order_id: None,
            metadata: Value::Null,
            actor_id: self.actor,
        }
    }

    pub fn reserve_cmd(&self, inventory_id: Uuid, quantity: i64) -> ReserveInventory {
        ReserveInventory {
            inventory_id,
            order_id: Uuid::new_v4(),
            quantity,
            reserved_price: Decimal::new(1999, 2),
            actor_id: self.actor,
        }
    }
}
