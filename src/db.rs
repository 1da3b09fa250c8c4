pub mod store;
pub use store::{LedgerStore, LedgerTx};
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod warehouse_repo;
pub use warehouse_repo::WarehouseRepository;
pub mod postgres;
pub use postgres::PgLedgerStore;
pub mod memory;
pub use memory::InMemoryLedgerStore;
