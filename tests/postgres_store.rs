//! Testes do livro-razão contra o PostgreSQL de verdade.
//!
//! Precisam de `DATABASE_URL` apontando para um servidor onde o usuário possa
//! criar bancos: cada teste roda num banco novo com as migrações aplicadas.
//! Rode com `cargo test --test postgres_store -- --ignored`.

mod common;

use std::{sync::Arc, time::Duration};

use rust_decimal::Decimal;
use sqlx::PgPool;
use stock_ledger::{
    common::error::{AppError, ErrorKind},
    db::{LedgerStore, PgLedgerStore},
    models::inventory::{ReservationStatus, UnreserveInventory},
};

use common::{ledger_on, Ledger};

fn pg_ledger(pool: &PgPool, lock_timeout: Duration) -> Ledger {
    ledger_on(Arc::new(PgLedgerStore::new(pool.clone(), lock_timeout)))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL com PostgreSQL"]
async fn concurrent_reservations_never_oversell_on_postgres(pool: PgPool) {
    const AVAILABLE: i64 = 100;
    const REQUESTS: i64 = 10;
    let per_request = AVAILABLE / REQUESTS + 1;

    let ledger = Arc::new(pg_ledger(&pool, Duration::from_secs(5)));
    let warehouse = ledger.warehouse("PG-RACE").await;
    let inventory_id = ledger.inventory(warehouse.id, AVAILABLE, 0).await.id;

    let mut handles = Vec::new();
    for _ in 0..REQUESTS {
        let ledger = ledger.clone();
        let cmd = ledger.reserve_cmd(inventory_id, per_request);
        handles.push(tokio::spawn(async move {
            ledger.state.inventory_service.reserve_inventory(cmd).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientStock, "{err}"),
        }
    }
    assert_eq!(succeeded, AVAILABLE / per_request);

    let row = ledger.state.warehouse_service.get_inventory(inventory_id).await.unwrap();
    assert_eq!(row.inventory.quantity_reserved, succeeded * per_request);

    let audit = ledger.state.history_service.audit_inventory(inventory_id).await.unwrap();
    assert!(audit.consistent, "{audit:?}");
    assert_eq!(audit.entries as i64, succeeded + 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL com PostgreSQL"]
async fn unique_pair_is_a_duplicate_inventory_on_postgres(pool: PgPool) {
    let ledger = pg_ledger(&pool, Duration::from_secs(5));
    let warehouse = ledger.warehouse("PG-DUP").await;
    let cmd = ledger.init_cmd(warehouse.id, 10, 0);
    let product_id = cmd.product_id;

    ledger.state.inventory_service.initialize_inventory(cmd).await.unwrap();

    let mut again = ledger.init_cmd(warehouse.id, 3, 0);
    again.product_id = product_id;
    let err = ledger.state.inventory_service.initialize_inventory(again).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateInventory { .. }), "{err:?}");

    // A tentativa falha não deixa rastro no histórico
    let product = ledger.state.warehouse_service.get_product_inventory(product_id).await.unwrap();
    assert_eq!(product.locations.len(), 1);
    let history = ledger
        .state
        .history_service
        .get_inventory_history(product.locations[0].id, 50, 0)
        .await
        .unwrap();
    assert_eq!(history.total, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL com PostgreSQL"]
async fn lock_wait_past_timeout_is_a_concurrency_timeout_on_postgres(pool: PgPool) {
    let ledger = pg_ledger(&pool, Duration::from_millis(100));
    let holder_store = PgLedgerStore::new(pool.clone(), Duration::from_secs(5));
    let warehouse = ledger.warehouse("PG-LOCK").await;
    let inventory_id = ledger.inventory(warehouse.id, 10, 0).await.id;

    let mut holder = holder_store.begin().await.unwrap();
    holder.lock_inventory(inventory_id).await.unwrap().unwrap();

    let err = ledger
        .state
        .inventory_service
        .reserve_inventory(ledger.reserve_cmd(inventory_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrencyTimeout), "{err:?}");
    assert!(err.is_retryable());

    holder.commit().await.unwrap();
    ledger
        .state
        .inventory_service
        .reserve_inventory(ledger.reserve_cmd(inventory_id, 1))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL com PostgreSQL"]
async fn read_filters_and_summary_on_postgres(pool: PgPool) {
    let ledger = pg_ledger(&pool, Duration::from_secs(5));
    let engine = &ledger.state.inventory_service;
    let reads = &ledger.state.warehouse_service;
    let warehouse = ledger.warehouse("PG-SUM").await;
    let full = ledger.inventory(warehouse.id, 100, 0).await;
    let low = ledger.inventory(warehouse.id, 5, 10).await;

    let kept = engine.reserve_inventory(ledger.reserve_cmd(full.id, 4)).await.unwrap().reservation;
    let released = engine.reserve_inventory(ledger.reserve_cmd(full.id, 6)).await.unwrap().reservation;
    engine
        .unreserve_inventory(UnreserveInventory {
            reservation_id: released.id,
            reason: "pedido cancelado".into(),
            actor_id: ledger.actor,
        })
        .await
        .unwrap();

    let all = reads.list_reservations(full.id, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let active = reads.list_reservations(full.id, Some(ReservationStatus::Active)).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, kept.id);

    let everywhere = reads.get_low_stock_items(None).await.unwrap();
    assert_eq!(everywhere.len(), 1);
    assert_eq!(everywhere[0].id, low.id);
    let scoped = reads.get_low_stock_items(Some(warehouse.id)).await.unwrap();
    assert_eq!(scoped.len(), 1);

    let summary = reads.get_warehouse_inventory_summary(warehouse.id).await.unwrap();
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.total_quantity, 105);
    assert_eq!(summary.total_reserved, 4);
    assert_eq!(summary.total_defective, 0);
    assert_eq!(summary.total_value, Decimal::new(105000, 2));
    assert_eq!(summary.low_stock_items, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL com PostgreSQL"]
async fn history_rows_cannot_be_rewritten(pool: PgPool) {
    let ledger = pg_ledger(&pool, Duration::from_secs(5));
    let warehouse = ledger.warehouse("PG-HIST").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;

    let update = sqlx::query("UPDATE inventory_history SET reason = 'editado' WHERE inventory_id = $1")
        .bind(inv.id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM inventory_history WHERE inventory_id = $1")
        .bind(inv.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());

    let audit = ledger.state.history_service.audit_inventory(inv.id).await.unwrap();
    assert!(audit.consistent);
    assert_eq!(audit.entries, 1);
}
