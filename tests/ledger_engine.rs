mod common;

use serde_json::json;
use stock_ledger::{
    common::error::{AppError, ErrorKind},
    models::{
        history::HistoryEventType,
        inventory::{
            AdjustInventory, FulfillReservation, RecordDamage, ReservationStatus, StockStatus,
            UnreserveInventory, UpdateInventorySettings,
        },
    },
};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use common::{ledger, Ledger};

fn adjust(ledger: &Ledger, inventory_id: Uuid, adjustment_quantity: i64) -> AdjustInventory {
    AdjustInventory {
        inventory_id,
        adjustment_quantity,
        reason: "Recontagem".into(),
        metadata: Value::Null,
        actor_id: ledger.actor,
    }
}

fn damage(ledger: &Ledger, inventory_id: Uuid, batch_id: Option<Uuid>, quantity: i64) -> RecordDamage {
    RecordDamage {
        inventory_id,
        batch_id,
        quantity,
        reason: "Embalagem rasgada".into(),
        metadata: Value::Null,
        actor_id: ledger.actor,
    }
}

fn unreserve(ledger: &Ledger, reservation_id: Uuid) -> UnreserveInventory {
    UnreserveInventory {
        reservation_id,
        reason: "Pedido cancelado".into(),
        actor_id: ledger.actor,
    }
}

#[tokio::test]
async fn full_lifecycle_matches_expected_balances() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-01").await;

    let inv = ledger.inventory(warehouse.id, 1000, 100).await;
    assert_eq!(inv.quantity_on_hand, 1000);
    assert_eq!(inv.stock_status, StockStatus::InStock);

    let receipt = engine.stock_in(ledger.stock_in_cmd(inv.id, 500, "L-001")).await.unwrap();
    assert_eq!(receipt.inventory.quantity_on_hand, 1500);
    assert_eq!(receipt.batch.remaining_quantity, 500);
    assert_eq!(receipt.entry.batch_id, Some(receipt.batch.id));

    let out = engine.stock_out(ledger.stock_out_cmd(inv.id, 100)).await.unwrap();
    assert_eq!(out.inventory.quantity_on_hand, 1400);

    let reserved = engine.reserve_inventory(ledger.reserve_cmd(inv.id, 100)).await.unwrap();
    assert_eq!(reserved.inventory.quantity_reserved, 100);
    assert_eq!(reserved.inventory.quantity_available, 1300);

    let released = engine
        .unreserve_inventory(unreserve(&ledger, reserved.reservation.id))
        .await
        .unwrap();
    assert_eq!(released.inventory.quantity_available, 1400);
    assert_eq!(released.reservation.status, ReservationStatus::Released);
    assert_eq!(released.reservation.release_reason.as_deref(), Some("Pedido cancelado"));

    let up = engine.adjust_inventory(adjust(&ledger, inv.id, 200)).await.unwrap();
    assert_eq!(up.inventory.quantity_on_hand, 1600);
    let down = engine.adjust_inventory(adjust(&ledger, inv.id, -50)).await.unwrap();
    assert_eq!(down.inventory.quantity_on_hand, 1550);

    let damaged = engine.record_damage(damage(&ledger, inv.id, None, 25)).await.unwrap();
    assert_eq!(damaged.inventory.quantity_on_hand, 1525);
    assert_eq!(damaged.inventory.quantity_defective, 25);

    let last = engine.stock_out(ledger.stock_out_cmd(inv.id, 1450)).await.unwrap();
    assert_eq!(last.inventory.quantity_on_hand, 75);
    assert!(last.inventory.low_stock);

    let low = ledger.state.warehouse_service.get_low_stock_items(None).await.unwrap();
    assert!(low.iter().any(|row| row.id == inv.id));

    let audit = ledger.state.history_service.audit_inventory(inv.id).await.unwrap();
    assert!(audit.consistent, "{audit:?}");
    assert_eq!(audit.entries, 9);
    assert_eq!(audit.reconstructed_on_hand, 75);
    assert_eq!(audit.reconstructed_reserved, 0);
}

#[tokio::test]
async fn second_initialization_of_same_pair_is_rejected() {
    let ledger = ledger();
    let warehouse = ledger.warehouse("CD-02").await;
    let cmd = ledger.init_cmd(warehouse.id, 10, 0);

    ledger.state.inventory_service.initialize_inventory(cmd.clone()).await.unwrap();
    let err = ledger.state.inventory_service.initialize_inventory(cmd).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateInventory);
}

#[tokio::test]
async fn initialization_requires_an_existing_warehouse() {
    let ledger = ledger();
    let missing = Uuid::new_v4();

    let err = ledger
        .state
        .inventory_service
        .initialize_inventory(ledger.init_cmd(missing, 10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WarehouseNotFound(id) if id == missing));
}

#[tokio::test]
async fn inactive_warehouse_cannot_receive_new_rows() {
    let ledger = ledger();
    let warehouse = ledger.warehouse("CD-03").await;
    ledger
        .state
        .warehouse_service
        .set_warehouse_active(warehouse.id, false)
        .await
        .unwrap();

    let err = ledger
        .state
        .inventory_service
        .initialize_inventory(ledger.init_cmd(warehouse.id, 10, 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn zero_initial_quantity_is_out_of_stock_with_history() {
    let ledger = ledger();
    let warehouse = ledger.warehouse("CD-04").await;

    let change = ledger
        .state
        .inventory_service
        .initialize_inventory(ledger.init_cmd(warehouse.id, 0, 5))
        .await
        .unwrap();

    assert_eq!(change.inventory.stock_status, StockStatus::OutOfStock);
    assert_eq!(change.entry.event_type, HistoryEventType::StockIn);
    assert_eq!((change.entry.quantity_before, change.entry.quantity_after), (0, 0));
}

#[tokio::test]
async fn stock_out_above_available_leaves_balance_untouched() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-05").await;
    let inv = ledger.inventory(warehouse.id, 20, 0).await;
    engine.reserve_inventory(ledger.reserve_cmd(inv.id, 15)).await.unwrap();

    let err = engine.stock_out(ledger.stock_out_cmd(inv.id, 6)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { requested: 6, available: 5 }));

    let after = ledger.state.warehouse_service.get_inventory(inv.id).await.unwrap();
    assert_eq!(after.inventory.quantity_on_hand, 20);
    assert_eq!(after.inventory.quantity_reserved, 15);

    let history = ledger.state.history_service.get_inventory_history(inv.id, 50, 0).await.unwrap();
    assert_eq!(history.total, 2);
}

#[tokio::test]
async fn stock_out_to_zero_flips_status() {
    let ledger = ledger();
    let warehouse = ledger.warehouse("CD-06").await;
    let inv = ledger.inventory(warehouse.id, 3, 0).await;

    let change = ledger
        .state
        .inventory_service
        .stock_out(ledger.stock_out_cmd(inv.id, 3))
        .await
        .unwrap();
    assert_eq!(change.inventory.stock_status, StockStatus::OutOfStock);
    assert_eq!(change.entry.quantity_delta, -3);
}

#[tokio::test]
async fn unknown_inventory_is_not_found() {
    let ledger = ledger();
    let missing = Uuid::new_v4();

    let err = ledger
        .state
        .inventory_service
        .stock_in(ledger.stock_in_cmd(missing, 5, "L-404"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InventoryNotFound(id) if id == missing));
}

#[tokio::test]
async fn invalid_quantities_are_rejected_before_touching_the_row() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-07").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;

    assert_eq!(
        engine.stock_in(ledger.stock_in_cmd(inv.id, 0, "L-0")).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        engine.reserve_inventory(ledger.reserve_cmd(inv.id, -1)).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        engine.adjust_inventory(adjust(&ledger, inv.id, 0)).await.unwrap_err().kind(),
        ErrorKind::Validation
    );

    let mut bad_metadata = ledger.stock_out_cmd(inv.id, 1);
    bad_metadata.metadata = json!([1, 2, 3]);
    assert_eq!(engine.stock_out(bad_metadata).await.unwrap_err().kind(), ErrorKind::Validation);

    let history = ledger.state.history_service.get_inventory_history(inv.id, 50, 0).await.unwrap();
    assert_eq!(history.total, 1);
}

#[tokio::test]
async fn releasing_twice_is_an_invalid_state() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-08").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;
    let reserved = engine.reserve_inventory(ledger.reserve_cmd(inv.id, 4)).await.unwrap();

    engine.unreserve_inventory(unreserve(&ledger, reserved.reservation.id)).await.unwrap();
    let err = engine
        .unreserve_inventory(unreserve(&ledger, reserved.reservation.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let row = ledger.state.warehouse_service.get_inventory(inv.id).await.unwrap();
    assert_eq!(row.inventory.quantity_reserved, 0);
}

#[tokio::test]
async fn unknown_reservation_is_not_found() {
    let ledger = ledger();
    let err = ledger
        .state
        .inventory_service
        .unreserve_inventory(unreserve(&ledger, Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn reservation_beyond_available_fails() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-09").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;
    engine.reserve_inventory(ledger.reserve_cmd(inv.id, 8)).await.unwrap();

    let err = engine.reserve_inventory(ledger.reserve_cmd(inv.id, 3)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { requested: 3, available: 2 }));
}

#[tokio::test]
async fn adjustment_cannot_go_negative_or_below_reserved() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-10").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;
    engine.reserve_inventory(ledger.reserve_cmd(inv.id, 6)).await.unwrap();

    let below_zero = engine.adjust_inventory(adjust(&ledger, inv.id, -11)).await.unwrap_err();
    assert_eq!(below_zero.kind(), ErrorKind::Validation);

    let below_reserved = engine.adjust_inventory(adjust(&ledger, inv.id, -5)).await.unwrap_err();
    match below_reserved {
        AppError::ValidationError(errors) => {
            assert!(errors.field_errors().contains_key("adjustment_quantity"));
        }
        other => panic!("esperava ValidationError, veio {other:?}"),
    }

    let exact = engine.adjust_inventory(adjust(&ledger, inv.id, -4)).await.unwrap();
    assert_eq!(exact.inventory.quantity_on_hand, 6);
    assert_eq!(exact.inventory.quantity_available, 0);
}

#[tokio::test]
async fn damage_against_a_batch_draws_down_remaining() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-11").await;
    let inv = ledger.inventory(warehouse.id, 0, 0).await;
    let receipt = engine.stock_in(ledger.stock_in_cmd(inv.id, 30, "L-DMG")).await.unwrap();

    let record = engine
        .record_damage(damage(&ledger, inv.id, Some(receipt.batch.id), 10))
        .await
        .unwrap();
    assert_eq!(record.batch.as_ref().map(|b| b.remaining_quantity), Some(20));
    assert_eq!(record.inventory.quantity_on_hand, 20);
    assert_eq!(record.inventory.quantity_defective, 10);
    assert_eq!(record.entry.event_type, HistoryEventType::Damage);
    assert_eq!(record.entry.batch_id, Some(receipt.batch.id));

    let batches = ledger.state.warehouse_service.list_batches(inv.id).await.unwrap();
    assert_eq!(batches[0].remaining_quantity, 20);
}

#[tokio::test]
async fn damage_rules_for_batches_and_reservations() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-12").await;
    let inv = ledger.inventory(warehouse.id, 0, 0).await;
    let other = ledger.inventory(warehouse.id, 0, 0).await;
    let batch = engine.stock_in(ledger.stock_in_cmd(inv.id, 10, "L-A")).await.unwrap().batch;
    engine.stock_in(ledger.stock_in_cmd(inv.id, 10, "L-B")).await.unwrap();

    // Lote de outra linha conta como inexistente
    let foreign = engine.record_damage(damage(&ledger, other.id, Some(batch.id), 1)).await.unwrap_err();
    assert_eq!(foreign.kind(), ErrorKind::NotFound);
    let missing = engine.record_damage(damage(&ledger, inv.id, Some(Uuid::new_v4()), 1)).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let too_much = engine.record_damage(damage(&ledger, inv.id, Some(batch.id), 11)).await.unwrap_err();
    assert!(matches!(too_much, AppError::InsufficientStock { requested: 11, available: 10 }));

    // Reservado não pode ser avariado
    engine.reserve_inventory(ledger.reserve_cmd(inv.id, 15)).await.unwrap();
    let reserved = engine.record_damage(damage(&ledger, inv.id, None, 6)).await.unwrap_err();
    assert!(matches!(reserved, AppError::InsufficientStock { requested: 6, available: 5 }));

    let row = ledger.state.warehouse_service.get_inventory(inv.id).await.unwrap();
    assert_eq!(row.inventory.quantity_on_hand, 20);
    assert_eq!(row.inventory.quantity_defective, 0);
}

#[tokio::test]
async fn fulfilment_consumes_reservation_and_ships() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-13").await;
    let inv = ledger.inventory(warehouse.id, 50, 0).await;
    let reserved = engine.reserve_inventory(ledger.reserve_cmd(inv.id, 20)).await.unwrap();

    let fulfilment = engine
        .fulfill_reservation(FulfillReservation {
            reservation_id: reserved.reservation.id,
            metadata: json!({ "carrier": "Correios" }),
            actor_id: ledger.actor,
        })
        .await
        .unwrap();

    assert_eq!(fulfilment.inventory.quantity_on_hand, 30);
    assert_eq!(fulfilment.inventory.quantity_reserved, 0);
    assert_eq!(fulfilment.reservation.status, ReservationStatus::Released);
    assert_eq!(fulfilment.reservation.release_reason.as_deref(), Some("fulfilled"));

    let kinds: Vec<_> = fulfilment.entries.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![HistoryEventType::Unreserve, HistoryEventType::StockOut]);
    assert!(fulfilment.entries.iter().all(|e| e.order_id == Some(reserved.reservation.order_id)));
    assert_eq!(fulfilment.entries[1].metadata, json!({ "carrier": "Correios" }));

    let again = engine.unreserve_inventory(unreserve(&ledger, reserved.reservation.id)).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidState);

    let audit = ledger.state.history_service.audit_inventory(inv.id).await.unwrap();
    assert!(audit.consistent);
}

#[tokio::test]
async fn settings_update_touches_no_quantities_or_history() {
    let ledger = ledger();
    let warehouse = ledger.warehouse("CD-14").await;
    let inv = ledger.inventory(warehouse.id, 40, 10).await;

    let view = ledger
        .state
        .inventory_service
        .update_inventory_settings(UpdateInventorySettings {
            inventory_id: inv.id,
            reorder_level: Some(45),
            cost_per_unit: Some(Decimal::new(1250, 2)),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(view.reorder_level, 45);
    assert_eq!(view.reorder_quantity, 50);
    assert_eq!(view.cost_per_unit, Decimal::new(1250, 2));
    assert_eq!(view.quantity_on_hand, 40);
    assert!(view.low_stock);

    let history = ledger.state.history_service.get_inventory_history(inv.id, 10, 0).await.unwrap();
    assert_eq!(history.total, 1);
}

#[tokio::test]
async fn history_entries_record_before_after_and_actor() {
    let ledger = ledger();
    let engine = &ledger.state.inventory_service;
    let warehouse = ledger.warehouse("CD-15").await;
    let inv = ledger.inventory(warehouse.id, 10, 0).await;

    let reserved = engine.reserve_inventory(ledger.reserve_cmd(inv.id, 4)).await.unwrap();
    let entry = &reserved.entry;
    assert_eq!(entry.event_type, HistoryEventType::Reserve);
    assert_eq!((entry.quantity_before, entry.quantity_after, entry.quantity_delta), (0, 4, 4));
    assert_eq!(entry.reservation_id, Some(reserved.reservation.id));
    assert_eq!(entry.actor_id, ledger.actor);
    assert_eq!(entry.metadata, json!({}));

    let out = engine.stock_out(ledger.stock_out_cmd(inv.id, 6)).await.unwrap();
    assert_eq!((out.entry.quantity_before, out.entry.quantity_after), (10, 4));
    assert!(out.entry.id > entry.id);
}
