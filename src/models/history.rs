// src/models/history.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "history_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    StockIn,
    StockOut,
    Reserve,
    Unreserve,
    Adjust,
    Damage,
}

impl HistoryEventType {
    /// Eventos cujo delta incide sobre `quantity_on_hand`.
    /// Reserve/Unreserve incidem sobre `quantity_reserved`.
    pub fn affects_on_hand(self) -> bool {
        !matches!(self, Self::Reserve | Self::Unreserve)
    }
}

// --- Livro-razão (somente inserção) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Sequência global; também desempata a ordenação.
    pub id: i64,
    pub inventory_id: Uuid,
    pub event_type: HistoryEventType,
    pub quantity_delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub actor_id: Uuid,
    pub order_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Lançamento ainda não gravado (o `id` é atribuído pelo armazenamento).
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub inventory_id: Uuid,
    pub event_type: HistoryEventType,
    pub quantity_delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub actor_id: Uuid,
    pub order_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn new(
        inventory_id: Uuid,
        event_type: HistoryEventType,
        quantity_before: i64,
        quantity_after: i64,
        actor_id: Uuid,
    ) -> Self {
        Self {
            inventory_id,
            event_type,
            quantity_delta: quantity_after - quantity_before,
            quantity_before,
            quantity_after,
            reason: None,
            actor_id,
            order_id: None,
            reservation_id: None,
            batch_id: None,
            metadata: Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn order(mut self, order_id: Option<Uuid>) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn reservation(mut self, reservation_id: Uuid) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    pub fn batch(mut self, batch_id: Option<Uuid>) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        // `null` vira objeto vazio para manter a coluna homogênea
        if !metadata.is_null() {
            self.metadata = metadata;
        }
        self
    }

    pub fn into_entry(self, id: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            inventory_id: self.inventory_id,
            event_type: self.event_type,
            quantity_delta: self.quantity_delta,
            quantity_before: self.quantity_before,
            quantity_after: self.quantity_after,
            reason: self.reason,
            actor_id: self.actor_id,
            order_id: self.order_id,
            reservation_id: self.reservation_id,
            batch_id: self.batch_id,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Resultado da reconstrução do saldo a partir do histórico.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub inventory_id: Uuid,
    pub entries: usize,
    pub reconstructed_on_hand: i64,
    pub stored_on_hand: i64,
    pub reconstructed_reserved: i64,
    pub stored_reserved: i64,
    pub consistent: bool,
}

/// Reaplica os deltas em ordem de criação, partindo de zero.
/// Devolve `(on_hand, reserved)`.
pub fn replay(entries: &[HistoryEntry]) -> (i64, i64) {
    let mut ordered: Vec<&HistoryEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.id);

    ordered.iter().fold((0, 0), |(on_hand, reserved), e| {
        if e.event_type.affects_on_hand() {
            (on_hand + e.quantity_delta, reserved)
        } else {
            (on_hand, reserved + e.quantity_delta)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, event_type: HistoryEventType, before: i64, after: i64) -> HistoryEntry {
        NewHistoryEntry::new(Uuid::nil(), event_type, before, after, Uuid::nil()).into_entry(id)
    }

    #[test]
    fn delta_is_after_minus_before() {
        let e = NewHistoryEntry::new(Uuid::nil(), HistoryEventType::Damage, 40, 15, Uuid::nil());
        assert_eq!(e.quantity_delta, -25);
    }

    #[test]
    fn null_metadata_is_normalised_to_empty_object() {
        let e = NewHistoryEntry::new(Uuid::nil(), HistoryEventType::Adjust, 0, 1, Uuid::nil())
            .metadata(Value::Null);
        assert!(e.metadata.as_object().is_some_and(|m| m.is_empty()));
    }

    #[test]
    fn replay_separates_on_hand_and_reserved_and_ignores_insertion_order() {
        let entries = vec![
            entry(3, HistoryEventType::Reserve, 0, 30),
            entry(1, HistoryEventType::StockIn, 0, 100),
            entry(5, HistoryEventType::Unreserve, 30, 10),
            entry(2, HistoryEventType::StockOut, 100, 80),
            entry(4, HistoryEventType::Adjust, 80, 90),
            entry(6, HistoryEventType::Damage, 90, 85),
        ];

        assert_eq!(replay(&entries), (85, 10));
    }

    #[test]
    fn replay_of_nothing_is_zero() {
        assert_eq!(replay(&[]), (0, 0));
    }
}
