// src/handlers/inventory.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        actor::ActorContext,
        extract::{JsonBody, PathParam, QueryParams},
    },
    models::{
        history::{AuditReport, HistoryPage},
        inventory::{
            AdjustInventory, Batch, DamageRecord, InitializeInventory, InventoryChange, InventoryDetail,
            InventoryView, ProductInventory, RecordDamage, Reservation, ReservationChange, ReservationStatus,
            ReserveInventory, StockIn, StockOut, StockReceipt, UpdateInventorySettings,
        },
    },
    services::history_service::DEFAULT_HISTORY_LIMIT,
};

// Prazo padrão da consulta de vencimentos
const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

// ---
// Payload: InitializeInventory
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeInventoryPayload {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[serde(default)]
    pub initial_quantity: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub reorder_quantity: i64,
    #[serde(default)]
    pub cost_per_unit: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/inventory",
    tag = "Inventory",
    request_body = InitializeInventoryPayload,
    responses(
        (status = 201, description = "Linha de estoque criada", body = InventoryChange),
        (status = 400, description = "Dados inválidos ou armazém desativado"),
        (status = 404, description = "Armazém não encontrado"),
        (status = 409, description = "Já existe estoque para o par produto/armazém")
    ),
    security(("actor_id" = []))
)]
pub async fn initialize_inventory(
    State(app_state): State<AppState>,
    actor: ActorContext,
    JsonBody(payload): JsonBody<InitializeInventoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state
        .inventory_service
        .initialize_inventory(InitializeInventory {
            product_id: payload.product_id,
            warehouse_id: payload.warehouse_id,
            initial_quantity: payload.initial_quantity,
            reorder_level: payload.reorder_level,
            reorder_quantity: payload.reorder_quantity,
            cost_per_unit: payload.cost_per_unit,
            actor_id: actor.0,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(change)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{inventory_id}",
    tag = "Inventory",
    responses(
        (status = 200, description = "Saldo com armazém", body = InventoryDetail),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(("inventory_id" = Uuid, Path, description = "ID da linha de estoque"))
)]
pub async fn get_inventory(
    State(app_state): State<AppState>,
    PathParam(inventory_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.warehouse_service.get_inventory(inventory_id).await?;
    Ok(Json(detail))
}

// ---
// Payload: parâmetros de reposição
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsPayload {
    pub reorder_level: Option<i64>,
    pub reorder_quantity: Option<i64>,
    pub cost_per_unit: Option<Decimal>,
}

#[utoipa::path(
    patch,
    path = "/api/inventory/{inventory_id}/settings",
    tag = "Inventory",
    request_body = UpdateSettingsPayload,
    responses(
        (status = 200, description = "Parâmetros atualizados", body = InventoryView),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn update_inventory_settings(
    State(app_state): State<AppState>,
    _actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateSettingsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state
        .inventory_service
        .update_inventory_settings(UpdateInventorySettings {
            inventory_id,
            reorder_level: payload.reorder_level,
            reorder_quantity: payload.reorder_quantity,
            cost_per_unit: payload.cost_per_unit,
        })
        .await?;
    Ok(Json(view))
}

// ---
// Payload: entrada de mercadoria
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockInPayload {
    pub quantity: i64,
    #[schema(example = "LOTE-2024-001")]
    pub batch_number: String,
    #[serde(default)]
    pub cost_per_unit: Decimal,
    pub received_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub reference: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[utoipa::path(
    post,
    path = "/api/inventory/{inventory_id}/stock-in",
    tag = "Inventory",
    request_body = StockInPayload,
    responses(
        (status = 200, description = "Entrada registrada com lote", body = StockReceipt),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn stock_in(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<StockInPayload>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state
        .inventory_service
        .stock_in(StockIn {
            inventory_id,
            quantity: payload.quantity,
            batch_number: payload.batch_number,
            cost_per_unit: payload.cost_per_unit,
            received_date: payload.received_date,
            supplier: payload.supplier,
            reference: payload.reference,
            expiry_date: payload.expiry_date,
            metadata: payload.metadata,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(receipt))
}

// ---
// Payload: saída direta (sem reserva)
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockOutPayload {
    pub quantity: i64,
    #[schema(example = "Venda balcão")]
    pub reason: String,
    pub order_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[utoipa::path(
    post,
    path = "/api/inventory/{inventory_id}/stock-out",
    tag = "Inventory",
    request_body = StockOutPayload,
    responses(
        (status = 200, description = "Saída registrada", body = InventoryChange),
        (status = 404, description = "Estoque não encontrado"),
        (status = 422, description = "Saldo disponível insuficiente")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn stock_out(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<StockOutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state
        .inventory_service
        .stock_out(StockOut {
            inventory_id,
            quantity: payload.quantity,
            reason: payload.reason,
            order_id: payload.order_id,
            metadata: payload.metadata,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(change))
}

// ---
// Payload: reserva para pedido
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservePayload {
    pub order_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub reserved_price: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/inventory/{inventory_id}/reservations",
    tag = "Reservations",
    request_body = ReservePayload,
    responses(
        (status = 201, description = "Reserva criada", body = ReservationChange),
        (status = 404, description = "Estoque não encontrado"),
        (status = 422, description = "Saldo disponível insuficiente"),
        (status = 503, description = "Bloqueio indisponível; tente novamente")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn reserve_inventory(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<ReservePayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state
        .inventory_service
        .reserve_inventory(ReserveInventory {
            inventory_id,
            order_id: payload.order_id,
            quantity: payload.quantity,
            reserved_price: payload.reserved_price,
            actor_id: actor.0,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(change)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReservationsQuery {
    /// `active` ou `released`. Sem filtro traz todas.
    pub status: Option<ReservationStatus>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/{inventory_id}/reservations",
    tag = "Reservations",
    responses(
        (status = 200, description = "Reservas da linha, mais recentes primeiro", body = Vec<Reservation>),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque"),
        ReservationsQuery
    )
)]
pub async fn list_reservations(
    State(app_state): State<AppState>,
    PathParam(inventory_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<ReservationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let reservations = app_state
        .warehouse_service
        .list_reservations(inventory_id, query.status)
        .await?;
    Ok(Json(reservations))
}

// ---
// Payload: ajuste (recontagem)
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPayload {
    /// Positivo soma, negativo subtrai. Zero é rejeitado.
    pub adjustment_quantity: i64,
    #[schema(example = "Inventário cíclico")]
    pub reason: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[utoipa::path(
    post,
    path = "/api/inventory/{inventory_id}/adjustments",
    tag = "Inventory",
    request_body = AdjustPayload,
    responses(
        (status = 200, description = "Ajuste registrado", body = InventoryChange),
        (status = 400, description = "Ajuste deixaria saldo negativo ou abaixo do reservado"),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn adjust_inventory(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<AdjustPayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state
        .inventory_service
        .adjust_inventory(AdjustInventory {
            inventory_id,
            adjustment_quantity: payload.adjustment_quantity,
            reason: payload.reason,
            metadata: payload.metadata,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(change))
}

// ---
// Payload: avaria
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DamagePayload {
    pub batch_id: Option<Uuid>,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[utoipa::path(
    post,
    path = "/api/inventory/{inventory_id}/damages",
    tag = "Inventory",
    request_body = DamagePayload,
    responses(
        (status = 200, description = "Avaria registrada", body = DamageRecord),
        (status = 404, description = "Estoque ou lote não encontrado"),
        (status = 422, description = "Saldo insuficiente")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque")
    ),
    security(("actor_id" = []))
)]
pub async fn record_damage(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(inventory_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<DamagePayload>,
) -> Result<impl IntoResponse, AppError> {
    let record = app_state
        .inventory_service
        .record_damage(RecordDamage {
            inventory_id,
            batch_id: payload.batch_id,
            quantity: payload.quantity,
            reason: payload.reason,
            metadata: payload.metadata,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{inventory_id}/batches",
    tag = "Inventory",
    responses(
        (status = 200, description = "Lotes da linha, por data de recebimento", body = Vec<Batch>),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(("inventory_id" = Uuid, Path, description = "ID da linha de estoque"))
)]
pub async fn list_batches(
    State(app_state): State<AppState>,
    PathParam(inventory_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batches = app_state.warehouse_service.list_batches(inventory_id).await?;
    Ok(Json(batches))
}

// ---
// Histórico e auditoria
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Entre 1 e 200 (padrão 50).
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/{inventory_id}/history",
    tag = "Inventory",
    responses(
        (status = 200, description = "Histórico, mais recente primeiro", body = HistoryPage),
        (status = 400, description = "Paginação inválida"),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(
        ("inventory_id" = Uuid, Path, description = "ID da linha de estoque"),
        HistoryQuery
    )
)]
pub async fn get_inventory_history(
    State(app_state): State<AppState>,
    PathParam(inventory_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .history_service
        .get_inventory_history(
            inventory_id,
            query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{inventory_id}/audit",
    tag = "Inventory",
    responses(
        (status = 200, description = "Saldo reconstruído a partir do histórico", body = AuditReport),
        (status = 404, description = "Estoque não encontrado")
    ),
    params(("inventory_id" = Uuid, Path, description = "ID da linha de estoque"))
)]
pub async fn audit_inventory(
    State(app_state): State<AppState>,
    PathParam(inventory_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.history_service.audit_inventory(inventory_id).await?;
    Ok(Json(report))
}

// ---
// Consultas agregadas
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub warehouse_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/low-stock",
    tag = "Inventory",
    responses((status = 200, description = "Linhas no ponto de reposição ou abaixo", body = Vec<InventoryView>)),
    params(LowStockQuery)
)]
pub async fn get_low_stock_items(
    State(app_state): State<AppState>,
    QueryParams(query): QueryParams<LowStockQuery>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.warehouse_service.get_low_stock_items(query.warehouse_id).await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpiringBatchesQuery {
    /// Janela em dias a partir de hoje (padrão 30).
    pub days: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/expiring-batches",
    tag = "Inventory",
    responses(
        (status = 200, description = "Lotes que vencem na janela, por data", body = Vec<Batch>),
        (status = 400, description = "Janela inválida")
    ),
    params(ExpiringBatchesQuery)
)]
pub async fn get_expiring_batches(
    State(app_state): State<AppState>,
    QueryParams(query): QueryParams<ExpiringBatchesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let batches = app_state
        .warehouse_service
        .get_expiring_batches(query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS))
        .await?;
    Ok(Json(batches))
}

#[utoipa::path(
    get,
    path = "/api/products/{product_id}/inventory",
    tag = "Inventory",
    responses((status = 200, description = "Saldo do produto em todos os armazéns", body = ProductInventory)),
    params(("product_id" = Uuid, Path, description = "ID do Produto"))
)]
pub async fn get_product_inventory(
    State(app_state): State<AppState>,
    PathParam(product_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let inventory = app_state.warehouse_service.get_product_inventory(product_id).await?;
    Ok(Json(inventory))
}
