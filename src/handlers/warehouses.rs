// src/handlers/warehouses.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        actor::ActorContext,
        extract::{JsonBody, PathParam},
    },
    models::warehouse::{CreateWarehouse, Warehouse, WarehouseInventorySummary},
};

// ---
// Handler: create_warehouse
// ---
#[utoipa::path(
    post,
    path = "/api/warehouses",
    tag = "Warehouses",
    request_body = CreateWarehouse,
    responses(
        (status = 201, description = "Armazém criado", body = Warehouse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código já utilizado")
    ),
    security(("actor_id" = []))
)]
pub async fn create_warehouse(
    State(app_state): State<AppState>,
    _actor: ActorContext,
    JsonBody(payload): JsonBody<CreateWarehouse>,
) -> Result<impl IntoResponse, AppError> {
    let warehouse = app_state.warehouse_service.create_warehouse(payload).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

#[utoipa::path(
    get,
    path = "/api/warehouses",
    tag = "Warehouses",
    responses((status = 200, description = "Armazéns ordenados por código", body = Vec<Warehouse>))
)]
pub async fn list_warehouses(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let warehouses = app_state.warehouse_service.list_warehouses().await?;
    Ok(Json(warehouses))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}",
    tag = "Warehouses",
    responses(
        (status = 200, description = "Armazém", body = Warehouse),
        (status = 404, description = "Armazém não encontrado")
    ),
    params(("warehouse_id" = Uuid, Path, description = "ID do Armazém"))
)]
pub async fn get_warehouse(
    State(app_state): State<AppState>,
    PathParam(warehouse_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let warehouse = app_state.warehouse_service.get_warehouse(warehouse_id).await?;
    Ok(Json(warehouse))
}

// ---
// Payload: ativação / desativação
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivationPayload {
    pub active: bool,
}

#[utoipa::path(
    post,
    path = "/api/warehouses/{warehouse_id}/activation",
    tag = "Warehouses",
    request_body = SetActivationPayload,
    responses(
        (status = 200, description = "Situação alterada", body = Warehouse),
        (status = 404, description = "Armazém não encontrado")
    ),
    params(
        ("warehouse_id" = Uuid, Path, description = "ID do Armazém")
    ),
    security(("actor_id" = []))
)]
pub async fn set_warehouse_activation(
    State(app_state): State<AppState>,
    _actor: ActorContext,
    PathParam(warehouse_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<SetActivationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let warehouse = app_state
        .warehouse_service
        .set_warehouse_active(warehouse_id, payload.active)
        .await?;
    Ok(Json(warehouse))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}/summary",
    tag = "Warehouses",
    responses(
        (status = 200, description = "Totais do armazém", body = WarehouseInventorySummary),
        (status = 404, description = "Armazém não encontrado")
    ),
    params(("warehouse_id" = Uuid, Path, description = "ID do Armazém"))
)]
pub async fn get_warehouse_summary(
    State(app_state): State<AppState>,
    PathParam(warehouse_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .warehouse_service
        .get_warehouse_inventory_summary(warehouse_id)
        .await?;
    Ok(Json(summary))
}
