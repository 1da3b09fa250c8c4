// src/handlers/reservations.rs

use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        actor::ActorContext,
        extract::{JsonBody, PathParam},
    },
    models::inventory::{FulfillReservation, Fulfillment, Reservation, ReservationChange, UnreserveInventory},
};

#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}",
    tag = "Reservations",
    responses(
        (status = 200, description = "Reserva", body = Reservation),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da Reserva"))
)]
pub async fn get_reservation(
    State(app_state): State<AppState>,
    PathParam(reservation_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state.warehouse_service.get_reservation(reservation_id).await?;
    Ok(Json(reservation))
}

// ---
// Payload: liberação (pedido cancelado, expirado...)
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseReservationPayload {
    #[schema(example = "Pedido cancelado pelo cliente")]
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/release",
    tag = "Reservations",
    request_body = ReleaseReservationPayload,
    responses(
        (status = 200, description = "Reserva liberada", body = ReservationChange),
        (status = 404, description = "Reserva não encontrada"),
        (status = 409, description = "Reserva já liberada")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("actor_id" = []))
)]
pub async fn release_reservation(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(reservation_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<ReleaseReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let change = app_state
        .inventory_service
        .unreserve_inventory(UnreserveInventory {
            reservation_id,
            reason: payload.reason,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(change))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfillReservationPayload {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/fulfill",
    tag = "Reservations",
    request_body = FulfillReservationPayload,
    responses(
        (status = 200, description = "Reserva consumida e estoque baixado", body = Fulfillment),
        (status = 404, description = "Reserva não encontrada"),
        (status = 409, description = "Reserva já liberada")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("actor_id" = []))
)]
pub async fn fulfill_reservation(
    State(app_state): State<AppState>,
    actor: ActorContext,
    PathParam(reservation_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<FulfillReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let fulfillment = app_state
        .inventory_service
        .fulfill_reservation(FulfillReservation {
            reservation_id,
            metadata: payload.metadata,
            actor_id: actor.0,
        })
        .await?;
    Ok(Json(fulfillment))
}
