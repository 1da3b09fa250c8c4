// src/handlers.rs

pub mod inventory;
pub mod reservations;
pub mod warehouses;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses((status = 200, description = "Serviço no ar", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}
