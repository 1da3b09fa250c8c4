// src/middleware/actor.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// Cabeçalho que identifica quem executa a operação (vai para o histórico)
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

// A autenticação fica na borda (gateway); aqui só lemos o ator já resolvido.
#[derive(Debug, Clone, Copy)]
pub struct ActorContext(pub Uuid);

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(ACTOR_ID_HEADER).ok_or_else(|| {
            AppError::invalid_field(ACTOR_ID_HEADER, "required", "O cabeçalho X-Actor-ID é obrigatório.")
        })?;

        let value_str = value.to_str().map_err(|_| {
            AppError::invalid_field(
                ACTOR_ID_HEADER,
                "invalid",
                "Cabeçalho X-Actor-ID contém caracteres inválidos.",
            )
        })?;

        let actor_id = Uuid::parse_str(value_str.trim()).map_err(|_| {
            AppError::invalid_field(ACTOR_ID_HEADER, "uuid", "Cabeçalho X-Actor-ID inválido (não é um UUID).")
        })?;

        Ok(ActorContext(actor_id))
    }
}
