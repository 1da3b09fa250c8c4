use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Categorias de falha expostas aos chamadores (serviço de pedidos, ferramentas de operação).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateInventory,
    InsufficientStock,
    InvalidState,
    ConcurrencyTimeout,
    Internal,
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Estoque {0} não encontrado")]
    InventoryNotFound(Uuid),

    #[error("Reserva {0} não encontrada")]
    ReservationNotFound(Uuid),

    #[error("Lote {0} não encontrado")]
    BatchNotFound(Uuid),

    #[error("Armazém {0} não encontrado")]
    WarehouseNotFound(Uuid),

    #[error("Já existe estoque para o produto {product_id} no armazém {warehouse_id}")]
    DuplicateInventory { product_id: Uuid, warehouse_id: Uuid },

    #[error("Já existe um armazém com o código '{0}'")]
    WarehouseCodeAlreadyExists(String),

    #[error("Estoque insuficiente: solicitado {requested}, disponível {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("{0}")]
    InvalidState(String),

    #[error("Tempo de espera pelo bloqueio esgotado; tente novamente")]
    ConcurrencyTimeout,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::InventoryNotFound(_)
            | AppError::ReservationNotFound(_)
            | AppError::BatchNotFound(_)
            | AppError::WarehouseNotFound(_) => ErrorKind::NotFound,
            AppError::DuplicateInventory { .. } => ErrorKind::DuplicateInventory,
            // Conflito de unicidade fora do saldo: mesmo tratamento de estado inválido
            AppError::WarehouseCodeAlreadyExists(_) | AppError::InvalidState(_) => {
                ErrorKind::InvalidState
            }
            AppError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            AppError::ConcurrencyTimeout => ErrorKind::ConcurrencyTimeout,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    /// Erro de validação de um único campo, no mesmo formato do `validator`.
    pub fn invalid_field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let mut err = validator::ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    /// Falhas que o chamador deve repetir com backoff.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyTimeout
    }
}

// SQLSTATEs que significam "não conseguiu o bloqueio a tempo".
const LOCK_NOT_AVAILABLE: &str = "55P03";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut => AppError::ConcurrencyTimeout,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(LOCK_NOT_AVAILABLE) | Some(DEADLOCK_DETECTED) | Some(QUERY_CANCELED) => {
                    AppError::ConcurrencyTimeout
                }
                _ => AppError::DatabaseError(e),
            },
            _ => AppError::DatabaseError(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateInventory | ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ConcurrencyTimeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "kind": kind,
                    "details": details,
                })
            }
            // O `tracing` loga a mensagem detalhada; o cliente recebe uma genérica.
            e if kind == ErrorKind::Internal => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado.", "kind": kind })
            }
            e => json!({ "error": e.to_string(), "kind": kind }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(AppError::InventoryNotFound(Uuid::nil()).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::ReservationNotFound(Uuid::nil()).kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::DuplicateInventory { product_id: Uuid::nil(), warehouse_id: Uuid::nil() }.kind(),
            ErrorKind::DuplicateInventory
        );
        assert_eq!(
            AppError::InsufficientStock { requested: 2, available: 1 }.kind(),
            ErrorKind::InsufficientStock
        );
        assert_eq!(AppError::InvalidState("x".into()).kind(), ErrorKind::InvalidState);
        assert!(AppError::ConcurrencyTimeout.is_retryable());
        assert!(!AppError::InvalidState("x".into()).is_retryable());
    }

    #[test]
    fn pool_timeout_maps_to_concurrency_timeout() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::ConcurrencyTimeout));
    }

    #[test]
    fn invalid_field_builds_validation_errors() {
        let err = AppError::invalid_field("adjustment_quantity", "below_reserved", "abaixo do reservado");
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("adjustment_quantity"));
            }
            other => panic!("esperava ValidationError, veio {other:?}"),
        }
    }

    #[test]
    fn responses_carry_status_and_kind() {
        let res = AppError::InsufficientStock { requested: 5, available: 1 }.into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = AppError::ConcurrencyTimeout.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let res = AppError::invalid_field("quantity", "range", "x").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
