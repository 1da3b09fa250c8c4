// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{LedgerStore, PgLedgerStore},
    services::{HistoryService, InventoryService, WarehouseService},
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Espera máxima por um bloqueio de linha antes de `ConcurrencyTimeout`.
    pub lock_timeout: Duration,
    pub server_addr: String,
}

impl LedgerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
            lock_timeout: Duration::from_millis(env_or("LOCK_TIMEOUT_MS", 5000)?),
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} inválida ('{raw}'): {e}")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub inventory_service: InventoryService,
    pub warehouse_service: WarehouseService,
    pub history_service: HistoryService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &LedgerConfig) -> Self {
        Self::from_store(Arc::new(PgLedgerStore::new(pool, config.lock_timeout)))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_store(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            inventory_service: InventoryService::new(store.clone()),
            warehouse_service: WarehouseService::new(store.clone()),
            history_service: HistoryService::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_and_rejects_garbage() {
        let missing: u64 = env_or("STOCK_LEDGER_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(missing, 42);

        // SAFETY: variável exclusiva deste teste
        unsafe { env::set_var("STOCK_LEDGER_TEST_BAD_VAR", "abc") };
        assert!(env_or::<u64>("STOCK_LEDGER_TEST_BAD_VAR", 1).is_err());
        unsafe { env::remove_var("STOCK_LEDGER_TEST_BAD_VAR") };
    }
}
