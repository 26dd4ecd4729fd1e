//! Glues the pure engine operations (validate/apply/rollback/balance) to a
//! concrete Postgres-backed store under a single-writer discipline: only
//! one mutating operation runs at a time. This is the thing `src/http.rs`
//! actually calls; everything else in `engine::` stays generic over
//! `ReadStore`/`WriteStore` so it can be exercised against `MemoryStore` in
//! tests without a live database.

use crate::config::Config;
use crate::engine::{applier, balance, rollback, validator};
use crate::error::{EngineError, StoreError};
use crate::model::BlockRequest;
use crate::store::postgres::{schema, PgPool, PgReadStore, PgTxStore};
use crate::store::ReadStore as _;

#[derive(Clone)]
pub struct Engine {
    pool: PgPool,
}

impl Engine {
    /// Connects the store pool and idempotently ensures the schema exists.
    pub async fn bootstrap(cfg: &Config) -> Result<Self, EngineError> {
        let pool = PgPool::connect(&cfg.database_url, cfg.pool_size)
            .await
            .map_err(EngineError::Internal)?;
        {
            let client = pool.checkout().await;
            schema::ensure_schema(&client).await.map_err(EngineError::Internal)?;
        }
        tracing::info!(pool_size = cfg.pool_size, "store schema ready");
        Ok(Self { pool })
    }

    /// Validates and applies `block` in one atomic transaction.
    pub async fn submit_block(&self, block: BlockRequest) -> Result<(), EngineError> {
        let _write_guard = self.pool.acquire_write_lock().await;

        let mut client = self.pool.checkout().await;
        let validated = {
            let read = PgReadStore::new(&client);
            validator::validate(block, &read).await?
        };

        let tx = begin(&mut client).await?;
        let mut store = PgTxStore::new(tx);
        applier::apply(&validated, &mut store).await?;
        commit(store).await?;

        tracing::info!(block_id = validated.id(), height = validated.height(), "block accepted");
        Ok(())
    }

    /// Rolls the store back to `target_height` in one atomic transaction.
    pub async fn rollback_to(&self, target_height: i64) -> Result<(), EngineError> {
        let _write_guard = self.pool.acquire_write_lock().await;

        let mut client = self.pool.checkout().await;
        let tx = begin(&mut client).await?;
        let mut store = PgTxStore::new(tx);
        rollback::rollback_to(target_height, &mut store).await?;
        commit(store).await?;

        tracing::info!(target_height, "rollback completed");
        Ok(())
    }

    pub async fn get_balance(&self, address: &str) -> Result<i64, EngineError> {
        let client = self.pool.checkout().await;
        let read = PgReadStore::new(&client);
        balance::get_balance(&read, address).await.map_err(EngineError::Internal)
    }

    pub async fn compute_balance(&self, address: &str) -> Result<i64, EngineError> {
        let client = self.pool.checkout().await;
        let read = PgReadStore::new(&client);
        balance::compute_balance(&read, address).await.map_err(EngineError::Internal)
    }

    /// Round-trips a checkout and a trivial read; backs the `/health`
    /// endpoint.
    pub async fn ping(&self) -> Result<(), EngineError> {
        let client = self.pool.checkout().await;
        let read = PgReadStore::new(&client);
        read.max_height().await.map_err(EngineError::Internal)?;
        Ok(())
    }
}

async fn begin(
    client: &mut crate::store::postgres::pool::PooledClient,
) -> Result<tokio_postgres::Transaction<'_>, EngineError> {
    client.transaction().await.map_err(|e| EngineError::Internal(StoreError::Query(e)))
}

async fn commit(store: PgTxStore<'_>) -> Result<(), EngineError> {
    store.into_inner().commit().await.map_err(|e| EngineError::Internal(StoreError::Query(e)))
}
